//! Deobfuscation Toolchain: fetch-once, build-once external tools
//!
//! Every tool is described by a static [`ToolSpec`] and checked out under a
//! common tools directory. [`Toolchain::setup`] clones and builds whatever is
//! missing, exactly once per process; [`Toolchain`] then acts as the
//! readiness gate every pipeline consults before running a stage.

pub mod error;
pub mod handle;
pub mod manifest;
pub mod toolchain;

pub use error::ToolchainError;
pub use handle::ToolHandle;
pub use manifest::{ToolManifest, ToolRole, ToolSet, ToolSpec};
pub use toolchain::{ToolStatus, Toolchain};
