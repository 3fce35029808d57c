//! Tool manifest: which repository, revision and build artifact backs each stage
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ToolchainError;

const BUILTIN_MANIFEST: &str = include_str!("../tools.yaml");

/// Static descriptor of one external tool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolSpec {
    /// Checkout directory name, unique per tool
    pub name: String,
    pub repo_url: String,
    /// Commit the checkout is hard-reset to after cloning
    #[serde(default)]
    pub revision: Option<String>,
    /// Solution file name, without `.sln`
    pub solution: String,
    /// Build artifact, relative to the checkout
    pub artifact: PathBuf,
    #[serde(default)]
    pub restore_packages: bool,
    #[serde(default)]
    pub resolve_submodules: bool,
}

/// Pipeline role a tool is wired into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolRole {
    Clean,
    Devirtualize,
    DevirtualizeFallback,
    Fix,
    Decode,
    Decompile,
}

impl ToolRole {
    pub const ALL: [ToolRole; 6] = [
        ToolRole::Clean,
        ToolRole::Devirtualize,
        ToolRole::DevirtualizeFallback,
        ToolRole::Fix,
        ToolRole::Decode,
        ToolRole::Decompile,
    ];
}

impl fmt::Display for ToolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolRole::Clean => "clean",
            ToolRole::Devirtualize => "devirtualize",
            ToolRole::DevirtualizeFallback => "devirtualize_fallback",
            ToolRole::Fix => "fix",
            ToolRole::Decode => "decode",
            ToolRole::Decompile => "decompile",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolSet {
    pub clean: ToolSpec,
    pub devirtualize: ToolSpec,
    pub devirtualize_fallback: ToolSpec,
    pub fix: ToolSpec,
    pub decode: ToolSpec,
    pub decompile: ToolSpec,
}

impl ToolSet {
    pub fn get(&self, role: ToolRole) -> &ToolSpec {
        match role {
            ToolRole::Clean => &self.clean,
            ToolRole::Devirtualize => &self.devirtualize,
            ToolRole::DevirtualizeFallback => &self.devirtualize_fallback,
            ToolRole::Fix => &self.fix,
            ToolRole::Decode => &self.decode,
            ToolRole::Decompile => &self.decompile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolManifest {
    /// Program used for package restore and builds
    #[serde(default = "default_build_program")]
    pub build_program: String,
    #[serde(default = "default_configuration")]
    pub configuration: String,
    pub tools: ToolSet,
}

fn default_build_program() -> String {
    "msbuild".to_string()
}

fn default_configuration() -> String {
    "Release".to_string()
}

impl ToolManifest {
    /// The manifest shipped with the crate
    pub fn builtin() -> Result<Self, ToolchainError> {
        Self::from_yaml(BUILTIN_MANIFEST)
    }

    pub fn from_yaml(source: &str) -> Result<Self, ToolchainError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ToolchainError> {
        let source = std::fs::read_to_string(path).map_err(|source| ToolchainError::Io {
            context: format!("reading {}", path.display()),
            source,
        })?;
        Self::from_yaml(&source)
    }
}
