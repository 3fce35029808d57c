use deob_core::DeobError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolchainError {
    #[error("FETCH/{tool}: {source}")]
    Fetch {
        tool: String,
        #[source]
        source: DeobError,
    },

    #[error("SETUP/{tool}: {reason}")]
    Setup { tool: String, reason: String },

    #[error("MANIFEST/{0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("IO/{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}
