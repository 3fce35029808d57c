//! Plain batch configuration, filled in by the command line front end
use deob_core::JobFlags;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Symbol password for the decode stage
    pub password: String,
    pub flags: JobFlags,
    /// Maximum number of jobs in flight
    pub parallelism: usize,
    /// Restrict the run to a single version
    pub only_version: Option<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            password: String::new(),
            flags: JobFlags::default(),
            parallelism: 1,
            only_version: None,
        }
    }
}
