use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a build or test request.
///
/// Everything else (unparseable output, missing sentinels, unresolved test
/// targets) is reported through [`crate::model::RunResult`] instead.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create log file {}: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for '{program}' to exit: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl RunError {
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, RunError::Launch { .. })
    }
}
