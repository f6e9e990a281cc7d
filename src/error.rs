use std::path::PathBuf;

use thiserror::Error;

/// Failures a run can report. Malformed lines are not errors; the parser
/// skips and counts them.
#[derive(Debug, Error)]
pub enum FreetvError {
    /// A source still failed after its last attempt. The run skips it.
    #[error("source {url} unavailable after {attempts} attempt(s): {reason}")]
    SourceUnavailable {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// No source produced a single usable channel line.
    #[error("no usable channel entries in {sources} source(s)")]
    EmptyResult { sources: usize },

    /// Entries were read but none resolved to a channel.
    #[error("no canonical channels resolved")]
    NoChannels,

    #[error("failed to write {}: {source}", path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("failed to read alias table {}: {source}", path.display())]
    AliasTableLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FreetvError {
    pub(crate) fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FreetvError::PersistenceFailure {
            path: path.into(),
            source,
        }
    }
}
