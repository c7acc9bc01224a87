use std::io;
use thiserror::Error;

/// Errors raised while building the commit graph from log output
#[derive(Debug, Error)]
pub enum GraphError {
    /// A log line did not match the fixed record layout
    #[error("malformed log record ({reason}): {record:?}")]
    MalformedRecord { reason: String, record: String },

    /// The external log command could not be started
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while reading log output")]
    Io(#[from] io::Error),

    /// Lookup of a commit id that has not been streamed yet
    #[error("commit not found: {0}")]
    NotFound(String),

    /// A previous read failed; the reader must be reset before reuse
    #[error("log reader aborted after an earlier failure; reset it before reading again")]
    Poisoned,
}

impl GraphError {
    pub(crate) fn malformed(reason: impl Into<String>, record: &[u8]) -> Self {
        GraphError::MalformedRecord {
            reason: reason.into(),
            record: String::from_utf8_lossy(record).into_owned(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
