pub mod commit;
pub mod record;
pub mod registry;
pub mod stats;

pub use commit::{Commit, CommitHandle, CommitState, ParsedCommit};
pub use record::{record_id, LogRecord, TextDecoder, Utf8Lossy, FIELD_SEPARATOR, LOG_FORMAT};
pub use registry::CommitRegistry;
pub use stats::DagStats;
