//! Commit history graph built incrementally from `git log` output.
//!
//! A [`LogReader`] drives one `git log --topo-order --reverse` process per
//! [`GraphQuery`], turns each line into a [`Commit`] owned by a
//! [`CommitRegistry`], and keeps the streamed history for replay and lookup.

pub mod core;
pub mod decor;
pub mod error;
pub mod git_backend;
pub mod query;

pub use crate::core::{Commit, CommitHandle, CommitRegistry, CommitState, DagStats, TextDecoder, Utf8Lossy};
pub use error::{GraphError, Result};
pub use git_backend::{CommandRunner, LineStream, LogReader, SystemRunner};
pub use query::{GraphQuery, QueryEvent, QuerySettings};
