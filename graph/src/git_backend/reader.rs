use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use tracing::{debug, trace, warn};

use super::process::{CommandRunner, LineStream};
use crate::core::{record_id, Commit, CommitHandle, CommitRegistry, DagStats};
use crate::error::{GraphError, Result};
use crate::query::{GraphQuery, QueryEvent};

const DEFAULT_PROGRAM: &str = "git";

enum ReaderState {
    /// No process started for the current query
    Idle,
    /// Log process running; `ordered` holds everything read so far
    Streaming { stream: Box<dyn LineStream> },
    /// Output fully read, `ordered` is the complete history
    Cached,
    /// A read failed; only `reset` recovers
    Poisoned,
}

/// Lazily streams commits out of `git log`, oldest first.
///
/// The log process runs at most once per query: commits read so far are
/// kept in order and replayed on [`restart`](LogReader::restart), and once
/// the output is exhausted the whole history is served from memory.
pub struct LogReader<R> {
    query: GraphQuery,
    query_events: Receiver<QueryEvent>,
    registry: CommitRegistry,
    runner: R,
    program: String,
    state: ReaderState,
    ordered: Vec<CommitHandle>,
    index: HashMap<String, CommitHandle>,
    cursor: usize,
}

impl<R: CommandRunner> LogReader<R> {
    pub fn new(mut query: GraphQuery, registry: CommitRegistry, runner: R) -> Self {
        let query_events = query.subscribe();
        Self {
            query,
            query_events,
            registry,
            runner,
            program: DEFAULT_PROGRAM.to_string(),
            state: ReaderState::Idle,
            ordered: Vec::new(),
            index: HashMap::new(),
            cursor: 0,
        }
    }

    /// Use another executable in place of `git`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn query(&self) -> &GraphQuery {
        &self.query
    }

    /// Mutable access to the query; a change discards the history read so
    /// far on the next [`restart`](LogReader::restart) or read
    pub fn query_mut(&mut self) -> &mut GraphQuery {
        &mut self.query
    }

    pub fn registry(&self) -> &CommitRegistry {
        &self.registry
    }

    /// True once the log output has been read to the end
    pub fn is_cached(&self) -> bool {
        matches!(self.state, ReaderState::Cached)
    }

    /// Discard everything read so far if the query changed since it was read
    fn sync_query(&mut self) {
        let changed = self.query_events.try_iter().count();
        if changed > 0 {
            debug!(events = changed, "query changed, discarding history");
            self.reset();
        }
    }

    /// Rewind to the first commit.
    ///
    /// If the query changed since the last pass the reader is reset first.
    /// Otherwise commits already read are delivered again, in order, before
    /// any new output is read.
    pub fn restart(&mut self) {
        self.sync_query();
        trace!(buffered = self.ordered.len(), "restarting iteration");
        self.cursor = 0;
    }

    /// Next commit in topological order, or `None` at the end of the history.
    ///
    /// A query change since the previous call starts a fresh history.
    pub fn next_commit(&mut self) -> Result<Option<CommitHandle>> {
        self.sync_query();
        if let Some(&handle) = self.ordered.get(self.cursor) {
            self.cursor += 1;
            return Ok(Some(handle));
        }

        loop {
            match &mut self.state {
                ReaderState::Poisoned => return Err(GraphError::Poisoned),
                ReaderState::Cached => {
                    self.cursor = 0;
                    return Ok(None);
                }
                ReaderState::Idle => {
                    let args = self.query.log_args();
                    match self.runner.spawn(&self.program, &args) {
                        Ok(stream) => self.state = ReaderState::Streaming { stream },
                        Err(err) => {
                            self.state = ReaderState::Poisoned;
                            return Err(err);
                        }
                    }
                }
                ReaderState::Streaming { stream } => {
                    let read = stream.read_record();
                    let result = match read {
                        Ok(Some(raw)) => self.accept(&raw).map(Some),
                        Ok(None) => {
                            self.finish();
                            Ok(None)
                        }
                        Err(err) => Err(err),
                    };
                    if result.is_err() {
                        self.abort();
                    }
                    return result;
                }
            }
        }
    }

    fn accept(&mut self, raw: &[u8]) -> Result<CommitHandle> {
        let id = record_id(raw)?;
        if let Some(&handle) = self.index.get(id) {
            trace!(id, "record for already streamed commit");
            return Ok(handle);
        }

        let handle = self.registry.get_or_create_from_record(raw)?;
        if let Some(commit) = self.registry.commit(handle) {
            self.index.insert(commit.id().to_string(), handle);
        }
        self.ordered.push(handle);
        self.cursor = self.ordered.len();
        Ok(handle)
    }

    fn finish(&mut self) {
        let state = std::mem::replace(&mut self.state, ReaderState::Cached);
        self.cursor = 0;
        debug!(commits = self.ordered.len(), "log output exhausted");
        if let ReaderState::Streaming { mut stream } = state {
            // the history is complete; a failed kill does not invalidate it
            if let Err(err) = stream.terminate() {
                warn!(error = %err, "failed to terminate finished log process");
            }
        }
    }

    fn abort(&mut self) {
        let state = std::mem::replace(&mut self.state, ReaderState::Poisoned);
        if let ReaderState::Streaming { mut stream } = state {
            if let Err(err) = stream.terminate() {
                debug!(error = %err, "failed to terminate log process after error");
            }
        }
    }

    /// Look up a commit that has already been streamed
    pub fn get(&self, id: &str) -> Result<&Commit> {
        self.handle(id)
            .and_then(|handle| self.registry.commit(handle))
            .ok_or_else(|| GraphError::NotFound(id.to_string()))
    }

    pub fn handle(&self, id: &str) -> Option<CommitHandle> {
        self.index.get(id).copied()
    }

    pub fn commit(&self, handle: CommitHandle) -> Option<&Commit> {
        self.registry.commit(handle)
    }

    /// Commits streamed so far, in stream order
    pub fn items(&self) -> impl Iterator<Item = (CommitHandle, &Commit)> {
        self.ordered
            .iter()
            .filter_map(|&handle| self.registry.commit(handle).map(|commit| (handle, commit)))
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn stats(&self) -> DagStats {
        DagStats::collect(self.items().map(|(_, commit)| commit))
    }

    /// Kill any running process and forget everything read for this query
    pub fn reset(&mut self) {
        if let ReaderState::Streaming { mut stream } =
            std::mem::replace(&mut self.state, ReaderState::Idle)
        {
            if let Err(err) = stream.terminate() {
                debug!(error = %err, "failed to terminate log process on reset");
            }
        }
        self.ordered.clear();
        self.index.clear();
        self.cursor = 0;
        self.registry.reset();
    }
}

impl<R: CommandRunner> Iterator for LogReader<R> {
    type Item = Result<CommitHandle>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_commit().transpose()
    }
}

impl<R> Drop for LogReader<R> {
    fn drop(&mut self) {
        if let ReaderState::Streaming { stream } = &mut self.state {
            let _ = stream.terminate();
        }
    }
}
