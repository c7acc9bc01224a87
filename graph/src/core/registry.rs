use std::collections::HashMap;
use std::fmt;

use tracing::{debug, trace};

use super::commit::{Commit, CommitHandle, ParsedCommit, Parents};
use super::record::{record_id, LogRecord, TextDecoder, Utf8Lossy};
use crate::error::Result;

/// Deduplicating owner of every [`Commit`] built from one query.
///
/// Commits live in an arena and refer to each other through
/// [`CommitHandle`]s, so parent/child links never own anything.
pub struct CommitRegistry {
    commits: Vec<Commit>,
    by_id: HashMap<String, usize>,
    epoch: u64,
    decoder: Box<dyn TextDecoder>,
}

impl CommitRegistry {
    pub fn new() -> Self {
        Self::with_decoder(Utf8Lossy)
    }

    pub fn with_decoder(decoder: impl TextDecoder + 'static) -> Self {
        Self {
            commits: Vec::new(),
            by_id: HashMap::new(),
            epoch: 0,
            decoder: Box::new(decoder),
        }
    }

    fn handle(&self, index: usize) -> CommitHandle {
        CommitHandle {
            index,
            epoch: self.epoch,
        }
    }

    /// Return the commit for `id`, creating an unparsed placeholder on a miss
    pub fn get_or_create(&mut self, id: &str) -> CommitHandle {
        if let Some(&index) = self.by_id.get(id) {
            return self.handle(index);
        }

        let index = self.commits.len();
        self.commits.push(Commit::placeholder(id.to_string()));
        self.by_id.insert(id.to_string(), index);
        self.handle(index)
    }

    /// Resolve one raw log line to its commit, parsing it if this is the
    /// first time its record is seen. Records for already-parsed commits are
    /// ignored.
    pub fn get_or_create_from_record(&mut self, raw: &[u8]) -> Result<CommitHandle> {
        let id = record_id(raw)?;
        if let Some(handle) = self.find(id) {
            if self.commits[handle.index].is_parsed() {
                trace!(id, "record for already parsed commit ignored");
                return Ok(handle);
            }
        }

        let record = LogRecord::parse(raw, self.decoder.as_ref())?;
        let handle = self.get_or_create(&record.id);
        self.parse_into(handle, record);
        Ok(handle)
    }

    fn parse_into(&mut self, handle: CommitHandle, record: LogRecord) {
        let mut parents = Parents::new();
        let mut generation = 0;

        for parent_id in &record.parents {
            let parent = self.get_or_create(parent_id);
            let commit = &mut self.commits[parent.index];
            commit.push_child(handle);
            generation = generation.max(commit.generation() + 1);
            parents.push(parent);
        }

        trace!(id = %record.id, generation, parents = parents.len(), "commit parsed");
        self.commits[handle.index].fill(ParsedCommit {
            parents,
            tags: record.tags,
            author: record.author,
            authored_date: record.authored_date,
            subject: record.subject,
            generation,
        });
    }

    pub fn find(&self, id: &str) -> Option<CommitHandle> {
        self.by_id.get(id).map(|&index| self.handle(index))
    }

    /// Resolve a handle; stale handles from before a reset resolve to `None`
    pub fn commit(&self, handle: CommitHandle) -> Option<&Commit> {
        if handle.epoch != self.epoch {
            return None;
        }
        self.commits.get(handle.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CommitHandle, &Commit)> {
        self.commits
            .iter()
            .enumerate()
            .map(|(index, commit)| (self.handle(index), commit))
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drop every commit; handles issued before this call become stale
    pub fn reset(&mut self) {
        debug!(commits = self.commits.len(), epoch = self.epoch, "resetting commit registry");
        self.commits.clear();
        self.by_id.clear();
        self.epoch += 1;
    }
}

impl Default for CommitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitRegistry")
            .field("commits", &self.commits.len())
            .field("epoch", &self.epoch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    fn sha(c: char) -> String {
        c.to_string().repeat(40)
    }

    fn record(id: char, parents: &[char], subject: &str) -> Vec<u8> {
        let parents: Vec<String> = parents.iter().map(|&p| sha(p)).collect();
        format!("{}\u{1}{}\u{1}\u{1}\u{1}\u{1}{}\n", sha(id), parents.join(" "), subject).into_bytes()
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mut registry = CommitRegistry::new();
        let first = registry.get_or_create(&sha('a'));
        let second = registry.get_or_create(&sha('a'));
        assert_eq!(first, second);
        assert!(std::ptr::eq(
            registry.commit(first).unwrap(),
            registry.commit(second).unwrap()
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn parents_become_placeholders() {
        let mut registry = CommitRegistry::new();
        let child = registry.get_or_create_from_record(&record('b', &['a'], "child")).unwrap();

        let parent = registry.find(&sha('a')).unwrap();
        let parent_commit = registry.commit(parent).unwrap();
        assert!(!parent_commit.is_parsed());
        assert_eq!(parent_commit.children(), &[child]);
        assert_eq!(registry.commit(child).unwrap().generation(), 1);
    }

    #[test]
    fn placeholder_is_parsed_in_place() {
        let mut registry = CommitRegistry::new();
        let placeholder = registry.get_or_create(&sha('a'));
        let parsed = registry.get_or_create_from_record(&record('a', &[], "root")).unwrap();

        assert_eq!(placeholder, parsed);
        let commit = registry.commit(parsed).unwrap();
        assert!(commit.is_parsed());
        assert_eq!(commit.subject(), Some("root"));
    }

    #[test]
    fn duplicate_record_is_ignored() {
        let mut registry = CommitRegistry::new();
        let first = registry.get_or_create_from_record(&record('a', &[], "root")).unwrap();
        let again = registry.get_or_create_from_record(&record('a', &[], "rewritten")).unwrap();

        assert_eq!(first, again);
        assert_eq!(registry.commit(first).unwrap().subject(), Some("root"));
    }

    #[test]
    fn generation_takes_longest_parent_path() {
        let mut registry = CommitRegistry::new();
        let a = registry.get_or_create_from_record(&record('a', &[], "root")).unwrap();
        let b = registry.get_or_create_from_record(&record('b', &['a'], "second")).unwrap();
        let c = registry.get_or_create_from_record(&record('c', &['b'], "third")).unwrap();
        let d = registry.get_or_create_from_record(&record('d', &['a', 'c'], "merge")).unwrap();

        let generation = |h: CommitHandle| registry.commit(h).unwrap().generation();
        assert_eq!([generation(a), generation(b), generation(c), generation(d)], [0, 1, 2, 3]);

        for (_, commit) in registry.iter() {
            let expected = commit
                .parents()
                .iter()
                .map(|&p| registry.commit(p).unwrap().generation() + 1)
                .max()
                .unwrap_or(0);
            assert_eq!(commit.generation(), expected);
        }
    }

    #[test]
    fn malformed_record_creates_nothing() {
        let mut registry = CommitRegistry::new();
        let raw = format!("{}\u{1}{}\u{1}\u{1}\n", sha('b'), sha('a'));
        let err = registry.get_or_create_from_record(raw.as_bytes()).unwrap_err();

        assert!(matches!(err, GraphError::MalformedRecord { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn reset_invalidates_handles() {
        let mut registry = CommitRegistry::new();
        let old = registry.get_or_create(&sha('a'));
        registry.reset();

        assert!(registry.is_empty());
        assert!(registry.commit(old).is_none());
        let fresh = registry.get_or_create(&sha('a'));
        assert_ne!(old, fresh);
        assert!(registry.commit(fresh).is_some());
    }
}
