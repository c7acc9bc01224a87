use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset};
use smallvec::SmallVec;

/// Parent links; almost every commit has one or two
pub type Parents = SmallVec<[CommitHandle; 2]>;

/// Non-owning reference to a commit stored in a [`CommitRegistry`].
///
/// A handle is only meaningful for the registry epoch it was issued in;
/// after a registry reset it resolves to nothing.
///
/// [`CommitRegistry`]: crate::core::CommitRegistry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommitHandle {
    pub(crate) index: usize,
    pub(crate) epoch: u64,
}

/// Fields filled in when the commit's own log line is read
#[derive(Debug, Clone, Default)]
pub struct ParsedCommit {
    pub parents: Parents,
    pub tags: BTreeSet<String>,
    pub author: Option<String>,
    pub authored_date: Option<String>,
    pub subject: Option<String>,
    pub generation: u32,
}

#[derive(Debug, Clone)]
pub enum CommitState {
    /// Known only by id, referenced as a parent before its own record was read
    Placeholder,
    Parsed(ParsedCommit),
}

/// A revision node in the history graph
#[derive(Debug, Clone)]
pub struct Commit {
    id: String,
    children: Vec<CommitHandle>,
    state: CommitState,
}

impl Commit {
    pub(crate) fn placeholder(id: String) -> Self {
        Self {
            id,
            children: Vec::new(),
            state: CommitState::Placeholder,
        }
    }

    /// One-way placeholder -> parsed transition; returns false if already parsed
    pub(crate) fn fill(&mut self, parsed: ParsedCommit) -> bool {
        match self.state {
            CommitState::Placeholder => {
                self.state = CommitState::Parsed(parsed);
                true
            }
            CommitState::Parsed(_) => false,
        }
    }

    pub(crate) fn push_child(&mut self, child: CommitHandle) {
        self.children.push(child);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Abbreviated id for display
    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    pub fn state(&self) -> &CommitState {
        &self.state
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.state, CommitState::Parsed(_))
    }

    fn parsed(&self) -> Option<&ParsedCommit> {
        match &self.state {
            CommitState::Parsed(parsed) => Some(parsed),
            CommitState::Placeholder => None,
        }
    }

    pub fn parents(&self) -> &[CommitHandle] {
        self.parsed().map(|p| p.parents.as_slice()).unwrap_or_default()
    }

    /// Commits that declared this one as a parent, in the order they were read
    pub fn children(&self) -> &[CommitHandle] {
        &self.children
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.parsed().into_iter().flat_map(|p| p.tags.iter().map(String::as_str))
    }

    pub fn author(&self) -> Option<&str> {
        self.parsed().and_then(|p| p.author.as_deref())
    }

    pub fn authored_date(&self) -> Option<&str> {
        self.parsed().and_then(|p| p.authored_date.as_deref())
    }

    /// Author date parsed as RFC 2822, if present and well-formed
    pub fn authored_at(&self) -> Option<DateTime<FixedOffset>> {
        self.authored_date()
            .and_then(|date| DateTime::parse_from_rfc2822(date).ok())
    }

    pub fn subject(&self) -> Option<&str> {
        self.parsed().and_then(|p| p.subject.as_deref())
    }

    /// Longest path in parent edges from any root
    pub fn generation(&self) -> u32 {
        self.parsed().map_or(0, |p| p.generation)
    }

    /// Check if this is a root commit (no parents)
    pub fn is_root(&self) -> bool {
        self.parents().is_empty()
    }

    /// Check if this is a merge commit (multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parents().len() > 1
    }
}
