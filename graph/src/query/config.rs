use std::sync::mpsc::{channel, Receiver, Sender};

use crate::core::LOG_FORMAT;

/// Change notifications broadcast by [`GraphQuery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryEvent {
    RefUpdated,
    CountUpdated,
}

impl QueryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QueryEvent::RefUpdated => "ref_updated",
            QueryEvent::CountUpdated => "count_updated",
        }
    }
}

/// Plain values a [`GraphQuery`] starts from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub reference: String,
    pub count: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            reference: "HEAD".to_string(),
            count: 1000,
        }
    }
}

/// Which history to read: a ref and how many of its most recent commits.
///
/// Every setter notifies subscribers, even when the new value equals the
/// old one.
#[derive(Debug)]
pub struct GraphQuery {
    reference: String,
    count: usize,
    observers: Vec<Sender<QueryEvent>>,
}

impl GraphQuery {
    pub fn new(reference: impl Into<String>, count: usize) -> Self {
        Self {
            reference: reference.into(),
            count,
            observers: Vec::new(),
        }
    }

    pub fn from_settings(settings: QuerySettings) -> Self {
        Self::new(settings.reference, settings.count)
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Register an observer; it receives every event fired after this call
    pub fn subscribe(&mut self) -> Receiver<QueryEvent> {
        let (tx, rx) = channel();
        self.observers.push(tx);
        rx
    }

    pub fn set_ref(&mut self, reference: impl Into<String>) {
        self.reference = reference.into();
        self.notify(QueryEvent::RefUpdated);
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
        self.notify(QueryEvent::CountUpdated);
    }

    fn notify(&mut self, event: QueryEvent) {
        // Observers whose receiver is gone are dropped
        self.observers.retain(|tx| tx.send(event).is_ok());
    }

    /// Arguments for `git` that stream this query oldest-first in topological order
    pub fn log_args(&self) -> Vec<String> {
        vec![
            "log".to_string(),
            "--topo-order".to_string(),
            "--reverse".to_string(),
            format!("--pretty={}", LOG_FORMAT),
            format!("-{}", self.count),
            // a ref starting with `-` must never be taken for an option
            "--end-of-options".to_string(),
            self.reference.clone(),
        ]
    }
}
