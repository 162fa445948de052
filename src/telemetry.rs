//! Scalar time series pushed by the trainer.
use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

/// Receives `(tag, value)` pairs keyed by the trainer's step counter.
pub trait MetricsSink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: u64);
}

/// Writes every scalar to the log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: u64) {
        debug!("[{step}] {tag} = {value:.6}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRecord {
    pub tag: String,
    pub value: f32,
    pub step: u64,
}

/// Keeps every scalar in memory. Clones share the same storage, so a handle
/// kept by the caller sees what the trainer recorded.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    records: Rc<RefCell<Vec<ScalarRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ScalarRecord> {
        self.records.borrow().clone()
    }

    /// `(step, value)` pairs recorded under `tag`.
    pub fn series(&self, tag: &str) -> Vec<(u64, f32)> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.tag == tag)
            .map(|r| (r.step, r.value))
            .collect()
    }
}

impl MetricsSink for MemorySink {
    fn add_scalar(&mut self, tag: &str, value: f32, step: u64) {
        self.records.borrow_mut().push(ScalarRecord { tag: tag.to_string(), value, step });
    }
}
