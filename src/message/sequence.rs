use super::SequenceId;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Run-scoped allocator of sequence ids. Clones share the same counter, so every unit
/// of work in a run draws from one serialized sequence. The first id handed out is `1`.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    last: Arc<AtomicU64>,
}

impl Sequence {
    pub fn new() -> Self {
        Sequence { last: Arc::new(AtomicU64::new(0)) }
    }

    pub fn next(&self) -> SequenceId {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The most recently allocated id (`0` if none was allocated yet).
    pub fn last(&self) -> SequenceId {
        self.last.load(Ordering::SeqCst)
    }
}
