//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cumulative counters, reported after each frame. Monotonically increasing
/// for the lifetime of one import or export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupProgress {
    pub bytes: u64,
    pub frames: u64,
}

/// Caller-supplied progress receiver.
///
/// Delivery is best-effort and fire-and-forget: implementations must not
/// block and must not touch the store (the engine may be inside a
/// transaction when it reports).
pub trait ProgressSink: Send {
    fn on_progress(&mut self, progress: BackupProgress);
}

/// Discards all progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _progress: BackupProgress) {}
}

impl<F: FnMut(BackupProgress) + Send> ProgressSink for F {
    fn on_progress(&mut self, progress: BackupProgress) {
        self(progress)
    }
}

/// Shared cancellation flag, checked between frames (never mid-frame).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: BackupProgress| seen.push(p.frames);
            sink.on_progress(BackupProgress { bytes: 10, frames: 1 });
            sink.on_progress(BackupProgress { bytes: 20, frames: 2 });
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
