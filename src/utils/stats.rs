use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Counters for pipeline observability.
///
/// Thread-safe and cheap to clone; updated from the worker thread, read from
/// anywhere via `snapshot()`.
#[derive(Clone, Default)]
pub struct PipelineStats {
    inner: Arc<StatsInner>,
}

#[derive(Default)]
struct StatsInner {
    cycles: AtomicUsize,
    cycles_skipped: AtomicUsize,
    null_frames: AtomicUsize,
    ocr_calls: AtomicUsize,
    translation_calls: AtomicUsize,
    blocks_published: AtomicUsize,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self) {
        self.inner.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.inner.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_null_frame(&self) {
        self.inner.null_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ocr_call(&self) {
        self.inner.ocr_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translation_call(&self) {
        self.inner.translation_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self, blocks: usize) {
        self.inner.blocks_published.fetch_add(blocks, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.inner.cycles.load(Ordering::Relaxed),
            cycles_skipped: self.inner.cycles_skipped.load(Ordering::Relaxed),
            null_frames: self.inner.null_frames.load(Ordering::Relaxed),
            ocr_calls: self.inner.ocr_calls.load(Ordering::Relaxed),
            translation_calls: self.inner.translation_calls.load(Ordering::Relaxed),
            blocks_published: self.inner.blocks_published.load(Ordering::Relaxed),
            cache_entries: 0,
            cache_hits: 0,
            cache_misses: 0,
            cache_hit_rate: 0.0,
        }
    }
}

/// Point-in-time view of the pipeline counters. Cache fields are filled in
/// by `Pipeline::stats`, which owns the cache handle.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub cycles: usize,
    pub cycles_skipped: usize,
    pub null_frames: usize,
    pub ocr_calls: usize,
    pub translation_calls: usize,
    pub blocks_published: usize,
    pub cache_entries: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub cache_hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let stats = PipelineStats::new();
        stats.record_cycle();
        stats.record_cycle();
        stats.record_skipped();
        stats.record_null_frame();
        stats.record_ocr_call();
        stats.record_translation_call();
        stats.record_published(7);

        let snap = stats.snapshot();
        assert_eq!(snap.cycles, 2);
        assert_eq!(snap.cycles_skipped, 1);
        assert_eq!(snap.null_frames, 1);
        assert_eq!(snap.ocr_calls, 1);
        assert_eq!(snap.translation_calls, 1);
        assert_eq!(snap.blocks_published, 7);
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = PipelineStats::new();
        let clone = stats.clone();
        clone.record_cycle();
        assert_eq!(stats.snapshot().cycles, 1);
    }
}
