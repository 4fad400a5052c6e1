//! Progress reporting for walk generation.
//!
//! One tick per outer walk iteration. Sinks observe only; they never change the output.

/// Receives `(completed, total)` after each outer walk iteration.
///
/// `completed` counts finished iterations out of `total = num_walks`. A sharded serial run
/// reports its global position (the iteration index plus one). The parallel path counts
/// finished iterations across the pool, so values are distinct and reach `total` exactly once.
pub trait Progress {
    fn tick(&mut self, completed: usize, total: usize);
}

/// Discards every tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&mut self, _completed: usize, _total: usize) {}
}

impl Progress for () {
    fn tick(&mut self, _completed: usize, _total: usize) {}
}

impl<F: FnMut(usize, usize)> Progress for F {
    fn tick(&mut self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Reports progress as `tracing` events.
#[derive(Debug, Clone, Default)]
pub struct TracingProgress {
    /// Worker label included in each event (e.g. a shard or CPU index).
    pub worker: Option<usize>,
}

impl TracingProgress {
    pub fn for_worker(worker: usize) -> Self {
        Self { worker: Some(worker) }
    }
}

impl Progress for TracingProgress {
    fn tick(&mut self, completed: usize, total: usize) {
        tracing::info!(worker = ?self.worker, completed, total, "generating walks");
    }
}
