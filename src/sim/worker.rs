use std::sync::Arc;

use crate::{partition::ColumnRange, pos, CellGrid};

use super::{Roles, Shared, StopOnPanic};

/// Everything one worker thread needs, fixed at spawn time.
pub(crate) struct WorkerContext {
    index: usize,
    range: ColumnRange,
    shared: Arc<Shared>,
}

impl WorkerContext {
    /// # Panics
    ///
    /// Panics if `range` reaches past the grid or `index` has no completion flag:
    /// both mean the partition was planned for a different grid.
    pub fn new(index: usize, range: ColumnRange, shared: Arc<Shared>) -> Self {
        let width = shared.buffers[0].width();
        assert!(
            range.start <= range.end && range.end <= width,
            "worker {index} assigned columns {range:?} outside a grid {width} wide"
        );
        assert!(index < shared.workers, "worker index {index} out of range");
        Self {
            index,
            range,
            shared,
        }
    }

    pub fn run(self) {
        let _stop_on_panic = StopOnPanic(&self.shared);
        tracing::debug!(
            "worker {} started on columns {}..{}",
            self.index,
            self.range.start,
            self.range.end
        );

        while let Some(roles) = self.wait_for_release() {
            self.compute(roles);
            self.signal_done();
        }

        tracing::debug!("worker {} stopped", self.index);
    }

    /// Blocks while this worker's flag is still set from the previous round.
    /// `None` means shutdown.
    fn wait_for_release(&self) -> Option<Roles> {
        let mut round = self.shared.round.lock();
        loop {
            if !self.shared.is_running() {
                return None;
            }
            if !round.done[self.index] {
                return Some(round.roles);
            }
            self.shared
                .round_released
                .wait_for(&mut round, self.shared.poll_interval);
        }
    }

    /// Writes the next state of every cell in this worker's columns.
    /// Reads only `current`, writes only `next`.
    fn compute(&self, roles: Roles) {
        let current = &self.shared.buffers[roles.current];
        let next = &self.shared.buffers[roles.next];
        for x in self.range.columns() {
            for y in 0..current.height() {
                next.store(pos!(x, y), current.next_cell(pos!(x, y)));
            }
        }
    }

    fn signal_done(&self) {
        let mut round = self.shared.round.lock();
        round.done[self.index] = true;
        if round.is_complete() {
            drop(round);
            self.shared.round_progress.notify_all();
        }
    }
}
