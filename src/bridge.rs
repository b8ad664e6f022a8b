//! Hand-off of completed generations to a single consumer.
//!
//! The engine never pushes: the consumer polls on its own schedule and gets
//! the latest published generation, at most once. Generations published
//! between two polls are skipped.

use std::sync::Arc;

use crate::{sim::Shared, Grid};

/// A delivered generation. Borrowed from the bridge until the next poll.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub generation: u64,
    pub grid: &'a Grid,
}

pub trait GenerationConsumer {
    fn on_generation_ready(&mut self, frame: Frame<'_>);
}

impl<F> GenerationConsumer for F
where
    F: FnMut(Frame<'_>),
{
    fn on_generation_ready(&mut self, frame: Frame<'_>) {
        self(frame)
    }
}

/// The consumer endpoint of a [`Sim`](crate::Sim). There is exactly one per
/// simulation, so deliveries can never overlap.
pub struct ConsumerBridge {
    shared: Arc<Shared>,
    snapshot: Grid,
    delivered: Option<u64>,
}

impl ConsumerBridge {
    pub(crate) fn new(shared: Arc<Shared>, snapshot: Grid) -> Self {
        Self {
            shared,
            snapshot,
            delivered: None,
        }
    }

    /// Takes the latest generation if one was published since the last poll.
    ///
    /// The copy runs outside the publication lock. While it runs the copied
    /// buffer is marked as being read, and the coordinator will not rotate it
    /// back into `next`, so the snapshot is never torn.
    pub fn poll(&mut self) -> Option<Frame<'_>> {
        let (current, generation) = {
            let mut publication = self.shared.publication.lock();
            if !publication.dirty {
                return None;
            }
            publication.dirty = false;
            publication.reading = Some(publication.current);
            (publication.current, publication.generation)
        };
        self.snapshot.copy_from(&self.shared.buffers[current]);
        self.shared.publication.lock().reading = None;
        self.shared.round_progress.notify_all();

        self.delivered = Some(generation);
        Some(Frame {
            generation,
            grid: &self.snapshot,
        })
    }

    /// Polls and, if a generation is ready, hands it to `consumer`. Returns
    /// whether anything was delivered.
    pub fn dispatch(&mut self, consumer: &mut impl GenerationConsumer) -> bool {
        match self.poll() {
            Some(frame) => {
                consumer.on_generation_ready(frame);
                true
            }
            None => false,
        }
    }

    /// Generation of the last delivered frame.
    pub fn last_delivered(&self) -> Option<u64> {
        self.delivered
    }

    /// The most recently delivered grid (the seed before the first poll).
    pub fn latest(&self) -> &Grid {
        &self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{pos, CellGrid, EngineConfig, Sim};

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn paused() -> EngineConfig {
        EngineConfig {
            start_paused: true,
            ..EngineConfig::with_workers(2)
        }
    }

    #[test]
    fn seed_is_delivered_first_and_once() {
        let seed = Grid::from_actives(4, 4, [pos!(1, 1), pos!(2, 1)]).unwrap();
        let (_sim, mut bridge) = Sim::spawn(&seed, &paused()).unwrap();

        let frame = bridge.poll().expect("seed frame");
        assert_eq!(frame.generation, 0);
        assert_eq!(frame.grid, &seed);
        assert!(bridge.poll().is_none());
        assert_eq!(bridge.last_delivered(), Some(0));
    }

    #[test]
    fn closure_consumer_receives_each_published_generation() {
        let seed = Grid::from_actives(5, 5, [pos!(1, 2), pos!(2, 2), pos!(3, 2)]).unwrap();
        let (sim, mut bridge) = Sim::spawn(&seed, &paused()).unwrap();
        let handle = sim.handle();

        let mut seen = Vec::new();
        let mut record = |frame: Frame<'_>| seen.push((frame.generation, frame.grid.population()));
        assert!(bridge.dispatch(&mut record));

        handle.step(1);
        assert!(handle.wait_for_generation(1, TIMEOUT));
        assert!(bridge.dispatch(&mut record));
        assert!(!bridge.dispatch(&mut record));

        assert_eq!(seen, vec![(0, 3), (1, 3)]);
        assert_eq!(bridge.latest(), &seed.step());
    }

    #[test]
    fn lagging_consumer_gets_only_the_latest() {
        let seed = Grid::from_actives(6, 6, [pos!(1, 2), pos!(2, 2), pos!(3, 2)]).unwrap();
        let (sim, mut bridge) = Sim::spawn(&seed, &paused()).unwrap();
        let handle = sim.handle();

        handle.step(5);
        assert!(handle.wait_for_generation(5, TIMEOUT));
        let frame = bridge.poll().expect("generation 5");
        assert_eq!(frame.generation, 5);
        // blinker has period 2
        assert_eq!(frame.grid, &seed.step());
        assert!(bridge.poll().is_none());
    }

    #[test]
    fn buffer_being_copied_is_not_reused() {
        let seed = Grid::from_actives(6, 6, [pos!(1, 2), pos!(2, 2), pos!(3, 2)]).unwrap();
        let (sim, bridge) = Sim::spawn(&seed, &paused()).unwrap();
        let handle = sim.handle();
        let shared = &bridge.shared;
        {
            let mut publication = shared.publication.lock();
            publication.reading = Some(publication.current);
        }

        // one rotation retires the held buffer to scratch; a second would overwrite it
        handle.step(3);
        assert!(handle.wait_for_generation(1, TIMEOUT));
        assert!(!handle.wait_for_generation(2, Duration::from_millis(50)));

        shared.publication.lock().reading = None;
        assert!(handle.wait_for_generation(3, TIMEOUT));
        sim.shutdown().unwrap();
    }
}
