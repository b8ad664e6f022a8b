use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::MutexGuard;

use super::{RoundState, Shared, StopOnPanic};

/// Owns buffer rotation: the only code that changes roles or clears flags.
pub(crate) struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    pub fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    pub fn run(self) {
        let _stop_on_panic = StopOnPanic(&self.shared);
        let mut last_publish = Instant::now();

        while let Some(round) = self.wait_for_round(last_publish) {
            self.publish(round);
            last_publish = Instant::now();
        }

        tracing::info!(
            "coordinator stopped at generation {}",
            self.shared.publication.lock().generation
        );
    }

    /// Waits until every worker is done, the publication limit allows another
    /// generation, the consumer is not copying the buffer about to be reused,
    /// and the generation interval has elapsed. Returns the round
    /// lock still held. `None` means shutdown.
    fn wait_for_round(&self, last_publish: Instant) -> Option<MutexGuard<'_, RoundState>> {
        let mut round = self.shared.round.lock();
        loop {
            if !self.shared.is_running() {
                return None;
            }
            let ready =
                round.is_complete() && round.may_publish() && !self.consumer_holds(&round);
            let timeout = if ready {
                let remaining = round
                    .generation_interval
                    .saturating_sub(last_publish.elapsed());
                if remaining == Duration::ZERO {
                    return Some(round);
                }
                remaining
            } else {
                self.shared.poll_interval
            };
            self.shared.round_progress.wait_for(&mut round, timeout);
        }
    }

    /// The consumer is still copying out of the buffer the next rotation
    /// would hand to the workers.
    fn consumer_holds(&self, round: &RoundState) -> bool {
        self.shared.publication.lock().reading == Some(round.roles.scratch)
    }

    /// Rotates, marks dirty and clears every flag in one round-lock critical
    /// section, so no worker is released before the rotation it depends on.
    fn publish(&self, mut round: MutexGuard<'_, RoundState>) {
        {
            let mut publication = self.shared.publication.lock();
            round.roles.rotate();
            round.generation += 1;
            publication.publish(round.roles.current, round.generation);
        }
        round.done.fill(false);
        let generation = round.generation;
        drop(round);

        self.shared.round_released.notify_all();
        self.shared.published.notify_all();
        tracing::trace!("published generation {generation}");
    }
}
