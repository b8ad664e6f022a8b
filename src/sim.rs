use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{
    bridge::ConsumerBridge,
    config::EngineConfig,
    error::{SimError, SimResult},
    grid::SharedGrid,
    partition::plan_columns,
    CellGrid, Grid,
};

use coordinator::Coordinator;
use worker::WorkerContext;

mod coordinator;
mod worker;

/// Slot indices into the three-buffer pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Roles {
    pub current: usize,
    pub next: usize,
    pub scratch: usize,
}

impl Roles {
    const INITIAL: Roles = Roles {
        current: 0,
        next: 1,
        scratch: 2,
    };

    /// The freshly written buffer becomes current, the retired current idles
    /// as scratch for one round, and the old scratch is written next.
    pub fn rotate(&mut self) {
        *self = Roles {
            current: self.next,
            next: self.scratch,
            scratch: self.current,
        };
    }
}

/// Everything guarded by the round lock.
#[derive(Debug)]
pub(crate) struct RoundState {
    /// Per-worker "finished this round" flags.
    pub done: Vec<bool>,
    pub roles: Roles,
    /// Generations published so far.
    pub generation: u64,
    /// Publish only while `generation < limit`.
    pub limit: Option<u64>,
    pub generation_interval: Duration,
}

impl RoundState {
    pub fn is_complete(&self) -> bool {
        self.done.iter().all(|&done| done)
    }

    pub fn may_publish(&self) -> bool {
        self.limit.map_or(true, |limit| self.generation < limit)
    }
}

/// Everything guarded by the publication lock: the dirty marker and what it points at.
#[derive(Debug)]
pub(crate) struct Publication {
    pub current: usize,
    pub generation: u64,
    pub dirty: bool,
    /// Buffer the consumer is copying out of. It must not be rotated into `next`.
    pub reading: Option<usize>,
    rate_window: (Instant, u64),
    rate: f64,
    last_publish: Instant,
}

const RATE_WINDOW: Duration = Duration::from_secs(1);

impl Publication {
    fn new() -> Self {
        Self {
            current: Roles::INITIAL.current,
            generation: 0,
            // the seed is the first thing a consumer sees
            dirty: true,
            reading: None,
            rate_window: (Instant::now(), 0),
            rate: 0.0,
            last_publish: Instant::now(),
        }
    }

    pub fn publish(&mut self, current: usize, generation: u64) {
        self.current = current;
        self.generation = generation;
        self.dirty = true;
        self.last_publish = Instant::now();

        let (since, base) = self.rate_window;
        let elapsed = since.elapsed();
        if elapsed >= RATE_WINDOW {
            self.rate = (generation - base) as f64 / elapsed.as_secs_f64();
            self.rate_window = (Instant::now(), generation);
        }
    }

    /// Generations per second over the last window, zero once a whole window
    /// passes without a publish.
    pub fn rate(&self) -> f64 {
        if self.last_publish.elapsed() >= RATE_WINDOW {
            0.0
        } else {
            self.rate
        }
    }
}

pub(crate) struct Shared {
    pub buffers: [SharedGrid; 3],
    pub round: Mutex<RoundState>,
    /// Coordinator to workers: flags were cleared.
    pub round_released: Condvar,
    /// Workers and controls to coordinator: something it waits on changed.
    pub round_progress: Condvar,
    pub publication: Mutex<Publication>,
    /// Coordinator to generation waiters.
    pub published: Condvar,
    running: AtomicBool,
    pub poll_interval: Duration,
    pub workers: usize,
}

impl Shared {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Raises the shutdown flag and wakes every waiter.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        // taking each lock orders the store before any waiter's next check
        drop(self.round.lock());
        self.round_released.notify_all();
        self.round_progress.notify_all();
        drop(self.publication.lock());
        self.published.notify_all();
    }
}

/// Stops the whole simulation if the owning thread unwinds.
pub(crate) struct StopOnPanic<'a>(pub &'a Shared);

impl Drop for StopOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.stop();
        }
    }
}

/// Point-in-time view of a running simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimStats {
    pub generation: u64,
    pub workers: usize,
    pub width: usize,
    pub height: usize,
    pub paused: bool,
    pub generation_interval: Duration,
    pub generations_per_second: f64,
}

/// Cloneable control surface of a running simulation.
#[derive(Clone)]
pub struct SimHandle {
    shared: Arc<Shared>,
}

impl SimHandle {
    /// Holds publication at the current generation.
    pub fn pause(&self) {
        let mut round = self.shared.round.lock();
        round.limit = Some(round.generation);
    }

    pub fn resume(&self) {
        self.shared.round.lock().limit = None;
        self.shared.round_progress.notify_all();
    }

    /// Allows `count` more generations past the current hold point, then holds again.
    pub fn step(&self, count: u64) {
        let mut round = self.shared.round.lock();
        let from = round.limit.unwrap_or(round.generation).max(round.generation);
        round.limit = Some(from + count);
        drop(round);
        self.shared.round_progress.notify_all();
    }

    pub fn set_generation_interval(&self, interval: Duration) {
        self.shared.round.lock().generation_interval = interval;
        self.shared.round_progress.notify_all();
    }

    pub fn generation_interval(&self) -> Duration {
        self.shared.round.lock().generation_interval
    }

    pub fn generation(&self) -> u64 {
        self.shared.publication.lock().generation
    }

    /// Blocks until `generation` has been published. Returns `false` on timeout
    /// or when the simulation stops first.
    pub fn wait_for_generation(&self, generation: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut publication = self.shared.publication.lock();
        while publication.generation < generation {
            if !self.shared.is_running() {
                return false;
            }
            if self
                .shared
                .published
                .wait_until(&mut publication, deadline)
                .timed_out()
            {
                return publication.generation >= generation;
            }
        }
        true
    }

    pub fn stats(&self) -> SimStats {
        let round = self.shared.round.lock();
        let publication = self.shared.publication.lock();
        let current = &self.shared.buffers[publication.current];
        SimStats {
            generation: publication.generation,
            workers: self.shared.workers,
            width: current.width(),
            height: current.height(),
            paused: !round.may_publish(),
            generation_interval: round.generation_interval,
            generations_per_second: publication.rate(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Signals shutdown without waiting for threads to exit.
    pub fn shutdown(&self) {
        self.shared.stop();
    }
}

/// A running simulation: `workers` compute threads plus one coordinator.
pub struct Sim {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
}

impl Sim {
    /// Starts the engine on `seed`. The returned bridge is the only consumer
    /// endpoint and first delivers the seed itself as generation 0.
    pub fn spawn(seed: &Grid, config: &EngineConfig) -> SimResult<(Self, ConsumerBridge)> {
        config.validate()?;
        let ranges = plan_columns(seed.width(), config.workers)?;

        let limit = if config.start_paused {
            Some(0)
        } else {
            config.generation_limit()
        };
        let shared = Arc::new(Shared {
            buffers: [
                SharedGrid::from_grid(seed),
                SharedGrid::blank(seed.width(), seed.height()),
                SharedGrid::blank(seed.width(), seed.height()),
            ],
            round: Mutex::new(RoundState {
                done: vec![false; config.workers],
                roles: Roles::INITIAL,
                generation: 0,
                limit,
                generation_interval: config.generation_interval(),
            }),
            round_released: Condvar::new(),
            round_progress: Condvar::new(),
            publication: Mutex::new(Publication::new()),
            published: Condvar::new(),
            running: AtomicBool::new(true),
            poll_interval: config.poll_interval(),
            workers: config.workers,
        });

        let mut sim = Self {
            shared: Arc::clone(&shared),
            threads: Vec::with_capacity(config.workers + 1),
        };

        for (index, range) in ranges.into_iter().enumerate() {
            let context = WorkerContext::new(index, range, Arc::clone(&shared));
            sim.spawn_thread(format!("life-worker-{index}"), move || context.run())?;
        }
        let coordinator = Coordinator::new(Arc::clone(&shared));
        sim.spawn_thread("life-coordinator".into(), move || coordinator.run())?;

        tracing::info!(
            "simulation started: {}x{} grid, {} workers",
            seed.width(),
            seed.height(),
            config.workers
        );

        let bridge = ConsumerBridge::new(shared, seed.clone());
        Ok((sim, bridge))
    }

    fn spawn_thread(&mut self, name: String, f: impl FnOnce() + Send + 'static) -> SimResult<()> {
        // on error the caller drops the half-built `Sim`, which stops and joins what started
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(f)
            .map_err(|source| SimError::Spawn { name, source })?;
        self.threads.push(thread);
        Ok(())
    }

    pub fn handle(&self) -> SimHandle {
        let shared = Arc::clone(&self.shared);
        SimHandle { shared }
    }

    /// Stops every thread and waits for them. Returns the last published generation.
    pub fn shutdown(mut self) -> SimResult<u64> {
        self.shared.stop();
        let mut panicked = None;
        for thread in self.threads.drain(..) {
            let name = thread.thread().name().unwrap_or("unnamed").to_owned();
            if thread.join().is_err() && panicked.is_none() {
                panicked = Some(name);
            }
        }
        match panicked {
            Some(name) => Err(SimError::ThreadPanicked(name)),
            None => Ok(self.shared.publication.lock().generation),
        }
    }

    /// Waits for the simulation to stop on its own (a thread failed) or be
    /// shut down through a [`SimHandle`].
    pub fn join(self) -> SimResult<u64> {
        {
            // `stop` takes this lock before notifying, so the wake-up cannot be missed
            let mut publication = self.shared.publication.lock();
            while self.shared.is_running() {
                self.shared.published.wait(&mut publication);
            }
        }
        self.shutdown()
    }
}

impl Drop for Sim {
    fn drop(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        self.shared.stop();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
    }
}
