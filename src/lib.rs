//! A game of life engine that splits the grid into column ranges, one per
//! worker thread, and hands finished generations to a single consumer.
//!
//! ```no_run
//! use columnlife::{loader::PatternLoader, EngineConfig, SeedLoader, Sim};
//!
//! let seed = PatternLoader::new(".#.\n..#\n###\n").load()?;
//! let (sim, mut bridge) = Sim::spawn(&seed, &EngineConfig::with_workers(4))?;
//! loop {
//!     if let Some(frame) = bridge.poll() {
//!         println!("generation {}\n{}", frame.generation, frame.grid);
//!     }
//!     # break;
//! }
//! sim.shutdown()?;
//! # Ok::<(), columnlife::SimError>(())
//! ```

pub use utils::Pos;
mod utils;

pub use error::{ConfigError, LoadError, SimError, SimResult};
pub mod error;

pub use grid::{Cell, CellGrid, Grid};
pub mod grid;

pub use partition::{plan_columns, ColumnRange};
pub mod partition;

pub use config::{Config, EngineConfig, ViewConfig};
pub mod config;

pub use loader::SeedLoader;
pub mod loader;

pub use sim::{Sim, SimHandle, SimStats};
mod sim;

pub use bridge::{ConsumerBridge, Frame, GenerationConsumer};
pub mod bridge;

pub use view::View;
pub mod view;
