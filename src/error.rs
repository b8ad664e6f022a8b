//! Error types for startup and shutdown.
//!
//! Nothing in the steady-state generation loop returns an error: a running
//! simulation either keeps producing generations or is shut down.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The simulation was asked to start with an unusable configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Worker count must be positive.
    #[error("worker count must be at least 1")]
    NoWorkers,

    /// The seed grid has no cells.
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid {
        /// Seed width.
        width: usize,
        /// Seed height.
        height: usize,
    },

    /// A config file or command-line value could not be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The seed grid could not be produced.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The seed file could not be read.
    #[error("could not read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The seed image could not be decoded.
    #[error("could not decode image {path}: {source}")]
    Image {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: image::ImageError,
    },

    /// The seed contained no cells at all.
    #[error("seed pattern is empty")]
    Empty,
}

/// Errors surfaced by [`Sim`](crate::Sim) at spawn or join time.
#[derive(Error, Debug)]
pub enum SimError {
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`LoadError`].
    #[error(transparent)]
    Load(#[from] LoadError),

    /// An OS thread could not be started.
    #[error("could not spawn {name}: {source}")]
    Spawn {
        /// Thread name.
        name: String,
        /// Underlying error.
        source: io::Error,
    },

    /// A worker or the coordinator panicked.
    #[error("thread {0} panicked")]
    ThreadPanicked(String),
}

/// Result type for simulation setup and teardown.
pub type SimResult<T> = Result<T, SimError>;
