// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>
//! # Design: Bounded Worker Pool
//!
//! ## Overview
//! A fixed set of workers runs arbitrary `FnOnce()` jobs, at most one job per worker at a
//! time. Submission is bounded, shutdown is cooperative.
//!
//! - `schedule` pushes into a bounded intake queue and blocks while it is full.
//! - A single dispatcher thread pulls a job, takes an idle worker handle from the idle
//!   registry, puts the job into that worker's inbox and returns the handle.
//! - Every worker runs on its own thread and serves its private, bounded inbox in FIFO
//!   order. Workers never touch the registry after registering once.
//! - Cancelling the token stops the dispatcher. Jobs still in the intake queue are
//!   dropped, every inbox is closed, workers drain what they hold and retire.
//! - A job that panics is reported to the error sink; the worker keeps going.
//!
//! ```text
//!     schedule() ----> +--------------------+
//!                      |  intake (max_jobs) |
//!                      +---------+----------+
//!                                |
//!                      +---------v----------+        +-------------------------+
//!                      |     dispatcher     | <----> | idle registry (handles) |
//!                      +---------+----------+        +-------------------------+
//!                                |
//!              +-----------------+-----------------+
//!              |                 |                 |
//!         +----v----+       +----v----+       +----v----+
//!         | inbox 0 |       | inbox 1 |  ...  | inbox n |
//!         | worker  |       | worker  |       | worker  |
//!         +---------+       +---------+       +---------+
//! ```

pub mod cancellation;
mod completion;
pub mod config;
mod dispatcher;
pub mod error;
pub mod error_sink;
mod idle_registry;
pub mod job;
pub mod pool;
pub mod stats;
mod worker;

pub use cancellation::CancellationToken;
pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use error_sink::{ErrorSink, LogSink};
pub use job::{Job, JobFailure};
pub use pool::Pool;
pub use stats::PoolStats;

#[cfg(test)]
mod tests;
