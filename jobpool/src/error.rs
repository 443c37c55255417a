// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

/// Errors reported by the pool's own API. Failures inside a job never show up here,
/// they go to the pool's [`ErrorSink`](crate::ErrorSink).
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {field} must be at least 1 (got {value})")]
    InvalidConfiguration { field: &'static str, value: usize },

    #[error("pool has already been started")]
    AlreadyStarted,

    #[error("intake queue is full")]
    QueueFull,

    #[error("pool has shut down and no longer accepts jobs")]
    ShutDown,

    #[error("failed to spawn pool thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("malformed pool configuration: {0}")]
    ConfigFormat(#[from] serde_json::Error),
}

pub type PoolResult<T> = Result<T, PoolError>;
