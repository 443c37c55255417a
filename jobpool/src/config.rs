// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Sizes of a pool. All three values are at least 1 and cannot change once the
/// configuration has been built.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    max_jobs: usize,
    max_workers: usize,
    worker_inbox_capacity: usize,
}

impl PoolConfig {
    pub fn new(
        max_jobs: usize,
        max_workers: usize,
        worker_inbox_capacity: usize,
    ) -> PoolResult<Self> {
        let config = Self {
            max_jobs,
            max_workers,
            worker_inbox_capacity,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses a JSON object such as
    /// `{"max_jobs": 1000, "max_workers": 50, "worker_inbox_capacity": 10}`.
    pub fn from_json(json: &str) -> PoolResult<Self> {
        let config: PoolConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn validate(&self) -> PoolResult<()> {
        for (field, value) in [
            ("max_jobs", self.max_jobs),
            ("max_workers", self.max_workers),
            ("worker_inbox_capacity", self.worker_inbox_capacity),
        ] {
            if value < 1 {
                return Err(PoolError::InvalidConfiguration { field, value });
            }
        }
        Ok(())
    }

    /// Capacity of the intake queue.
    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    /// Number of workers spawned at start.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn worker_inbox_capacity(&self) -> usize {
        self.worker_inbox_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_sizes() {
        for (sizes, expected) in [
            ((0, 5, 5), "max_jobs"),
            ((5, 0, 5), "max_workers"),
            ((5, 5, 0), "worker_inbox_capacity"),
        ] {
            match PoolConfig::new(sizes.0, sizes.1, sizes.2) {
                Err(PoolError::InvalidConfiguration { field, value }) => {
                    assert_eq!(field, expected);
                    assert_eq!(value, 0);
                }
                other => panic!("expected InvalidConfiguration for {sizes:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn accepts_minimal_sizes() {
        let config = PoolConfig::new(1, 1, 1).unwrap();
        assert_eq!(config.max_jobs(), 1);
        assert_eq!(config.max_workers(), 1);
        assert_eq!(config.worker_inbox_capacity(), 1);
    }

    #[test]
    fn from_json_validates() {
        let config =
            PoolConfig::from_json(r#"{"max_jobs":1000,"max_workers":50,"worker_inbox_capacity":10}"#)
                .unwrap();
        assert_eq!(config, PoolConfig::new(1000, 50, 10).unwrap());

        assert!(matches!(
            PoolConfig::from_json(r#"{"max_jobs":1,"max_workers":0,"worker_inbox_capacity":1}"#),
            Err(PoolError::InvalidConfiguration {
                field: "max_workers",
                ..
            })
        ));
        assert!(matches!(
            PoolConfig::from_json(r#"{"max_jobs":1}"#),
            Err(PoolError::ConfigFormat(_))
        ));
    }
}
