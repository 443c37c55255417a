// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicUsize, Ordering};

/// Records how many jobs run at the same time and the highest value ever seen.
#[derive(Debug, Default)]
pub struct ConcurrencyMeter {
    running: AtomicUsize,
    high_water: AtomicUsize,
}

impl ConcurrencyMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a job as running until the returned guard is dropped.
    pub fn enter(&self) -> RunningGuard<'_> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);
        RunningGuard { meter: self }
    }

    pub fn high_water(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

pub struct RunningGuard<'a> {
    meter: &'a ConcurrencyMeter,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.meter.running.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_water_tracks_nested_entries() {
        let meter = ConcurrencyMeter::new();
        {
            let _a = meter.enter();
            let _b = meter.enter();
        }
        let _c = meter.enter();
        assert_eq!(meter.high_water(), 2);
    }
}
