// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

pub mod concurrency;
pub mod gate;

use std::time::{Duration, Instant};

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Polls `cond` until it holds or `timeout` has passed. Returns the last result.
pub fn eventually(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
