// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

//! Wait-group for the pool's workers.
//!
//! Every worker holds a [`RetirementGuard`]. The guard owns a sender of a channel nobody
//! writes to; once the last guard is dropped the channel closes and everybody blocked in
//! [`CompletionTracker::wait`] wakes up. The live counter is only kept for statistics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{Receiver, Sender};

#[derive(Debug)]
pub(crate) struct CompletionTracker {
    live: Arc<AtomicUsize>,
    enrolment: Mutex<Option<Sender<()>>>,
    retired: Receiver<()>,
}

impl CompletionTracker {
    pub(crate) fn new() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            enrolment: Mutex::new(Some(tx)),
            retired: rx,
        }
    }

    /// Hands out a guard for one more worker. Returns `None` once the tracker is sealed.
    pub(crate) fn enroll(&self) -> Option<RetirementGuard> {
        let enrolment = self
            .enrolment
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let tx = enrolment.as_ref()?.clone();
        self.live.fetch_add(1, Ordering::SeqCst);
        Some(RetirementGuard {
            live: self.live.clone(),
            _tx: tx,
        })
    }

    /// No more workers will be enrolled. Until this is called `wait` cannot return.
    pub(crate) fn seal(&self) {
        self.enrolment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub(crate) fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Blocks until the tracker is sealed and every guard has been dropped.
    pub(crate) fn wait(&self) {
        let _ = self.retired.recv_blocking();
    }

    pub(crate) async fn wait_async(&self) {
        let _ = self.retired.recv().await;
    }
}

/// Held by a worker for its whole life. Dropping it marks the worker as retired, also
/// when the worker thread unwinds.
#[derive(Debug)]
pub(crate) struct RetirementGuard {
    live: Arc<AtomicUsize>,
    _tx: Sender<()>,
}

impl Drop for RetirementGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
