// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_channel::{Receiver, Sender};

use crate::job::Job;

/// Handle to one worker's private inbox. There is exactly one handle per worker and it
/// is either resting in the [`IdleRegistry`] or held by the dispatcher.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    id: usize,
    inbox: Sender<Job>,
}

impl WorkerHandle {
    pub(crate) fn new(id: usize, inbox: Sender<Job>) -> Self {
        Self { id, inbox }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Puts the job into the worker's inbox, waiting while the inbox is full.
    /// Gives the job back if the worker is gone.
    pub(crate) async fn deliver(&self, job: Job) -> Result<(), Job> {
        self.inbox.send(job).await.map_err(|err| err.into_inner())
    }

    /// Closes the inbox. The worker still runs what is buffered, then retires.
    pub(crate) fn retire(self) {
        if self.inbox.close() {
            log::debug!("Closed inbox of worker {}", self.id);
        }
    }
}

/// Bounded collection of idle worker handles, capacity = number of workers.
#[derive(Debug, Clone)]
pub(crate) struct IdleRegistry {
    tx: Sender<WorkerHandle>,
    rx: Receiver<WorkerHandle>,
}

impl IdleRegistry {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, rx) = async_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Returns a handle to the registry. Fails only once the registry is closed, in which
    /// case the handle is retired right away.
    pub(crate) async fn put(&self, handle: WorkerHandle) -> bool {
        match self.tx.send(handle).await {
            Ok(()) => true,
            Err(err) => {
                let handle = err.into_inner();
                log::debug!("Registry closed, retiring worker {}", handle.id());
                handle.retire();
                false
            }
        }
    }

    /// Takes the next idle handle, waiting until one is available. `None` once the
    /// registry is closed and empty.
    pub(crate) async fn take(&self) -> Option<WorkerHandle> {
        self.rx.recv().await.ok()
    }

    /// Non-waiting variant of [`take`](Self::take).
    pub(crate) fn try_take(&self) -> Option<WorkerHandle> {
        self.rx.try_recv().ok()
    }

    pub(crate) fn idle(&self) -> usize {
        self.rx.len()
    }

    pub(crate) fn close(&self) {
        self.tx.close();
    }
}
