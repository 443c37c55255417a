// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_channel::Receiver;

use crate::completion::RetirementGuard;
use crate::error_sink::ErrorSink;
use crate::idle_registry::{IdleRegistry, WorkerHandle};
use crate::job::{Job, JobFailure};
use crate::stats::PoolMetrics;

/// One execution unit of the pool. Owns the receiving side of its inbox; the sending side
/// lives in the worker's [`WorkerHandle`].
pub(crate) struct Worker {
    id: usize,
    inbox: Receiver<Job>,
    sink: Arc<dyn ErrorSink>,
    metrics: Arc<PoolMetrics>,
    guard: RetirementGuard,
}

impl Worker {
    /// Creates the worker together with the handle it will register as idle.
    pub(crate) fn new(
        id: usize,
        inbox_capacity: usize,
        sink: Arc<dyn ErrorSink>,
        metrics: Arc<PoolMetrics>,
        guard: RetirementGuard,
    ) -> (Self, WorkerHandle) {
        let (tx, rx) = async_channel::bounded(inbox_capacity);
        let worker = Self {
            id,
            inbox: rx,
            sink,
            metrics,
            guard,
        };
        (worker, WorkerHandle::new(id, tx))
    }

    /// Runs the worker loop on a dedicated thread.
    pub(crate) fn spawn(
        self,
        handle: WorkerHandle,
        registry: IdleRegistry,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("jobpool-worker-{}", self.id))
            .spawn(move || futures::executor::block_on(self.run(handle, registry)))
    }

    /// Registers as idle once, then serves the inbox until it is closed and drained.
    pub(crate) async fn run(self, handle: WorkerHandle, registry: IdleRegistry) {
        if !registry.put(handle).await {
            log::debug!("Worker {} could not register, pool already shut down", self.id);
        }

        log::debug!("Worker {} started", self.id);
        while let Ok(job) = self.inbox.recv().await {
            self.execute(job);
        }
        log::debug!("Worker {} retired, inbox closed", self.id);
        drop(self.guard);
    }

    fn execute(&self, job: Job) {
        let desc = job.desc().map(str::to_owned);
        log::debug!(
            "Worker {} executing job {}",
            self.id,
            desc.as_deref().unwrap_or("<unnamed>")
        );

        let outcome = job.run();
        self.metrics.job_executed();

        if let Err(message) = outcome {
            self.metrics.job_failed();
            let failure = JobFailure {
                worker: self.id,
                desc,
                message,
            };
            // a panicking sink must not take the worker and its buffered inbox down with it
            let reported = panic::catch_unwind(AssertUnwindSafe(|| self.sink.report(failure)));
            if reported.is_err() {
                log::error!("Error sink panicked on worker {}", self.id);
            }
        }
    }
}
