// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use crate::job::JobFailure;

/// Receives failures of jobs. Called on the worker thread right after the failing job,
/// so implementations should return quickly.
pub trait ErrorSink: Send + Sync {
    fn report(&self, failure: JobFailure);
}

/// Default sink: one `error!` record per failed job.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, failure: JobFailure) {
        log::error!("{failure}");
    }
}

impl<F> ErrorSink for F
where
    F: Fn(JobFailure) + Send + Sync,
{
    fn report(&self, failure: JobFailure) {
        self(failure)
    }
}
