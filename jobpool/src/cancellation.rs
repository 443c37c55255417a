// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use async_channel::{Receiver, Sender};

/// Shared, cooperative shutdown signal.
///
/// Nothing is ever sent over the inner channel; cancelling closes it, which wakes every
/// pending `recv` at once. Cancelling a pool's token stops the dispatcher from pulling new
/// jobs. Jobs already handed to a worker still run, but jobs that were accepted by
/// `schedule` and are still waiting in the intake queue are dropped.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl CancellationToken {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self { tx, rx }
    }

    /// Signals cancellation. Calling it more than once has no further effect.
    pub fn cancel(&self) {
        if self.tx.close() {
            log::debug!("Cancellation signalled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone of this token.
    pub async fn cancelled(&self) {
        // recv only returns once the channel is closed and empty
        let _ = self.rx.recv().await;
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
