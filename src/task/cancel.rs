//! Cancellation for poll-to-completion loops
//!
//! A [`Cancellation`] fires when its paired [`CancelHandle`] is triggered or
//! when its deadline passes, whichever comes first. Either part is optional;
//! `Cancellation::none()` never fires.

use std::future::pending;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Sender side used to cancel an in-flight poll loop
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // No receivers left means nothing is polling; nothing to do
        let _ = self.sender.send(true);
    }
}

/// Receiver side checked by the poller between round trips
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    signal: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A cancellation that never fires
    pub fn none() -> Self {
        Self::default()
    }

    /// A linked handle/cancellation pair
    pub fn pair() -> (CancelHandle, Self) {
        let (sender, receiver) = watch::channel(false);
        (
            CancelHandle { sender },
            Self {
                signal: Some(receiver),
                deadline: None,
            },
        )
    }

    /// Fire no later than `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the signal was triggered or the deadline has passed
    pub fn is_cancelled(&self) -> bool {
        let signalled = self
            .signal
            .as_ref()
            .map_or(false, |receiver| *receiver.borrow());
        let expired = self
            .deadline
            .map_or(false, |deadline| Instant::now() >= deadline);

        signalled || expired
    }

    /// Resolve once cancelled; pends forever if nothing can fire
    pub async fn cancelled(&mut self) {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        let signalled = async {
            match self.signal.as_mut() {
                Some(receiver) => loop {
                    if *receiver.borrow_and_update() {
                        return;
                    }
                    if receiver.changed().await.is_err() {
                        // Handle dropped without cancelling
                        pending::<()>().await;
                    }
                },
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            _ = expired => {}
            _ = signalled => {}
        }
    }
}
