//! Cancellation signal for the session
//!
//! One [`ShutdownTrigger`] fires; any number of [`Shutdown`] handles observe it.

use std::future::Future;

use tokio::sync::watch;

/// Fires the shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

/// Observes the shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

/// Create a connected trigger/observer pair
#[must_use]
pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (
        ShutdownTrigger {
            tx: std::sync::Arc::new(tx),
        },
        Shutdown { rx },
    )
}

impl ShutdownTrigger {
    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Fire on Ctrl-C
    pub fn trigger_on_ctrl_c(&self) {
        let trigger = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received");
                trigger.trigger();
            }
        });
    }
}

impl Shutdown {
    /// Whether shutdown has been requested
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested
    ///
    /// Never resolves if every trigger is dropped without firing.
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless shutdown fires first
    ///
    /// Returns `None` when interrupted.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_triggered() {
            return None;
        }

        tokio::select! {
            biased;
            () = self.triggered() => None,
            out = fut => Some(out),
        }
    }
}
