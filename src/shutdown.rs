//! Process-wide cancellation signal.
//!
//! Set once, observed by every loop. Dropping the [`Trigger`] counts as
//! firing it: with no one left to fire, waiting forever is never right.

use tokio::sync::watch;

pub fn channel() -> (Trigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (Trigger(tx), Shutdown(rx))
}

/// Fires the shutdown signal.
#[derive(Debug)]
pub struct Trigger(watch::Sender<bool>);

impl Trigger {
    pub fn fire(&self) {
        self.0.send_replace(true);
    }
}

/// Observes the shutdown signal.
#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    /// Resolve once shutdown has been signalled. Cancel safe.
    pub async fn wait(&mut self) {
        // An error means the trigger is gone, which counts as fired.
        let _ = self.0.wait_for(|set| *set).await;
    }
}
