//! Fan-out of validated readings to observers.
//!
//! The dispatcher is the single consumer of the ingestion queue. Each raw
//! sample is converted into a [`SensorReading`] and handed to every
//! observer in registration order. An observer failing never keeps the
//! reading from the observers after it.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::model::{RawSample, SensorReading};
use crate::queue::Consumer;
use crate::sink::JournalError;

/// Why an observer could not take a reading.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
}

/// Something that wants every new reading.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn on_new_read(&self, reading: &SensorReading) -> Result<(), ObserverError>;
}

/// Counts reported when the dispatcher finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Readings handed to observers.
    pub delivered: u64,
    /// Samples that failed validation and were dropped.
    pub invalid: u64,
    /// Individual observer calls that returned an error.
    pub observer_failures: u64,
}

/// Fixed, ordered set of observers.
pub struct Dispatcher {
    observers: Vec<Box<dyn Observer>>,
}

impl Dispatcher {
    pub fn new(observers: Vec<Box<dyn Observer>>) -> Self {
        Self { observers }
    }

    pub fn observer_names(&self) -> Vec<&str> {
        self.observers.iter().map(|o| o.name()).collect()
    }

    /// Hand one reading to every observer, in order. Returns the number of failures.
    pub async fn deliver(&self, reading: &SensorReading) -> u64 {
        let mut failures = 0;
        for observer in &self.observers {
            if let Err(e) = observer.on_new_read(reading).await {
                warn!(
                    observer = observer.name(),
                    time = reading.time,
                    error = %e,
                    "observer failed"
                );
                failures += 1;
            }
        }
        failures
    }

    /// Consume `samples` until the queue closes and drains.
    pub async fn run(&self, mut samples: Consumer<RawSample>) -> DispatchSummary {
        let mut summary = DispatchSummary::default();

        while let Some(sample) = samples.get().await {
            match SensorReading::try_from(&sample) {
                Ok(reading) => {
                    debug!(time = reading.time, "dispatching reading");
                    summary.observer_failures += self.deliver(&reading).await;
                    summary.delivered += 1;
                }
                Err(e) => {
                    warn!(time = sample.time(), error = %e, "dropping invalid sample");
                    summary.invalid += 1;
                }
            }
            samples.task_done();
        }

        info!(
            delivered = summary.delivered,
            invalid = summary.invalid,
            "dispatcher finished"
        );
        summary
    }
}
