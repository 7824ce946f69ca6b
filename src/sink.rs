//! Concrete observers.

mod journal;
mod telemetry;

pub use journal::{Journal, JournalError, JournalObserver};
pub use telemetry::TelemetryObserver;
