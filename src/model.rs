//! Core data model for the relay.
//!
//! Two shapes of the same record flow through the pipeline: the loosely
//! typed [`RawSample`] scraped off the console, and the validated
//! [`SensorReading`] handed to observers. Conversion between them is the
//! one place field types are enforced.

mod journal;
mod reading;
mod sample;

pub use journal::JournalEntry;
pub use reading::{ReadingError, SensorReading};
pub use sample::{RawSample, SampleError};
