//! Raw samples: one decoded console line, not yet validated.

use serde_json::{Map, Value};

/// Key every sample must carry; samples are ordered by it.
pub const TIME_KEY: &str = "time";

/// Why a decoded line was not accepted as a sample.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    #[error("record is not an object")]
    NotARecord,

    #[error("record has no `time` key")]
    MissingTime,

    #[error("record `time` is not an integer: {0}")]
    InvalidTime(Value),
}

/// A structurally valid record: a JSON object with an integer `time`.
///
/// Every other key is opaque payload until the sample is converted
/// into a [`SensorReading`](super::SensorReading).
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    time: i64,
    fields: Map<String, Value>,
}

impl RawSample {
    /// The ordering key.
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl TryFrom<Value> for RawSample {
    type Error = SampleError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(fields) = value else {
            return Err(SampleError::NotARecord);
        };
        let time = match fields.get(TIME_KEY) {
            None => return Err(SampleError::MissingTime),
            Some(v) => v.as_i64().ok_or_else(|| SampleError::InvalidTime(v.clone()))?,
        };
        Ok(Self { time, fields })
    }
}
