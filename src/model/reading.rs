//! Sensor readings: the validated record delivered to observers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RawSample;

/// Why a raw sample could not become a reading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadingError {
    #[error("missing field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` is not {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// One telemetry sample from the simulated board.
///
/// Serializes to the flat object the telemetry endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub time: i64,
    pub fan_speed: i64,
    pub temperature_c: f64,
    pub gas_level: i64,
    pub light_level: i64,
}

impl TryFrom<&RawSample> for SensorReading {
    type Error = ReadingError;

    fn try_from(sample: &RawSample) -> Result<Self, Self::Error> {
        Ok(Self {
            time: sample.time(),
            fan_speed: integer(sample, "fan_speed")?,
            temperature_c: float(sample, "temperature_c")?,
            gas_level: integer(sample, "gas_level")?,
            light_level: integer(sample, "light_level")?,
        })
    }
}

fn field<'a>(sample: &'a RawSample, name: &'static str) -> Result<&'a Value, ReadingError> {
    match sample.get(name) {
        None | Some(Value::Null) => Err(ReadingError::Missing(name)),
        Some(v) => Ok(v),
    }
}

fn integer(sample: &RawSample, name: &'static str) -> Result<i64, ReadingError> {
    field(sample, name)?
        .as_i64()
        .ok_or(ReadingError::WrongType {
            field: name,
            expected: "an integer",
        })
}

// Integral JSON numbers are accepted as floats; the board prints `21` for 21.0.
fn float(sample: &RawSample, name: &'static str) -> Result<f64, ReadingError> {
    field(sample, name)?.as_f64().ok_or(ReadingError::WrongType {
        field: name,
        expected: "a number",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn sample(value: Value) -> RawSample {
        RawSample::try_from(value).unwrap()
    }

    #[test]
    fn complete_sample_converts() {
        let raw = sample(json!({
            "time": 10,
            "fan_speed": 2,
            "temperature_c": 21.5,
            "gas_level": 1,
            "light_level": 300,
        }));

        let reading = SensorReading::try_from(&raw).unwrap();
        assert_eq!(
            reading,
            SensorReading {
                time: 10,
                fan_speed: 2,
                temperature_c: 21.5,
                gas_level: 1,
                light_level: 300,
            }
        );
    }

    #[test]
    fn integral_temperature_is_accepted() {
        let raw = sample(json!({
            "time": 1, "fan_speed": 0, "temperature_c": 21, "gas_level": 0, "light_level": 0,
        }));
        assert!((SensorReading::try_from(&raw).unwrap().temperature_c - 21.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_field_fails() {
        let raw = sample(json!({"time": 1, "fan_speed": 0, "temperature_c": 20.0, "gas_level": 0}));
        assert_eq!(
            SensorReading::try_from(&raw),
            Err(ReadingError::Missing("light_level"))
        );
    }

    #[test]
    fn null_counts_as_missing() {
        let raw = sample(json!({
            "time": 1, "fan_speed": null, "temperature_c": 20.0, "gas_level": 0, "light_level": 0,
        }));
        assert_eq!(
            SensorReading::try_from(&raw),
            Err(ReadingError::Missing("fan_speed"))
        );
    }

    #[test]
    fn mistyped_field_fails() {
        let raw = sample(json!({
            "time": 1, "fan_speed": 2.5, "temperature_c": 20.0, "gas_level": 0, "light_level": 0,
        }));
        assert!(matches!(
            SensorReading::try_from(&raw),
            Err(ReadingError::WrongType {
                field: "fan_speed",
                ..
            })
        ));
    }

    #[test]
    fn serializes_flat() {
        let reading = SensorReading {
            time: 3,
            fan_speed: 1,
            temperature_c: 19.5,
            gas_level: 4,
            light_level: 250,
        };
        assert_eq!(
            serde_json::to_value(&reading).unwrap(),
            json!({
                "time": 3,
                "fan_speed": 1,
                "temperature_c": 19.5,
                "gas_level": 4,
                "light_level": 250,
            })
        );
    }
}
