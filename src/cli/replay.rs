//! Offline replay of saved console snapshots.

use std::fs;
use std::path::PathBuf;

use crate::delta::Watermark;
use crate::model::{ReadingError, SensorReading};
use crate::parse::extract_samples;

/// Outcome of replaying one snapshot.
#[derive(Debug, Default)]
struct Replayed {
    readings: Vec<SensorReading>,
    rejected: Vec<(i64, ReadingError)>,
}

fn replay_snapshot(watermark: &mut Watermark, text: &str) -> Replayed {
    let mut out = Replayed::default();
    for sample in watermark.advance(extract_samples(text)) {
        match SensorReading::try_from(&sample) {
            Ok(reading) => out.readings.push(reading),
            Err(e) => out.rejected.push((sample.time(), e)),
        }
    }
    out
}

/// `--after TIME` replays only samples newer than `TIME`.
fn starting_watermark(after: Option<i64>) -> Watermark {
    after.map(Watermark::new).unwrap_or_default()
}

pub fn cmd_replay(files: &[PathBuf], after: Option<i64>) -> Result<(), String> {
    let mut watermark = starting_watermark(after);

    for path in files {
        let text = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let replayed = replay_snapshot(&mut watermark, &text);

        for reading in &replayed.readings {
            let json = serde_json::to_string(reading)
                .map_err(|e| format!("failed to serialize reading: {e}"))?;
            println!("{json}");
        }
        for (time, e) in &replayed.rejected {
            eprintln!("{}: skipped sample at time {time}: {e}", path.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    const FULL: &str = r#"{"time": 10, "fan_speed": 2, "temperature_c": 21.5, "gas_level": 1, "light_level": 300}"#;

    #[test]
    fn snapshots_share_one_watermark() {
        let mut watermark = Watermark::default();
        let first = replay_snapshot(&mut watermark, FULL);
        let second = replay_snapshot(&mut watermark, &format!("{FULL}\n{{\"time\": 11,"));

        assert_eq!(first.readings.len(), 1);
        assert!((first.readings[0].temperature_c - 21.5).abs() < f64::EPSILON);
        assert!(second.readings.is_empty());
        assert!(second.rejected.is_empty());
    }

    #[test]
    fn incomplete_samples_are_rejected_not_fatal() {
        let mut watermark = Watermark::default();
        let text = format!("{{\"time\": 3, \"fan_speed\": 1}}\n{}", FULL);
        let replayed = replay_snapshot(&mut watermark, &text);

        assert_eq!(replayed.readings.len(), 1);
        assert_eq!(replayed.rejected.len(), 1);
        assert_eq!(replayed.rejected[0].0, 3);
        assert_eq!(watermark.get(), 10);
    }

    #[test]
    fn after_skips_old_samples() {
        let skipped = replay_snapshot(&mut starting_watermark(Some(10)), FULL);
        assert!(skipped.readings.is_empty());
        assert!(skipped.rejected.is_empty());

        let kept = replay_snapshot(&mut starting_watermark(Some(9)), FULL);
        assert_eq!(kept.readings.len(), 1);
        assert_eq!(kept.readings[0].time, 10);

        let everything = replay_snapshot(&mut starting_watermark(None), FULL);
        assert_eq!(everything.readings.len(), 1);
    }

    #[test]
    fn replays_snapshot_files_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.txt");
        fs::write(&path, FULL).unwrap();

        cmd_replay(&[path.clone(), path], Some(9)).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = cmd_replay(&[dir.path().join("nope.txt")], None).unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
