//! Journal summary: one line per run.

use std::path::Path;

use uuid::Uuid;

use crate::model::JournalEntry;
use crate::sink::Journal;

#[derive(Debug, PartialEq)]
struct RunSummary {
    run: Uuid,
    readings: usize,
    first_time: i64,
    last_time: i64,
}

/// Group entries by run, keeping first-seen order.
fn summarize(entries: &[JournalEntry]) -> Vec<RunSummary> {
    let mut runs: Vec<RunSummary> = Vec::new();
    for entry in entries {
        let time = entry.reading.time;
        match runs.iter_mut().find(|r| r.run == entry.run) {
            Some(run) => {
                run.readings += 1;
                run.last_time = time;
            }
            None => runs.push(RunSummary {
                run: entry.run,
                readings: 1,
                first_time: time,
                last_time: time,
            }),
        }
    }
    runs
}

pub fn cmd_journal(path: &Path) -> Result<(), String> {
    let entries = Journal::existing(path)
        .load()
        .map_err(|e| format!("failed to load journal {}: {e}", path.display()))?;

    if entries.is_empty() {
        println!("No readings");
        return Ok(());
    }

    for run in summarize(&entries) {
        let short_id = &run.run.to_string()[..8];
        println!(
            "{short_id}  {} reading(s)  time {}..{}",
            run.readings, run.first_time, run.last_time
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    use crate::model::SensorReading;

    fn entry(run: Uuid, time: i64) -> JournalEntry {
        JournalEntry {
            run,
            received_at: Timestamp::now(),
            reading: SensorReading {
                time,
                fan_speed: 0,
                temperature_c: 20.0,
                gas_level: 0,
                light_level: 0,
            },
        }
    }

    #[test]
    fn groups_by_run_in_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let entries = [entry(a, 1), entry(a, 2), entry(b, 1), entry(a, 5)];

        let runs = summarize(&entries);
        assert_eq!(
            runs,
            vec![
                RunSummary {
                    run: a,
                    readings: 3,
                    first_time: 1,
                    last_time: 5,
                },
                RunSummary {
                    run: b,
                    readings: 1,
                    first_time: 1,
                    last_time: 1,
                },
            ]
        );
    }

    #[test]
    fn summarizing_a_mistyped_path_creates_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing_dir = dir.path().join("no-such-dir");

        cmd_journal(&missing_dir.join("readings.jsonl")).unwrap();
        assert!(!missing_dir.exists());
    }

    #[test]
    fn empty_journal_has_no_runs() {
        assert!(summarize(&[]).is_empty());
    }
}
