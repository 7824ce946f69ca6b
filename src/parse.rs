//! Sample extraction: console text in, well-formed samples out.
//!
//! The console is snapshotted while the board is still printing, so the
//! last line is routinely a partial write. Lines are decoded independently
//! and anything that is not a complete record with a `time` key is dropped.

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::model::{RawSample, SampleError};

/// Decode every line of `text` that holds a valid sample.
///
/// Never fails: malformed lines are skipped. Samples come back in line
/// order, which for the serial console is oldest first.
pub fn extract_samples(text: &str) -> Vec<RawSample> {
    text.lines().filter_map(decode_line).collect()
}

fn decode_line(line: &str) -> Option<RawSample> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            trace!(line, error = %e, "skipping undecodable line");
            return None;
        }
    };

    match RawSample::try_from(value) {
        Ok(sample) => Some(sample),
        Err(SampleError::NotARecord) => {
            debug!(line, "skipping non-record line");
            None
        }
        Err(e) => {
            warn!(line, error = %e, "skipping record");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(samples: &[RawSample]) -> Vec<i64> {
        samples.iter().map(RawSample::time).collect()
    }

    #[test]
    fn keeps_records_in_line_order() {
        let text = "{\"time\": 1, \"fan_speed\": 0}\n{\"time\": 2}\n{\"time\": 3}";
        assert_eq!(times(&extract_samples(text)), vec![1, 2, 3]);
    }

    #[test]
    fn drops_truncated_tail() {
        let text = "{\"time\": 10, \"fan_speed\": 2}\n{\"time\": 11,";
        assert_eq!(times(&extract_samples(text)), vec![10]);
    }

    #[test]
    fn drops_non_records_and_records_without_time() {
        let text = "42\n[1, 2]\n\"hello\"\n{\"fan_speed\": 3}\n{\"time\": 5}\nnull";
        assert_eq!(times(&extract_samples(text)), vec![5]);
    }

    #[test]
    fn tolerates_blank_lines_and_crlf() {
        let text = "\r\n{\"time\": 1}\r\n\r\n  {\"time\": 2}  \r\n";
        assert_eq!(times(&extract_samples(text)), vec![1, 2]);
    }

    #[test]
    fn garbage_never_panics() {
        let inputs = [
            "",
            "\n\n\n",
            "}{",
            "{\"time\":",
            "<span>serial</span>",
            "\u{0}\u{fffd}",
            "{\"time\": 1}{\"time\": 2}",
        ];
        for text in inputs {
            for sample in extract_samples(text) {
                assert!(sample.get("time").is_some());
            }
        }
    }
}
