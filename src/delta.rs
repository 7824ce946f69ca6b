//! Delta filtering over an overwriting console buffer.
//!
//! The serial console keeps only its most recent lines, and each poll sees
//! the whole window again. The watermark remembers the last time that went
//! downstream so each sample is extracted exactly once.

use crate::model::RawSample;

/// Value the watermark starts at; below any time the board prints.
pub const INITIAL_WATERMARK: i64 = -1;

/// The `time` of the most recently emitted sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark(i64);

impl Default for Watermark {
    fn default() -> Self {
        Self(INITIAL_WATERMARK)
    }
}

impl Watermark {
    pub fn new(time: i64) -> Self {
        Self(time)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Keep the samples strictly newer than the watermark and advance it.
    ///
    /// The watermark moves to the time of the last extracted sample even
    /// when nothing survives the filter, so a window that rolled forward
    /// without new data still counts as seen. An empty batch leaves it
    /// untouched, and it never moves backwards.
    pub fn advance(&mut self, extracted: Vec<RawSample>) -> Vec<RawSample> {
        let Some(last) = extracted.last().map(RawSample::time) else {
            return Vec::new();
        };
        let floor = self.0;
        self.0 = floor.max(last);
        extracted.into_iter().filter(|s| s.time() > floor).collect()
    }
}
