//! Console reader: scrape, parse, filter, emit.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::delta::Watermark;
use crate::model::RawSample;
use crate::parse::extract_samples;
use crate::queue::{Closed, Producer};
use crate::shutdown::Shutdown;

use super::Console;

/// What a reader run did, reported when it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderSummary {
    pub polls: u64,
    pub emitted: u64,
    pub watermark: Watermark,
}

/// Poll the console every `interval` until shutdown.
///
/// Each new sample is put on `samples` individually and in order; a full
/// queue holds the reader back. Scrape failures are logged and retried on
/// the next tick. The producer is dropped on return, which closes the
/// queue for the consumer.
pub async fn run_reader<C>(
    console: &C,
    interval: Duration,
    samples: Producer<RawSample>,
    mut shutdown: Shutdown,
) -> ReaderSummary
where
    C: Console + ?Sized,
{
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut summary = ReaderSummary {
        polls: 0,
        emitted: 0,
        watermark: Watermark::default(),
    };

    'poll: loop {
        tokio::select! {
            biased;
            () = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }

        let scraped = tokio::select! {
            biased;
            () = shutdown.wait() => break,
            scraped = console.read_text() => scraped,
        };
        summary.polls += 1;

        let text = match scraped {
            Ok(Some(text)) if !text.is_empty() => text,
            Ok(_) => {
                debug!("serial console is empty");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "failed to read serial console");
                continue;
            }
        };

        let fresh = summary.watermark.advance(extract_samples(&text));
        if !fresh.is_empty() {
            debug!(count = fresh.len(), watermark = summary.watermark.get(), "new samples");
        }

        for sample in fresh {
            let time = sample.time();
            tokio::select! {
                biased;
                () = shutdown.wait() => break 'poll,
                sent = samples.put(sample) => {
                    if let Err(Closed(unsent)) = sent {
                        warn!(time = unsent.time(), "ingestion queue closed, stopping reader");
                        break 'poll;
                    }
                }
            }
            debug!(time, "sample queued");
            summary.emitted += 1;
        }
    }

    info!(
        polls = summary.polls,
        emitted = summary.emitted,
        watermark = summary.watermark.get(),
        "console reader stopped"
    );
    summary
}
