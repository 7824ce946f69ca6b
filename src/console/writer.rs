//! Console writer: drain outbound commands into the console input.

use tracing::{debug, info, warn};

use crate::queue::Consumer;
use crate::shutdown::Shutdown;

use super::Console;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Still queued at shutdown and never sent.
    pub abandoned: u64,
}

/// Submit each outbound message until shutdown or until the queue closes.
///
/// Empty messages are skipped. A failed submit is logged and the message
/// is dropped; there is no retry. Messages still queued when shutdown
/// arrives are marked done without being sent so the queue can be joined.
pub async fn run_writer<C>(
    console: &C,
    mut messages: Consumer<String>,
    mut shutdown: Shutdown,
) -> WriterSummary
where
    C: Console + ?Sized,
{
    let mut summary = WriterSummary::default();

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.wait() => break,
            next = messages.get() => next,
        };
        let Some(message) = next else {
            debug!("outbound queue closed");
            break;
        };

        if message.is_empty() {
            debug!("skipping empty outbound message");
            summary.skipped += 1;
        } else {
            match console.submit_input(&message).await {
                Ok(()) => {
                    debug!(message = %message, "sent to serial console");
                    summary.sent += 1;
                }
                Err(e) => {
                    warn!(message = %message, error = %e, "failed to send to serial console");
                    summary.failed += 1;
                }
            }
        }
        messages.task_done();
    }

    messages.close();
    while messages.get().await.is_some() {
        summary.abandoned += 1;
        messages.task_done();
    }
    if summary.abandoned > 0 {
        warn!(count = summary.abandoned, "outbound messages dropped at shutdown");
    }

    info!(
        sent = summary.sent,
        failed = summary.failed,
        skipped = summary.skipped,
        "console writer stopped"
    );
    summary
}
