//! Supervisor: wires the console loops, the ingestion queue and the
//! dispatcher together, and owns the shutdown order.
//!
//! ```text
//! console ──reader──▶ ingestion queue ──dispatcher──▶ observers
//! outbound queue ──writer──▶ console input
//! ```
//!
//! On shutdown the reader and writer stop, the reader's end of the
//! ingestion queue closes, the dispatcher drains what is left and exits,
//! and finally both queues are joined.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinError;
use tracing::info;

use crate::console::{Console, ReaderSummary, WriterSummary, run_reader, run_writer};
use crate::dispatch::{DispatchSummary, Dispatcher};
use crate::queue::{self, Consumer, Join};
use crate::shutdown::Shutdown;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{task} task failed: {source}")]
    Task {
        task: &'static str,
        #[source]
        source: JoinError,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct BridgeSettings {
    pub sample_interval: Duration,
    pub queue_capacity: usize,
}

/// Where outbound commands come from.
pub struct Outbound {
    pub commands: Consumer<String>,
    pub join: Join,
}

#[derive(Debug, Clone, Copy)]
pub struct BridgeSummary {
    pub reader: ReaderSummary,
    pub writer: WriterSummary,
    pub dispatch: DispatchSummary,
}

/// Run the bridge until `shutdown` fires and every queue has drained.
pub async fn run_bridge<C>(
    console: Arc<C>,
    dispatcher: Dispatcher,
    outbound: Outbound,
    settings: BridgeSettings,
    shutdown: Shutdown,
) -> Result<BridgeSummary, BridgeError>
where
    C: Console + 'static,
{
    let (samples, ingested, ingestion) = queue::channel(settings.queue_capacity);

    let reader = tokio::spawn({
        let console = Arc::clone(&console);
        let shutdown = shutdown.clone();
        async move { run_reader(&*console, settings.sample_interval, samples, shutdown).await }
    });
    let writer = tokio::spawn({
        let console = Arc::clone(&console);
        let commands = outbound.commands;
        async move { run_writer(&*console, commands, shutdown).await }
    });
    let dispatch = tokio::spawn(async move { dispatcher.run(ingested).await });

    // The reader dropping its producer is what closes the ingestion queue,
    // so the dispatcher finishes on its own even when the reader panics.
    // The writer only stops on shutdown, so a failed reader takes it down.
    let reader = match reader.await {
        Ok(summary) => summary,
        Err(source) => {
            writer.abort();
            let _ = writer.await;
            let _ = dispatch.await;
            return Err(BridgeError::Task {
                task: "reader",
                source,
            });
        }
    };
    let writer = match writer.await {
        Ok(summary) => summary,
        Err(source) => {
            let _ = dispatch.await;
            return Err(BridgeError::Task {
                task: "writer",
                source,
            });
        }
    };
    let dispatch = dispatch.await.map_err(|source| BridgeError::Task {
        task: "dispatcher",
        source,
    })?;

    ingestion.join().await;
    outbound.join.join().await;
    info!(
        consumer_finished = ingestion.is_finished(),
        "all queued work processed"
    );

    Ok(BridgeSummary {
        reader,
        writer,
        dispatch,
    })
}
