//! The simulator's serial console, and the two loops that drive it.
//!
//! The reader scrapes console output into the ingestion queue; the writer
//! drains the outbound queue into console input. Both share one
//! [`Console`] and nothing else: every call is a self-contained query
//! against the page, so neither loop holds handles the other could
//! invalidate.

mod reader;
mod writer;

use async_trait::async_trait;

pub use reader::{ReaderSummary, run_reader};
pub use writer::{WriterSummary, run_writer};

/// Why a console operation failed this time around.
///
/// Always transient from the loops' point of view.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("console element not found: {0}")]
    ElementMissing(&'static str),

    #[error("console unavailable: {0}")]
    Unavailable(String),
}

/// Read and write access to the serial console.
#[async_trait]
pub trait Console: Send + Sync {
    /// The full text currently shown, oldest line first.
    ///
    /// `None` when the page has nothing to offer this cycle.
    async fn read_text(&self) -> Result<Option<String>, ConsoleError>;

    /// Type `text` into the console input and submit it.
    async fn submit_input(&self, text: &str) -> Result<(), ConsoleError>;
}
