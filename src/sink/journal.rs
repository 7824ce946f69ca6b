//! Journal sink: append delivered readings to a JSONL file.
//!
//! ```text
//! {"run":"<uuid>","received_at":"<timestamp>","reading":{...}}
//! ```

use std::{fs, io, path::PathBuf};

// Traits must be in scope for `.lines()` on BufReader and `.write_all()` on File.
use io::{BufRead, Write};

use async_trait::async_trait;
use jiff::Timestamp;
use uuid::Uuid;

use crate::dispatch::{Observer, ObserverError};
use crate::model::{JournalEntry, SensorReading};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("journal writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = core::result::Result<T, JournalError>;

/// An append-only JSONL file of journal entries.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Opens a journal at `path`, creating parent directories as needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    /// Refers to an existing journal at `path` without touching the filesystem.
    pub fn existing(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Loads every entry; a journal that was never written is empty.
    pub fn load(&self) -> Result<Vec<JournalEntry>> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let reader = io::BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.is_empty() {
                entries.push(serde_json::from_str(&line)?);
            }
        }
        Ok(entries)
    }
}

/// Records every reading in a [`Journal`], tagged with this run's id.
pub struct JournalObserver {
    journal: Journal,
    run: Uuid,
}

impl JournalObserver {
    pub fn new(journal: Journal, run: Uuid) -> Self {
        Self { journal, run }
    }
}

#[async_trait]
impl Observer for JournalObserver {
    fn name(&self) -> &str {
        "journal"
    }

    async fn on_new_read(&self, reading: &SensorReading) -> core::result::Result<(), ObserverError> {
        let entry = JournalEntry {
            run: self.run,
            received_at: Timestamp::now(),
            reading: reading.clone(),
        };
        // File writes block; keep them off the runtime's worker threads.
        let journal = self.journal.clone();
        tokio::task::spawn_blocking(move || journal.append(&entry))
            .await
            .map_err(JournalError::from)??;
        Ok(())
    }
}
