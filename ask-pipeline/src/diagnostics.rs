//! Diagnostic trail of each pipeline run.
//!
//! Lines are best-effort: a sink never fails the request it describes. Use
//! [`FileDiagnosticSink`] in the server, [`TracingSink`] when no file is
//! wanted and [`MemorySink`] in tests.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::{
    fs::File,
    io::AsyncWriteExt,
    sync::{mpsc, oneshot},
};
use tracing::{info, warn};

/// Receives one human-readable line per pipeline event.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn record(&self, line: &str);

    /// Waits until every line recorded so far has been handled.
    async fn flush(&self) {}
}

/// Lines that may wait for the writer before new ones are dropped.
const QUEUE_DEPTH: usize = 1024;

enum Entry {
    Line(String),
    Flush(oneshot::Sender<()>),
}

/// Appends `<ISO-8601 timestamp> - <line>` to a file, creating it if needed.
///
/// `record` only enqueues; a background task owns the file and writes lines
/// in arrival order. A full queue drops the line with a warning.
pub struct FileDiagnosticSink {
    path: PathBuf,
    tx: mpsc::Sender<Entry>,
}

impl FileDiagnosticSink {
    /// Spawns the writer task, so it must run inside a Tokio runtime.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(write_loop(path.clone(), rx));
        Self { path, tx }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_loop(path: PathBuf, mut rx: mpsc::Receiver<Entry>) {
    let mut file: Option<File> = None;
    while let Some(entry) = rx.recv().await {
        match entry {
            Entry::Line(line) => {
                if let Err(e) = append(&mut file, &path, &line).await {
                    warn!(path = %path.display(), error = %e, "diagnostic log write failed");
                }
            }
            Entry::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

/// Reuses the open handle; a failed write drops it so the next line reopens.
async fn append(file: &mut Option<File>, path: &Path, line: &str) -> io::Result<()> {
    let mut f = match file.take() {
        Some(f) => f,
        None => {
            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?
        }
    };
    f.write_all(line.as_bytes()).await?;
    f.flush().await?;
    *file = Some(f);
    Ok(())
}

#[async_trait]
impl DiagnosticSink for FileDiagnosticSink {
    async fn record(&self, line: &str) {
        let entry = format!(
            "{} - {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            line
        );
        if let Err(e) = self.tx.try_send(Entry::Line(entry)) {
            warn!(path = %self.path.display(), error = %e, "diagnostic line dropped");
        }
    }

    async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Entry::Flush(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}

/// Forwards lines to `tracing` at INFO.
#[derive(Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl DiagnosticSink for TracingSink {
    async fn record(&self, line: &str) {
        info!(target: "ask_pipeline::diagnostics", "{line}");
    }
}

/// Keeps lines in memory.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

#[async_trait]
impl DiagnosticSink for MemorySink {
    async fn record(&self, line: &str) {
        match self.lines.lock() {
            Ok(mut g) => g.push(line.to_string()),
            Err(poisoned) => poisoned.into_inner().push(line.to_string()),
        }
    }
}
