//! Per-chunk status events and their formatting.
//!
//! The orchestrator publishes a finite, ordered sequence of events per chunk
//! (`Waiting` → `Downloading`* → `Throughput` → optional `Converting`) over
//! an unbounded channel. A consumer subscribes by holding the receiver; with
//! no subscriber the sink drops events silently.

use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    /// A chunk request is about to be issued.
    Waiting,
    /// Download progress: a one-decimal percentage when the total size is
    /// known, `"Unknown"` otherwise, `"100%"` on completion.
    Downloading { progress: String },
    /// Observed transfer rate for a completed chunk.
    Throughput { rate: String },
    /// A completed chunk is being remuxed into its final container.
    Converting,
    /// Emitted immediately before a fatal error aborts the job.
    Error { message: String },
}

/// Handle the pipeline emits status events through.
#[derive(Debug, Clone, Default)]
pub struct StatusSink {
    tx: Option<UnboundedSender<StatusEvent>>,
}

impl StatusSink {
    /// Create a sink together with the receiver a consumer reads from.
    pub fn channel() -> (Self, UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink with no subscriber.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Publish an event. A dropped receiver is not an error; the job keeps
    /// running without an observer.
    pub fn emit(&self, event: StatusEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Format a transfer rate: rounded whole megabytes above 1 MB/s, rounded
/// whole bytes otherwise. The boundary itself stays in bytes.
pub fn format_throughput(bytes_per_sec: f64) -> String {
    if bytes_per_sec > 1_000_000.0 {
        format!("{} MB", (bytes_per_sec / 1_000_000.0).round() as u64)
    } else {
        format!("{} B", bytes_per_sec.round() as u64)
    }
}

/// Format download progress for a `Downloading` event.
pub fn format_progress(bytes_written: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => {
            format!("{:.1}%", bytes_written as f64 * 100.0 / total as f64)
        }
        _ => "Unknown".to_owned(),
    }
}
