//! Per-transfer mutable state and progress reporting.

use serde::Serialize;
use tokio::sync::watch;
use utoipa::ToSchema;

/// Snapshot published after each committed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct TransferProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub source_progress: f64,
}

/// Counters of one transfer. Owned by a single `run` call and dropped with it.
/// Destination completion is tracked by the `SinkWriter` that owns the session.
#[derive(Debug)]
pub struct TransferSession {
    total_bytes: u64,
    bytes_transferred: u64,
    chunks_committed: u64,
    done: bool,
}

impl TransferSession {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            bytes_transferred: 0,
            chunks_committed: 0,
            done: false,
        }
    }

    /// Account for a chunk the destination accepted.
    pub fn record_commit(&mut self, len: u64) {
        self.bytes_transferred += len;
        self.chunks_committed += 1;
    }

    /// The source has delivered its final chunk.
    pub fn mark_source_done(&mut self) {
        self.done = true;
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    pub fn chunks_committed(&self) -> u64 {
        self.chunks_committed
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn progress(&self, source_progress: f64) -> TransferProgress {
        TransferProgress {
            bytes_transferred: self.bytes_transferred,
            total_bytes: self.total_bytes,
            source_progress,
        }
    }

    /// Publish the latest progress; a missing receiver is not an error.
    pub fn publish(&self, sender: Option<&watch::Sender<TransferProgress>>, source_progress: f64) {
        if let Some(sender) = sender {
            sender.send_replace(self.progress(source_progress));
        }
    }
}
