//! Per-message and per-run accounting of what was written to disk.

use std::path::PathBuf;

/// What materializing one message did.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MessageReport {
    /// The `Message-Id` without angle brackets.
    pub message_id: String,
    /// Directory holding the message's files.
    pub directory: PathBuf,
    /// `body-N.txt` files created.
    pub bodies_written: usize,
    /// `body-N.txt` files left in place because an identical copy existed.
    pub bodies_unchanged: usize,
    /// Times `body.html` was written (a later HTML part overwrites).
    pub html_written: usize,
    /// Files created under `attachments/`.
    pub attachments_written: usize,
    /// Attachments skipped because the name was already taken.
    pub attachments_skipped: usize,
    /// `delivery-status-N.yaml` files created.
    pub delivery_status_written: usize,
    /// Delivery-status blocks whose identical file already existed.
    pub delivery_status_unchanged: usize,
    /// Bytes written, including `headers.yaml`.
    pub bytes_written: u64,
}

impl MessageReport {
    /// Number of files created or overwritten, `headers.yaml` included.
    pub fn files_written(&self) -> usize {
        1 + self.bodies_written
            + self.html_written
            + self.attachments_written
            + self.delivery_status_written
    }

    /// Number of parts that did not produce a write.
    pub fn files_skipped(&self) -> usize {
        self.bodies_unchanged + self.attachments_skipped + self.delivery_status_unchanged
    }
}

/// Totals for one download run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunSummary {
    /// Folder the search ran against.
    pub folder: String,
    /// Output root directory.
    pub root: PathBuf,
    /// Sequence numbers matched by both searches.
    pub matched: usize,
    /// One report per materialized message, in fetch order.
    pub messages: Vec<MessageReport>,
}

impl RunSummary {
    pub fn files_written(&self) -> usize {
        self.messages.iter().map(MessageReport::files_written).sum()
    }

    pub fn files_skipped(&self) -> usize {
        self.messages.iter().map(MessageReport::files_skipped).sum()
    }

    pub fn bytes_written(&self) -> u64 {
        self.messages.iter().map(|m| m.bytes_written).sum()
    }
}
