//! Writing fetched messages to disk, one directory per message.
//!
//! ```text
//! <root>/<message-id>/
//!   headers.yaml
//!   body-0.txt, body-1.txt, ...
//!   body.html
//!   attachments/<filename>
//!   delivery-status/delivery-status-<n>.yaml
//! ```

pub mod names;
pub mod slots;
mod walk;

use std::path::{Path, PathBuf};

use mail_parser::MessageParser;
use tracing::debug;

use crate::error::{ExtractError, Result};
use crate::model::headers::{HeaderMap, RepeatedHeaders};
use crate::model::report::MessageReport;
use crate::parser::header::{self, HeaderParser};

use walk::PartWalker;

/// File holding the serialized top-level headers.
pub const HEADERS_FILE: &str = "headers.yaml";

/// Settings a [`Materializer`] is built with.
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    /// Directory that receives one subdirectory per message.
    pub root: PathBuf,
    /// How repeated header names are serialized.
    pub repeated_headers: RepeatedHeaders,
}

/// Decomposes raw messages into files under a fixed root directory.
#[derive(Debug, Clone)]
pub struct Materializer {
    root: PathBuf,
    headers: HeaderParser,
}

impl Materializer {
    pub fn new(options: MaterializeOptions) -> Self {
        Self {
            root: options.root,
            headers: HeaderParser::new(options.repeated_headers),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every part of one raw RFC 5322 message to its directory.
    pub fn materialize(&self, raw_message: &[u8]) -> Result<MessageReport> {
        let headers = self.headers.parse_message(raw_message);
        let message_id = header::message_id(&headers).ok_or(ExtractError::MissingMessageId)?;
        debug!(message_id = %message_id, "Materializing message");

        let directory = self.ensure_message_dir(&message_id)?;
        let mut report = MessageReport {
            message_id,
            directory: directory.clone(),
            ..MessageReport::default()
        };
        report.bytes_written += write_headers(&directory, &headers)?;

        let message = MessageParser::default().parse(raw_message).ok_or_else(|| {
            ExtractError::UnparseableMessage(format!("message <{}>", report.message_id))
        })?;

        PartWalker::new(&directory, self.headers, &mut report)?.walk_message(&message)?;

        Ok(report)
    }

    /// Create `<root>/<message-id>` if it does not exist yet and return its path.
    pub fn ensure_message_dir(&self, message_id: &str) -> Result<PathBuf> {
        let name = names::sanitize_component(message_id).ok_or(ExtractError::MissingMessageId)?;
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir).map_err(|e| ExtractError::io(&dir, e))?;
        Ok(dir)
    }
}

/// Serialize `headers` to `<dir>/headers.yaml`, replacing any earlier copy.
/// Returns the number of bytes written.
pub fn write_headers(dir: &Path, headers: &HeaderMap) -> Result<u64> {
    let yaml = serde_yaml::to_string(headers)?;
    let path = dir.join(HEADERS_FILE);
    std::fs::write(&path, &yaml).map_err(|e| ExtractError::io(&path, e))?;
    Ok(yaml.len() as u64)
}
