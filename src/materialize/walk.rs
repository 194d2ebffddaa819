//! Recursive dispatch over the MIME tree of one message.

use std::path::{Path, PathBuf};

use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::{debug, warn};

use crate::error::{ExtractError, Result};
use crate::model::report::MessageReport;
use crate::parser::header::HeaderParser;
use crate::parser::mime::{self, PartKind};

use super::names;
use super::slots::{self, Placement, SlotAllocator};

const HTML_FILE: &str = "body.html";
const ATTACHMENTS_DIR: &str = "attachments";
const DELIVERY_STATUS_DIR: &str = "delivery-status";

/// Walks one message's parts into its directory.
pub(super) struct PartWalker<'r> {
    dir: PathBuf,
    headers: HeaderParser,
    bodies: SlotAllocator,
    statuses: SlotAllocator,
    /// Attachment parts seen so far, used to name unnamed ones.
    attachment_seq: usize,
    report: &'r mut MessageReport,
}

impl<'r> PartWalker<'r> {
    pub(super) fn new(
        dir: &Path,
        headers: HeaderParser,
        report: &'r mut MessageReport,
    ) -> Result<Self> {
        Ok(Self {
            dir: dir.to_path_buf(),
            headers,
            bodies: SlotAllocator::seed(dir, "body-", ".txt")?,
            statuses: SlotAllocator::seed(
                &dir.join(DELIVERY_STATUS_DIR),
                "delivery-status-",
                ".yaml",
            )?,
            attachment_seq: 0,
            report,
        })
    }

    /// Top-level dispatch: the children of a multipart root, or the root itself.
    pub(super) fn walk_message(&mut self, message: &Message<'_>) -> Result<()> {
        let root = message.root_part();
        if mime::is_multipart(root) {
            for child in self.children(message, root)? {
                self.walk_part(message, child, 1)?;
            }
            Ok(())
        } else {
            self.walk_part(message, root, 0)
        }
    }

    fn walk_part<'x>(
        &mut self,
        message: &Message<'x>,
        part: &MessagePart<'x>,
        depth: usize,
    ) -> Result<()> {
        let (main, sub) = mime::content_type(part);
        let kind = PartKind::classify(&main, &sub);
        debug!(
            depth,
            content_type = %format!("{main}/{sub}"),
            filename = part.attachment_name().unwrap_or(""),
            "Part"
        );

        match kind {
            PartKind::PlainText => self.write_body(part.contents()),
            PartKind::Html => self.write_html(part.contents()),
            PartKind::Attachment => self.save_attachment(part),
            PartKind::Container => {
                for child in self.children(message, part)? {
                    self.walk_part(message, child, depth + 1)?;
                }
                Ok(())
            }
            PartKind::DeliveryStatus => self.write_delivery_status(part.contents()),
            PartKind::EmbeddedMessage => match &part.body {
                PartType::Message(nested) => self.walk_part(nested, nested.root_part(), depth + 1),
                _ => {
                    let nested = MessageParser::default()
                        .parse(part.contents())
                        .ok_or_else(|| {
                            ExtractError::UnparseableMessage(format!(
                                "embedded message in <{}>",
                                self.report.message_id
                            ))
                        })?;
                    self.walk_part(&nested, nested.root_part(), depth + 1)
                }
            },
            PartKind::Unrecognized(content_type) => {
                Err(ExtractError::UnrecognizedContentType(content_type))
            }
        }
    }

    fn write_body(&mut self, contents: &[u8]) -> Result<()> {
        match self.bodies.place(contents)? {
            Placement::Written(path) => {
                debug!(path = %path.display(), "Wrote text body");
                self.report.bodies_written += 1;
                self.report.bytes_written += contents.len() as u64;
            }
            Placement::Unchanged(path) => {
                debug!(path = %path.display(), "Text body already on disk");
                self.report.bodies_unchanged += 1;
            }
        }
        Ok(())
    }

    /// A later HTML part replaces an earlier one.
    fn write_html(&mut self, contents: &[u8]) -> Result<()> {
        let path = self.dir.join(HTML_FILE);
        std::fs::write(&path, contents).map_err(|e| ExtractError::io(&path, e))?;
        self.report.html_written += 1;
        self.report.bytes_written += contents.len() as u64;
        Ok(())
    }

    /// First write wins: an existing file of the same name is left untouched,
    /// even if its contents differ.
    fn save_attachment(&mut self, part: &MessagePart<'_>) -> Result<()> {
        let seq = self.attachment_seq;
        self.attachment_seq += 1;

        let filename = part
            .attachment_name()
            .and_then(names::sanitize_component)
            .unwrap_or_else(|| names::unnamed_attachment(seq));

        let dir = self.dir.join(ATTACHMENTS_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| ExtractError::io(&dir, e))?;

        let path = dir.join(&filename);
        if path.exists() {
            warn!(
                message_id = %self.report.message_id,
                filename = %filename,
                "Attachment name already taken, keeping existing file"
            );
            self.report.attachments_skipped += 1;
            return Ok(());
        }

        let contents = part.contents();
        slots::write_new(&path, contents)?;
        self.report.attachments_written += 1;
        self.report.bytes_written += contents.len() as u64;
        Ok(())
    }

    /// Each header block of the report becomes its own numbered YAML file.
    fn write_delivery_status(&mut self, contents: &[u8]) -> Result<()> {
        let dir = self.dir.join(DELIVERY_STATUS_DIR);
        std::fs::create_dir_all(&dir).map_err(|e| ExtractError::io(&dir, e))?;

        for block in self.headers.parse_blocks(contents) {
            let yaml = serde_yaml::to_string(&block)?;
            match self.statuses.place(yaml.as_bytes())? {
                Placement::Written(_) => {
                    self.report.delivery_status_written += 1;
                    self.report.bytes_written += yaml.len() as u64;
                }
                Placement::Unchanged(_) => self.report.delivery_status_unchanged += 1,
            }
        }
        Ok(())
    }

    /// Immediate children of a multipart part.
    ///
    /// A part declared `multipart/*` whose body the parser could not split
    /// (missing or mismatched boundary) is an error, not an empty container.
    fn children<'m, 'x>(
        &self,
        message: &'m Message<'x>,
        part: &MessagePart<'x>,
    ) -> Result<Vec<&'m MessagePart<'x>>> {
        match &part.body {
            PartType::Multipart(ids) => Ok(ids
                .iter()
                .filter_map(|id| message.parts.get(*id))
                .collect()),
            _ => {
                let (main, sub) = mime::content_type(part);
                Err(ExtractError::UnparseableMessage(format!(
                    "{main}/{sub} part without usable boundary in <{}>",
                    self.report.message_id
                )))
            }
        }
    }
}
