//! MIME part classification.

use mail_parser::{MessagePart, MimeHeaders};

/// What the materializer does with a part, decided by its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKind {
    /// `text/plain`: numbered `body-N.txt`.
    PlainText,
    /// `text/html`: `body.html`.
    Html,
    /// Main type `application` or `image`: saved under `attachments/`.
    Attachment,
    /// `multipart/alternative`, `multipart/related`, `multipart/mixed`.
    Container,
    /// `message/delivery-status`: header blocks under `delivery-status/`.
    DeliveryStatus,
    /// `message/rfc822`: walked into the enclosing message's directory.
    EmbeddedMessage,
    /// Anything else, carrying the full content type.
    Unrecognized(String),
}

impl PartKind {
    /// Classify a lowercase `main/sub` pair.
    pub fn classify(main: &str, sub: &str) -> Self {
        match (main, sub) {
            ("text", "plain") => Self::PlainText,
            ("text", "html") => Self::Html,
            ("application" | "image", _) => Self::Attachment,
            ("multipart", "alternative" | "related" | "mixed") => Self::Container,
            ("message", "delivery-status") => Self::DeliveryStatus,
            ("message", "rfc822") => Self::EmbeddedMessage,
            _ => Self::Unrecognized(format!("{main}/{sub}")),
        }
    }

    /// Classify a parsed part by its declared content type.
    pub fn of(part: &MessagePart<'_>) -> Self {
        let (main, sub) = content_type(part);
        Self::classify(&main, &sub)
    }
}

/// Lowercase `(main, sub)` content type of a part.
///
/// A part without a `Content-Type` header is `text/plain`.
pub fn content_type(part: &MessagePart<'_>) -> (String, String) {
    match part.content_type() {
        Some(ct) => (
            ct.ctype().trim().to_ascii_lowercase(),
            ct.subtype()
                .map(|s| s.trim().to_ascii_lowercase())
                .unwrap_or_default(),
        ),
        None => ("text".to_string(), "plain".to_string()),
    }
}

/// Whether the part is a `multipart/*` container of any subtype.
pub fn is_multipart(part: &MessagePart<'_>) -> bool {
    content_type(part).0 == "multipart"
}
