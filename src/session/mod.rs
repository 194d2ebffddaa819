//! Mailbox sessions: folder listing, selection, search and raw fetch.
//!
//! [`Mailbox`] is the seam between the download pipeline and the network.
//! [`ImapSession`] implements it over TLS.

mod remote;

use std::collections::BTreeSet;

pub use self::remote::ImapSession;

use crate::error::{ExtractError, Result};
use crate::model::folder::Folder;

/// Header or text section matched by a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Subject,
    Body,
}

impl SearchField {
    /// The IMAP search key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Subject => "SUBJECT",
            Self::Body => "BODY",
        }
    }
}

/// An authenticated connection to one mail account.
///
/// Message ids are sequence numbers and only meaningful within the session
/// and the currently selected folder.
pub trait Mailbox {
    /// Every folder the server lists. An empty listing is not an error.
    fn list_folders(&mut self) -> Result<Vec<Folder>>;

    /// Select `folder` for the searches and fetches that follow.
    fn select_folder(&mut self, folder: &str) -> Result<()>;

    /// Ids of messages whose `field` matches `pattern`.
    fn search(&mut self, field: SearchField, pattern: &str) -> Result<BTreeSet<u32>>;

    /// Full RFC 5322 bytes of message `id`.
    fn fetch_raw(&mut self, id: u32) -> Result<Vec<u8>>;

    /// Release the folder and log out. Calling it again does nothing.
    fn close(&mut self) -> Result<()>;
}

/// Whether `pattern` matches every message.
pub fn is_match_all(pattern: &str) -> bool {
    let trimmed = pattern.trim();
    trimmed.is_empty() || trimmed == "*"
}

/// Build the SEARCH criteria for a single field.
///
/// Match-all patterns become `ALL`. ASCII patterns are sent as quoted
/// strings. Quoted strings are 7-bit, so any other pattern goes out as a
/// non-synchronizing literal after `CHARSET UTF-8`, which needs the server's
/// `LITERAL+` capability; without it the search fails before anything is sent.
pub fn search_query(field: SearchField, pattern: &str, literal_plus: bool) -> Result<String> {
    if is_match_all(pattern) {
        return Ok("ALL".to_string());
    }

    if pattern.is_ascii() {
        return Ok(format!("{} {}", field.key(), quote(pattern)));
    }

    if !literal_plus {
        return Err(ExtractError::Search {
            query: format!("{} {pattern}", field.key()),
            reason: "server does not support LITERAL+, non-ASCII patterns cannot be sent"
                .to_string(),
        });
    }
    Ok(format!(
        "CHARSET UTF-8 {} {{{}+}}\r\n{pattern}",
        field.key(),
        pattern.len()
    ))
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}
