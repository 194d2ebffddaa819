//! RFC 5322 header blocks: locating, unfolding and collecting them into a [`HeaderMap`].

use crate::model::headers::{HeaderMap, RepeatedHeaders};

/// Turns raw header blocks into [`HeaderMap`]s under one repeated-name policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderParser {
    policy: RepeatedHeaders,
}

impl HeaderParser {
    pub fn new(policy: RepeatedHeaders) -> Self {
        Self { policy }
    }

    /// Parse the header section of a complete message (everything before the
    /// first blank line).
    pub fn parse_message(&self, raw_message: &[u8]) -> HeaderMap {
        let end = find_header_end(raw_message).unwrap_or(raw_message.len());
        self.parse_block(&raw_message[..end])
    }

    /// Parse a single header block.
    pub fn parse_block(&self, raw: &[u8]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in unfold_headers(&decode_header_bytes(raw)) {
            map.insert(name, value, self.policy);
        }
        map
    }

    /// Parse a payload made of several blank-line separated header blocks,
    /// as carried by `message/delivery-status` parts.
    pub fn parse_blocks(&self, raw: &[u8]) -> Vec<HeaderMap> {
        split_blocks(&decode_header_bytes(raw))
            .into_iter()
            .map(|block| {
                let mut map = HeaderMap::new();
                for (name, value) in unfold_headers(&block) {
                    map.insert(name, value, self.policy);
                }
                map
            })
            .filter(|map| !map.is_empty())
            .collect()
    }
}

/// The `Message-Id` of a header map: the first `<...>` pair with the angle
/// brackets removed, so trailing comments are ignored. A value without
/// brackets yields its first word. `None` when the header is absent or empty.
pub fn message_id(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("message-id")?.trim();
    let bracketed = raw.find('<').and_then(|start| {
        let rest = &raw[start + 1..];
        rest.find('>').map(|end| &rest[..end])
    });
    let id = match bracketed {
        Some(inner) => inner.trim(),
        None => raw.split_whitespace().next().unwrap_or(""),
    };
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Find the byte offset where headers end (position of the first blank line).
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns `(name, value)` pairs with the name spelled as it appeared.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                if !last.1.is_empty() {
                    last.1.push(' ');
                }
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_string();
            if name.is_empty() {
                continue;
            }
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Split text into runs of non-blank lines.
fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::headers::HeaderValue;

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "Subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_find_header_end() {
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some(25));
    }

    #[test]
    fn test_find_header_end_crlf() {
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some(26));
    }

    #[test]
    fn test_parse_message_stops_at_body() {
        let raw = b"Subject: Hi\r\nX-Tag: one\r\n\r\nNot-A-Header: body text\r\n";
        let headers = HeaderParser::default().parse_message(raw);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("x-tag"), Some("one"));
        assert_eq!(headers.get("Not-A-Header"), None);
    }

    #[test]
    fn test_parse_message_repeated_received() {
        let raw = b"Received: from a\nReceived: from b\n\tby c\nSubject: Hi\n\nBody";
        let last = HeaderParser::new(RepeatedHeaders::Last).parse_message(raw);
        assert_eq!(last.get("Received"), Some("from b by c"));

        let all = HeaderParser::new(RepeatedHeaders::All).parse_message(raw);
        let (_, value) = all.iter().next().unwrap();
        assert_eq!(
            value,
            &HeaderValue::Multiple(vec!["from a".into(), "from b by c".into()])
        );
    }

    #[test]
    fn test_parse_latin1_header() {
        let raw = b"Subject: caf\xe9\n\n";
        let headers = HeaderParser::default().parse_message(raw);
        assert_eq!(headers.get("subject"), Some("café"));
    }

    #[test]
    fn test_parse_blocks() {
        let raw = b"Reporting-MTA: dns; a.example.com\r\nArrival-Date: today\r\n\r\n\
Final-Recipient: rfc822; x@example.com\r\nAction: failed\r\nStatus: 5.1.1\r\n\r\n\r\n";
        let blocks = HeaderParser::default().parse_blocks(raw);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].get("Reporting-MTA"), Some("dns; a.example.com"));
        assert_eq!(blocks[1].get("Status"), Some("5.1.1"));
    }

    #[test]
    fn test_message_id() {
        let headers = HeaderParser::default().parse_message(b"Message-ID:  <abc@x.org> \n\n");
        assert_eq!(message_id(&headers).as_deref(), Some("abc@x.org"));

        let bare = HeaderParser::default().parse_message(b"Message-Id: abc@x.org\n\n");
        assert_eq!(message_id(&bare).as_deref(), Some("abc@x.org"));

        let empty = HeaderParser::default().parse_message(b"Message-Id: <>\n\n");
        assert_eq!(message_id(&empty), None);

        let missing = HeaderParser::default().parse_message(b"Subject: x\n\n");
        assert_eq!(message_id(&missing), None);
    }

    #[test]
    fn test_message_id_ignores_comments() {
        let commented =
            HeaderParser::default().parse_message(b"Message-ID: <c@x.org> (sent by relay)\n\n");
        assert_eq!(message_id(&commented).as_deref(), Some("c@x.org"));

        let leading = HeaderParser::default().parse_message(b"Message-ID: (relay) <d@x.org>\n\n");
        assert_eq!(message_id(&leading).as_deref(), Some("d@x.org"));

        let bare = HeaderParser::default().parse_message(b"Message-Id: e@x.org (note)\n\n");
        assert_eq!(message_id(&bare).as_deref(), Some("e@x.org"));
    }
}
