//! Email parsing helpers: header blocks and MIME part classification.

pub mod header;
pub mod mime;
