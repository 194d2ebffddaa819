//! `mailextract`: download IMAP messages into per-message directories.
//!
//! This crate provides the session layer over an IMAP account, the
//! materializer that decomposes a raw message into header, body, attachment
//! and delivery-status files, and the pipeline tying the two together.

pub mod config;
pub mod error;
pub mod extract;
pub mod materialize;
pub mod model;
pub mod parser;
pub mod session;
