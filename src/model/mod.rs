//! Core data model types: folders, header maps and download reports.

pub mod folder;
pub mod headers;
pub mod report;
