//! Integration tests for the select → search → fetch → materialize pipeline,
//! driven by an in-memory mailbox.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use mailextract::error::{ExtractError, Result};
use mailextract::extract::{self, SearchRequest};
use mailextract::materialize::{MaterializeOptions, Materializer, HEADERS_FILE};
use mailextract::model::folder::Folder;
use mailextract::model::headers::RepeatedHeaders;
use mailextract::parser::header::{find_header_end, HeaderParser};
use mailextract::session::{self, Mailbox, SearchField};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// A mailbox served from memory, searching headers and bodies with a
/// case-insensitive substring match.
struct FakeMailbox {
    folders: Vec<String>,
    messages: BTreeMap<u32, Vec<u8>>,
    selected: Option<String>,
    list_calls: usize,
    closed: bool,
}

impl FakeMailbox {
    fn new(fixtures: &[&str]) -> Self {
        let messages = fixtures
            .iter()
            .zip(1u32..)
            .map(|(name, id)| (id, std::fs::read(fixture(name)).unwrap()))
            .collect();
        Self {
            folders: vec!["INBOX".into(), "Sent".into()],
            messages,
            selected: None,
            list_calls: 0,
            closed: false,
        }
    }

    fn with_message(mut self, raw: &str) -> Self {
        let id = self.messages.len() as u32 + 1;
        self.messages.insert(id, raw.as_bytes().to_vec());
        self
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl Mailbox for FakeMailbox {
    fn list_folders(&mut self) -> Result<Vec<Folder>> {
        self.list_calls += 1;
        Ok(self
            .folders
            .iter()
            .map(|name| Folder {
                flags: Vec::new(),
                delimiter: Some("/".into()),
                name: name.clone(),
            })
            .collect())
    }

    fn select_folder(&mut self, folder: &str) -> Result<()> {
        if self.folders.iter().any(|f| f == folder) {
            self.selected = Some(folder.to_string());
            Ok(())
        } else {
            Err(ExtractError::FolderNotFound {
                folder: folder.to_string(),
                reason: "NO Mailbox doesn't exist".into(),
                available: Vec::new(),
            })
        }
    }

    fn search(&mut self, field: SearchField, pattern: &str) -> Result<BTreeSet<u32>> {
        assert!(self.selected.is_some(), "search before select");
        let parser = HeaderParser::new(RepeatedHeaders::Last);
        Ok(self
            .messages
            .iter()
            .filter(|(_, raw)| {
                if session::is_match_all(pattern) {
                    return true;
                }
                match field {
                    SearchField::Subject => parser
                        .parse_message(raw)
                        .get("subject")
                        .is_some_and(|s| contains_ignore_case(s, pattern)),
                    SearchField::Body => {
                        let start = find_header_end(raw).unwrap_or(raw.len());
                        contains_ignore_case(&String::from_utf8_lossy(&raw[start..]), pattern)
                    }
                }
            })
            .map(|(id, _)| *id)
            .collect())
    }

    fn fetch_raw(&mut self, id: u32) -> Result<Vec<u8>> {
        self.messages.get(&id).cloned().ok_or(ExtractError::Fetch {
            id,
            reason: "no such message".into(),
        })
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.selected = None;
        Ok(())
    }
}

fn materializer(root: &Path) -> Materializer {
    Materializer::new(MaterializeOptions {
        root: root.to_path_buf(),
        repeated_headers: RepeatedHeaders::Last,
    })
}

fn request(folder: &str, subject: &str, body: &str) -> SearchRequest {
    SearchRequest {
        folder: folder.into(),
        subject: subject.into(),
        body: body.into(),
    }
}

fn no_progress(_done: usize, _total: usize) {}

const REMINDER: &str = "From: billing@example.com\n\
Subject: invoice reminder\n\
Message-ID: <reminder001@example.com>\n\
\n\
Your invoice is overdue.\n";

fn subdirectories(root: &Path) -> BTreeSet<String> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|e| e.unwrap())
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect()
}

// ─── Test 1: Subject filter selects exactly the matching messages ───

#[test]
fn test_download_matching_subjects() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("emails");
    let mut mailbox = FakeMailbox::new(&[
        "plain.eml",
        "two_plain.eml",
        "attachments.eml",
        "two_html.eml",
    ])
    .with_message(REMINDER);

    let seen = RefCell::new(Vec::new());
    let summary = extract::download(
        &mut mailbox,
        &materializer(&root),
        &request("INBOX", "Invoice", "*"),
        &|done, total| seen.borrow_mut().push((done, total)),
    )
    .unwrap();

    assert_eq!(summary.matched, 3);
    assert_eq!(summary.messages.len(), 3);
    assert_eq!(seen.borrow().last(), Some(&(3, 3)));

    let dirs = subdirectories(&root);
    let expected: BTreeSet<String> = [
        "plain001@example.com",
        "attach001@example.com",
        "reminder001@example.com",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(dirs, expected);
    for dir in &dirs {
        assert!(root.join(dir).join(HEADERS_FILE).is_file(), "{dir}");
    }
}

// ─── Test 2: Subject and body results are intersected ───────────────

#[test]
fn test_subject_and_body_are_intersected() {
    let tmp = tempfile::tempdir().unwrap();
    let mut mailbox = FakeMailbox::new(&["plain.eml", "attachments.eml"]).with_message(REMINDER);

    let summary = extract::download(
        &mut mailbox,
        &materializer(tmp.path()),
        &request("INBOX", "invoice", "total"),
        &no_progress,
    )
    .unwrap();

    assert_eq!(summary.matched, 1);
    assert_eq!(summary.messages[0].message_id, "plain001@example.com");
    assert_eq!(subdirectories(tmp.path()).len(), 1);
}

#[test]
fn test_no_matches_is_not_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("emails");
    let mut mailbox = FakeMailbox::new(&["plain.eml"]);

    let summary = extract::download(
        &mut mailbox,
        &materializer(&root),
        &request("INBOX", "nothing like this", "*"),
        &no_progress,
    )
    .unwrap();

    assert_eq!(summary.matched, 0);
    assert!(summary.messages.is_empty());
    assert!(root.is_dir());
    assert!(subdirectories(&root).is_empty());
}

// ─── Test 3: Missing folder reports what the server offers ──────────

#[test]
fn test_folder_not_found_lists_available() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("emails");
    let mut mailbox = FakeMailbox::new(&["plain.eml"]);

    let err = extract::download(
        &mut mailbox,
        &materializer(&root),
        &request("Archive", "", "*"),
        &no_progress,
    )
    .unwrap_err();

    match err {
        ExtractError::FolderNotFound {
            folder, available, ..
        } => {
            assert_eq!(folder, "Archive");
            assert_eq!(available, ["INBOX", "Sent"]);
        }
        other => panic!("expected FolderNotFound, got {other:?}"),
    }
    assert_eq!(mailbox.list_calls, 1);
    assert!(!root.exists());
}

// ─── Test 4: An unhandled part aborts the run ───────────────────────

#[test]
fn test_unrecognized_part_aborts_run() {
    let tmp = tempfile::tempdir().unwrap();
    let mut mailbox = FakeMailbox::new(&["plain.eml", "unknown_type.eml", "two_plain.eml"]);

    let err = extract::download(
        &mut mailbox,
        &materializer(tmp.path()),
        &request("INBOX", "", "*"),
        &no_progress,
    )
    .unwrap_err();

    assert!(matches!(err, ExtractError::UnrecognizedContentType(ref ct) if ct == "audio/ogg"));
    assert!(tmp.path().join("plain001@example.com").is_dir());
    assert!(!tmp.path().join("plain002@example.com").exists());
}

// ─── Test 5: A second run over the same root writes no new bodies ───

#[test]
fn test_rerun_reports_unchanged_files() {
    let tmp = tempfile::tempdir().unwrap();
    let m = materializer(tmp.path());
    let req = request("INBOX", "", "*");

    let mut mailbox = FakeMailbox::new(&["plain.eml", "two_plain.eml", "bounce.eml"]);
    let first = extract::download(&mut mailbox, &m, &req, &no_progress).unwrap();
    assert_eq!(first.files_skipped(), 0);

    let mut mailbox = FakeMailbox::new(&["plain.eml", "two_plain.eml", "bounce.eml"]);
    let second = extract::download(&mut mailbox, &m, &req, &no_progress).unwrap();

    for report in &second.messages {
        assert_eq!(report.bodies_written, 0, "{}", report.message_id);
        assert_eq!(report.delivery_status_written, 0, "{}", report.message_id);
    }
    assert_eq!(second.files_skipped(), 1 + 2 + 2 + 2);
    assert!(!tmp.path().join("plain002@example.com/body-2.txt").exists());
}

// ─── Test 6: Closing is left to the caller ──────────────────────────

#[test]
fn test_download_leaves_session_open() {
    let tmp = tempfile::tempdir().unwrap();
    let mut mailbox = FakeMailbox::new(&["plain.eml"]);

    extract::download(
        &mut mailbox,
        &materializer(tmp.path()),
        &request("INBOX", "", ""),
        &no_progress,
    )
    .unwrap();
    assert!(!mailbox.closed);
    assert_eq!(mailbox.selected.as_deref(), Some("INBOX"));

    mailbox.close().unwrap();
    assert!(mailbox.closed);
}
