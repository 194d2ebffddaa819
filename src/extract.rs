//! The download pipeline: select, search, fetch, materialize.

use tracing::{debug, info};

use crate::error::{ExtractError, Result};
use crate::materialize::Materializer;
use crate::model::report::RunSummary;
use crate::session::{Mailbox, SearchField};

/// What to download.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Folder to search in.
    pub folder: String,
    /// Subject filter; empty or `*` matches every message.
    pub subject: String,
    /// Body filter; empty or `*` matches every message.
    pub body: String,
}

/// Select the requested folder, or fail with [`ExtractError::FolderNotFound`]
/// listing the folders the server does offer.
pub fn select_folder<M: Mailbox + ?Sized>(mailbox: &mut M, folder: &str) -> Result<()> {
    match mailbox.select_folder(folder) {
        Err(ExtractError::FolderNotFound {
            folder,
            reason,
            available: _,
        }) => {
            let available = mailbox
                .list_folders()?
                .into_iter()
                .map(|f| f.name)
                .collect();
            Err(ExtractError::FolderNotFound {
                folder,
                reason,
                available,
            })
        }
        other => other,
    }
}

/// Ids matching both the subject and the body filter.
///
/// Runs two independent searches and intersects them.
pub fn find_messages<M: Mailbox + ?Sized>(
    mailbox: &mut M,
    request: &SearchRequest,
) -> Result<Vec<u32>> {
    let by_subject = mailbox.search(SearchField::Subject, &request.subject)?;
    let by_body = mailbox.search(SearchField::Body, &request.body)?;
    let ids: Vec<u32> = by_subject.intersection(&by_body).copied().collect();
    info!(
        subject = %request.subject,
        body = %request.body,
        subject_matches = by_subject.len(),
        body_matches = by_body.len(),
        matched = ids.len(),
        "Search complete"
    );
    Ok(ids)
}

/// Download every matching message into the materializer's root.
///
/// Messages are handled one at a time in ascending id order; the first
/// failure aborts the run. The progress callback receives `(done, total)`.
pub fn download<M: Mailbox + ?Sized>(
    mailbox: &mut M,
    materializer: &Materializer,
    request: &SearchRequest,
    progress: &dyn Fn(usize, usize),
) -> Result<RunSummary> {
    select_folder(mailbox, &request.folder)?;

    let root = materializer.root();
    std::fs::create_dir_all(root).map_err(|e| ExtractError::io(root, e))?;

    let ids = find_messages(mailbox, request)?;
    let total = ids.len();
    let mut summary = RunSummary {
        folder: request.folder.clone(),
        root: root.to_path_buf(),
        matched: total,
        messages: Vec::with_capacity(total),
    };

    for (i, id) in ids.into_iter().enumerate() {
        progress(i, total);
        let raw = mailbox.fetch_raw(id)?;
        let report = materializer.materialize(&raw)?;
        debug!(id, message_id = %report.message_id, "Downloaded message");
        summary.messages.push(report);
    }
    progress(total, total);

    info!(
        folder = %summary.folder,
        messages = summary.messages.len(),
        files = summary.files_written(),
        "Download complete"
    );
    Ok(summary)
}
