//! [`Mailbox`] over an IMAP connection secured with TLS.

use std::collections::BTreeSet;
use std::net::TcpStream;

use imap::types::NameAttribute;
use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, info, warn};

use crate::error::{ExtractError, Result};
use crate::model::folder::Folder;

use super::{search_query, Mailbox, SearchField};

/// An authenticated IMAP session.
///
/// Logs out when dropped unless [`Mailbox::close`] already did.
pub struct ImapSession {
    session: imap::Session<TlsStream<TcpStream>>,
    host: String,
    selected: Option<String>,
    /// Server advertises non-synchronizing literals (RFC 7888).
    literal_plus: bool,
    closed: bool,
}

impl ImapSession {
    /// Open a TLS connection to `host:port` and log in.
    pub fn connect(host: &str, port: u16, username: &str, password: &str) -> Result<Self> {
        let auth_error = |reason: String| ExtractError::Authentication {
            host: host.to_string(),
            username: username.to_string(),
            reason,
        };

        info!(host, port, username, "Connecting");
        let tls = TlsConnector::builder()
            .build()
            .map_err(|e| auth_error(e.to_string()))?;
        let client = imap::connect((host, port), host, &tls).map_err(|e| auth_error(e.to_string()))?;
        let mut session = client
            .login(username, password)
            .map_err(|(e, _client)| auth_error(e.to_string()))?;
        info!(host, "Connected");

        let literal_plus = match session.capabilities() {
            Ok(caps) => caps.has_str("LITERAL+"),
            Err(e) => {
                warn!(host, error = %e, "CAPABILITY failed, assuming no LITERAL+");
                false
            }
        };
        debug!(literal_plus, "Server capabilities");

        Ok(Self {
            session,
            host: host.to_string(),
            selected: None,
            literal_plus,
            closed: false,
        })
    }
}

impl Mailbox for ImapSession {
    fn list_folders(&mut self) -> Result<Vec<Folder>> {
        let names = self
            .session
            .list(None, Some("*"))
            .map_err(|e| ExtractError::Imap(format!("LIST failed: {e}")))?;

        let folders: Vec<Folder> = names
            .iter()
            .map(|name| Folder {
                flags: name.attributes().iter().map(attribute_label).collect(),
                delimiter: name.delimiter().map(str::to_string),
                name: name.name().to_string(),
            })
            .collect();
        debug!(count = folders.len(), "Listed folders");
        Ok(folders)
    }

    fn select_folder(&mut self, folder: &str) -> Result<()> {
        match self.session.select(folder) {
            Ok(mailbox) => {
                info!(folder, exists = mailbox.exists, "Selected folder");
                self.selected = Some(folder.to_string());
                Ok(())
            }
            Err(e @ (imap::error::Error::No(_) | imap::error::Error::Bad(_))) => {
                Err(ExtractError::FolderNotFound {
                    folder: folder.to_string(),
                    reason: e.to_string(),
                    available: Vec::new(),
                })
            }
            Err(e) => Err(ExtractError::Imap(format!("SELECT {folder} failed: {e}"))),
        }
    }

    fn search(&mut self, field: SearchField, pattern: &str) -> Result<BTreeSet<u32>> {
        let query = search_query(field, pattern, self.literal_plus)?;
        let ids = self
            .session
            .search(&query)
            .map_err(|e| ExtractError::Search {
                query: query.clone(),
                reason: e.to_string(),
            })?;
        debug!(query = %query, count = ids.len(), "Searched");
        Ok(ids.into_iter().collect())
    }

    fn fetch_raw(&mut self, id: u32) -> Result<Vec<u8>> {
        let fetches = self
            .session
            .fetch(id.to_string(), "RFC822")
            .map_err(|e| ExtractError::Fetch {
                id,
                reason: e.to_string(),
            })?;
        fetches
            .iter()
            .find_map(|fetch| fetch.body().map(<[u8]>::to_vec))
            .ok_or_else(|| ExtractError::Fetch {
                id,
                reason: "response carried no message body".to_string(),
            })
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = match self.selected.take() {
            Some(_) => self.session.close(),
            None => Ok(()),
        };
        let logged_out = self.session.logout();
        info!(host = %self.host, "Logged out");

        closed
            .and(logged_out)
            .map_err(|e| ExtractError::Imap(format!("logout failed: {e}")))
    }
}

impl Drop for ImapSession {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.close() {
                warn!(host = %self.host, error = %e, "Failed to close IMAP session");
            }
        }
    }
}

/// Name attributes in wire form, e.g. `\Noselect` or `\HasChildren`.
fn attribute_label(attribute: &NameAttribute<'_>) -> String {
    match attribute {
        NameAttribute::Custom(label) => label.to_string(),
        other => format!("\\{other:?}"),
    }
}
