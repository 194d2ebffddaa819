//! IMAP folder listing entries.

/// One entry of the server's folder listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Folder {
    /// Name attributes such as `\HasChildren` or `\Noselect`.
    pub flags: Vec<String>,
    /// Hierarchy separator, absent for flat namespaces.
    pub delimiter: Option<String>,
    /// Full folder name, usable with `--folder`.
    pub name: String,
}

impl Folder {
    /// Flags in their wire form, e.g. `(\HasChildren \Marked)`.
    pub fn flag_list(&self) -> String {
        format!("({})", self.flags.join(" "))
    }
}

impl std::fmt::Display for Folder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}  {}", self.flag_list(), self.name)
    }
}
