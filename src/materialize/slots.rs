//! Numbered file names (`body-0.txt`, `delivery-status-3.yaml`, ...).
//!
//! An allocator is seeded once from a directory listing, so allocation is
//! O(existing files). That is fine for the handful of files a message
//! directory holds; it is not safe with several writers on one directory.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ExtractError, Result};

/// Outcome of [`SlotAllocator::place`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// A new file was created.
    Written(PathBuf),
    /// A file that predates this pass already held the same bytes.
    Unchanged(PathBuf),
}

/// Hands out `<prefix><n><suffix>` names in one directory.
#[derive(Debug)]
pub struct SlotAllocator {
    dir: PathBuf,
    prefix: &'static str,
    suffix: &'static str,
    /// Indices on disk when the allocator was seeded.
    existing: BTreeSet<usize>,
    /// Indices used during this pass.
    claimed: BTreeSet<usize>,
}

impl SlotAllocator {
    /// Seed from the current contents of `dir`. A missing directory counts as empty.
    pub fn seed(dir: &Path, prefix: &'static str, suffix: &'static str) -> Result<Self> {
        let mut existing = BTreeSet::new();

        match std::fs::read_dir(dir) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|e| ExtractError::io(dir, e))?;
                    let name = entry.file_name();
                    if let Some(index) = name.to_str().and_then(|n| parse_index(n, prefix, suffix)) {
                        existing.insert(index);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(ExtractError::io(dir, e)),
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            prefix,
            suffix,
            existing,
            claimed: BTreeSet::new(),
        })
    }

    pub fn path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("{}{index}{}", self.prefix, self.suffix))
    }

    /// Store `contents` under the lowest free index.
    ///
    /// A pre-existing, not yet claimed file with identical contents is
    /// claimed instead of writing a duplicate, so rerunning over a populated
    /// directory does not grow it. Existing files are never overwritten.
    pub fn place(&mut self, contents: &[u8]) -> Result<Placement> {
        let reusable: Vec<usize> = self.existing.difference(&self.claimed).copied().collect();
        for index in reusable {
            let path = self.path(index);
            match std::fs::read(&path) {
                Ok(on_disk) if on_disk == contents => {
                    self.claimed.insert(index);
                    return Ok(Placement::Unchanged(path));
                }
                Ok(_) => {}
                Err(e) => return Err(ExtractError::io(&path, e)),
            }
        }

        let index = (0..)
            .find(|i| !self.existing.contains(i) && !self.claimed.contains(i))
            .unwrap_or_default();
        let path = self.path(index);
        write_new(&path, contents)?;
        self.claimed.insert(index);
        Ok(Placement::Written(path))
    }
}

/// Create `path` and write `contents`, failing if it already exists.
pub fn write_new(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| ExtractError::io(path, e))?;
    file.write_all(contents)
        .map_err(|e| ExtractError::io(path, e))
}

fn parse_index(name: &str, prefix: &str, suffix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?
        .strip_suffix(suffix)?
        .parse()
        .ok()
}
