use std::collections::BTreeMap;

use tracing::debug;

use crate::fields::{FieldMap, FieldValue, Patch};
use crate::{frontmatter, Error, Result, Vault, VaultPath};

/// The frontmatter keys the scheduler owns. These exact strings are the
/// compatibility contract with already-onboarded notes.
pub mod keys {
    pub const INTERVAL: &str = "interval";
    pub const LAST_REVIEWED: &str = "last-reviewed";
    pub const EASE: &str = "ease";
    pub const METHOD: &str = "method";
    pub const CONTEXTS: &str = "contexts";
}

/// Typed view over the scheduling fields of one note's metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scheduling {
    pub interval: Option<f64>,
    pub ease: Option<f64>,
    pub last_reviewed: Option<String>,
    pub method: Option<String>,
    pub contexts: Vec<String>,
}

impl Scheduling {
    pub fn from_fields(fields: &FieldMap) -> Self {
        Self {
            interval: fields.get(keys::INTERVAL).and_then(FieldValue::as_number),
            ease: fields.get(keys::EASE).and_then(FieldValue::as_number),
            last_reviewed: fields
                .get(keys::LAST_REVIEWED)
                .and_then(|v| v.as_str().map(str::to_string)),
            method: fields
                .get(keys::METHOD)
                .and_then(|v| v.as_str().map(str::to_string)),
            contexts: fields
                .get(keys::CONTEXTS)
                .map(FieldValue::as_string_list)
                .unwrap_or_default(),
        }
    }

    /// A note is onboarded iff its metadata carries an interval.
    pub fn onboarded(&self) -> bool {
        self.interval.is_some()
    }
}

/// Capability interface over per-note metadata. All mutations for one
/// logical operation arrive as a single patch so the note never becomes
/// visible in a half-updated state.
pub trait NoteStore {
    fn fields(&self, path: &VaultPath) -> Result<FieldMap>;
    fn apply(&mut self, path: &VaultPath, patch: Patch) -> Result<()>;
}

/// Store backed by markdown files in a vault; patches rewrite the
/// frontmatter block in place and leave the body untouched.
#[derive(Debug, Clone)]
pub struct FileStore {
    vault: Vault,
}

impl FileStore {
    pub fn new(vault: Vault) -> Self {
        Self { vault }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    fn read(&self, path: &VaultPath) -> Result<String> {
        let abs = self.vault.to_abs(path);
        std::fs::read_to_string(&abs).map_err(|e| Error::io(&abs, e))
    }
}

impl NoteStore for FileStore {
    fn fields(&self, path: &VaultPath) -> Result<FieldMap> {
        let content = self.read(path)?;
        frontmatter::fields(path, &content)
    }

    fn apply(&mut self, path: &VaultPath, patch: Patch) -> Result<()> {
        let content = self.read(path)?;
        let updated = frontmatter::apply_patch(path, &content, &patch)?;
        let abs = self.vault.to_abs(path);
        std::fs::write(&abs, updated).map_err(|e| Error::io(&abs, e))?;
        debug!(path = %path.as_str_lossy(), keys = patch.len(), "metadata patch applied");
        Ok(())
    }
}

/// In-memory store for hosts that keep metadata elsewhere, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    notes: BTreeMap<VaultPath, FieldMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: VaultPath, fields: FieldMap) {
        self.notes.insert(path, fields);
    }

    pub fn get(&self, path: &VaultPath) -> Option<&FieldMap> {
        self.notes.get(path)
    }
}

impl NoteStore for MemoryStore {
    fn fields(&self, path: &VaultPath) -> Result<FieldMap> {
        self.notes
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NoteNotFound(path.as_path().to_path_buf()))
    }

    fn apply(&mut self, path: &VaultPath, patch: Patch) -> Result<()> {
        let Some(fields) = self.notes.get_mut(path) else {
            return Err(Error::NoteNotFound(path.as_path().to_path_buf()));
        };
        for (key, update) in patch {
            match update {
                Some(value) => {
                    fields.insert(key, value);
                }
                None => {
                    fields.remove(&key);
                }
            }
        }
        Ok(())
    }
}
