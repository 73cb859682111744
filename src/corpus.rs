use std::collections::BTreeMap;

use tracing::warn;

use crate::fields::FieldMap;
use crate::{frontmatter, Error, Result, Vault, VaultPath};

/// All schedulable notes in a vault with their frontmatter fields, in
/// stable path order. Rebuilt from disk on every scan; nothing is cached
/// across calls.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    notes: BTreeMap<VaultPath, FieldMap>,
}

impl Corpus {
    pub fn scan(vault: &Vault) -> Result<Self> {
        let mut corpus = Self::default();
        for entry in walkdir::WalkDir::new(vault.root())
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = vault.to_rel(entry.path()) else {
                continue;
            };
            if !vault.is_note_rel(rel.as_path()) {
                continue;
            }

            let abs = vault.to_abs(&rel);
            let content = std::fs::read_to_string(&abs).map_err(|e| Error::io(&abs, e))?;
            match frontmatter::fields_lenient(&content) {
                Ok(fields) => {
                    corpus.notes.insert(rel, fields);
                }
                Err(error) => {
                    // A broken fence makes one note unschedulable; it must
                    // not abort the whole scan.
                    warn!(path = %rel.as_str_lossy(), %error, "skipping note with broken frontmatter");
                }
            }
        }
        Ok(corpus)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VaultPath, &FieldMap)> {
        self.notes.iter()
    }

    pub fn note(&self, path: &VaultPath) -> Option<&FieldMap> {
        self.notes.get(path)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
