use std::path::{Component, Path, PathBuf};

use crate::{Error, Result, VaultConfig};

/// A cleaned, vault-relative path. Never absolute, never escapes the root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VaultPath(PathBuf);

impl VaultPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn as_str_lossy(&self) -> String {
        self.0.to_string_lossy().to_string()
    }
}

impl TryFrom<&Path> for VaultPath {
    type Error = Error;

    fn try_from(value: &Path) -> Result<Self> {
        if value.as_os_str().is_empty() {
            return Err(Error::InvalidVaultPath("empty path".into()));
        }

        let mut cleaned = PathBuf::new();
        for c in value.components() {
            match c {
                Component::Prefix(_) | Component::RootDir => {
                    return Err(Error::InvalidVaultPath(
                        "absolute paths are not allowed".into(),
                    ));
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(Error::InvalidVaultPath(
                        "path traversal is not allowed".into(),
                    ));
                }
                Component::Normal(part) => cleaned.push(part),
            }
        }

        if cleaned.as_os_str().is_empty() {
            return Err(Error::InvalidVaultPath("empty path".into()));
        }

        Ok(Self(cleaned))
    }
}

impl std::str::FromStr for VaultPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::try_from(Path::new(s))
    }
}

#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    cfg: VaultConfig,
}

impl Vault {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(root, VaultConfig::default())
    }

    pub fn with_config(root: impl Into<PathBuf>, cfg: VaultConfig) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            return Err(Error::VaultNotFound(root));
        }
        let root = std::fs::canonicalize(&root).map_err(|e| Error::io(&root, e))?;
        Ok(Self { root, cfg })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &VaultConfig {
        &self.cfg
    }

    pub fn to_abs(&self, rel: &VaultPath) -> PathBuf {
        self.root.join(rel.as_path())
    }

    /// Resolve an absolute or vault-relative path to a `VaultPath`.
    pub fn to_rel(&self, abs_or_rel: &Path) -> Result<VaultPath> {
        let abs = if abs_or_rel.is_absolute() {
            abs_or_rel.to_path_buf()
        } else {
            self.root.join(abs_or_rel)
        };

        let abs = std::fs::canonicalize(&abs).unwrap_or(abs);
        if !abs.starts_with(&self.root) {
            return Err(Error::PathOutsideVault(abs));
        }
        let rel = abs
            .strip_prefix(&self.root)
            .map_err(|_| Error::PathOutsideVault(abs.clone()))?;
        VaultPath::try_from(rel)
    }

    /// Whether a relative path names a schedulable note: a non-hidden file
    /// with a note extension, outside the ignored directories.
    pub fn is_note_rel(&self, rel: &Path) -> bool {
        let ignored = rel.components().any(|c| {
            let Component::Normal(part) = c else {
                return false;
            };
            let s = part.to_string_lossy();
            self.cfg.ignore_dirs.iter().any(|d| d == &s)
        });
        if ignored {
            return false;
        }

        let file_name = rel.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if file_name.is_empty() || file_name.starts_with('.') {
            return false;
        }

        let ext = rel.extension().and_then(|s| s.to_str()).unwrap_or("");
        self.cfg
            .note_extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}
