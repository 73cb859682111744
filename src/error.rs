use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("vault root does not exist: {0}")]
    VaultNotFound(PathBuf),

    #[error("invalid vault path: {0}")]
    InvalidVaultPath(String),

    #[error("path is outside vault: {0}")]
    PathOutsideVault(PathBuf),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("frontmatter error at {path}: {message}")]
    Frontmatter { path: PathBuf, message: String },

    #[error("note not found: {0}")]
    NoteNotFound(PathBuf),

    #[error("settings toml error: {0}")]
    SettingsToml(String),

    #[error("no spacing methods are configured")]
    NoMethods,

    #[error("spacing method not found: {0}")]
    UnknownMethod(String),

    #[error("spacing method already exists: {0}")]
    DuplicateMethod(String),

    #[error("cannot delete the last remaining spacing method: {0}")]
    LastMethod(String),

    #[error("context not found: {0}")]
    UnknownContext(String),

    #[error("context already exists: {0}")]
    DuplicateContext(String),

    #[error("invalid spacing method {method}: {reason}")]
    InvalidMethod { method: String, reason: String },

    #[error("invalid context {context}: {reason}")]
    InvalidContext { context: String, reason: String },

    #[error("spacing method {method} has no review option named {option}")]
    UnknownReviewOption { method: String, option: String },

    #[error("no schedule algorithm registered for: {0}")]
    AlgorithmUnavailable(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn frontmatter(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Frontmatter {
            path: path.into(),
            message: message.into(),
        }
    }
}
