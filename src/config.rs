use std::path::PathBuf;

/// Time zone applied to stored timestamps that carry no explicit offset.
///
/// The persisted `last-reviewed` format changed over the system's lifetime:
/// new writes carry an explicit offset, old ones may not. Old bare stamps are
/// interpreted in this zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneMode {
    Utc,
    Local,
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Directory names to ignore anywhere in the path.
    pub ignore_dirs: Vec<String>,
    /// File extensions (without dot) that are considered notes.
    pub note_extensions: Vec<String>,
    /// Scheduler settings TOML path (relative to vault root).
    pub settings_path: PathBuf,
    /// Zone for bare `last-reviewed` timestamps.
    pub bare_timestamp_zone: ZoneMode,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: vec![
                ".obsidian".into(),
                ".git".into(),
                ".trash".into(),
                "node_modules".into(),
                "target".into(),
            ],
            note_extensions: vec!["md".into()],
            settings_path: PathBuf::from(".obsidian/resurface/settings.toml"),
            bare_timestamp_zone: ZoneMode::Utc,
        }
    }
}
