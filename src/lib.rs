mod config;
mod corpus;
mod error;
mod fields;
mod frontmatter;
mod queue;
mod resolve;
mod review;
mod schedule;
mod settings;
mod store;
mod timestamp;
mod vault;

pub use crate::config::{VaultConfig, ZoneMode};
pub use crate::corpus::Corpus;
pub use crate::error::{Error, Result};
pub use crate::fields::{FieldMap, FieldValue, Patch};
pub use crate::queue::{build_queue, DueEntry, QueueOutcome};
pub use crate::resolve::{resolve, MethodChoice, Resolution};
pub use crate::review::{
    OnboardOutcome, RemoveOutcome, ReviewOutcome, ReviewPrompter, Scheduler, Selection, Status,
};
pub use crate::schedule::{AlgorithmSet, ReviewState, ScheduleAlgorithm, SuperMemo2};
pub use crate::settings::{
    Algorithm, Context, ReviewOption, Settings, SpacingMethod, DEFAULT_EASE,
};
pub use crate::store::{keys, FileStore, MemoryStore, NoteStore, Scheduling};
pub use crate::timestamp::{format_timestamp, parse_timestamp};
pub use crate::vault::{Vault, VaultPath};
