use crate::corpus::Corpus;
use crate::settings::Settings;
use crate::store::Scheduling;
use crate::timestamp::{due_at_ms, parse_timestamp};
use crate::{VaultPath, ZoneMode};

use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueEntry {
    pub path: VaultPath,
    /// Epoch milliseconds at which the note became due.
    pub due_at_ms: i64,
}

/// Result of a queue build. "No active contexts" is a deliberate outcome
/// distinct from an empty queue: contexts exist but the user has switched
/// them all off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueOutcome {
    NoActiveContexts,
    Queue(Vec<DueEntry>),
}

/// Filter the corpus by active contexts and due status, ordered most
/// overdue first. Fully materialized and recomputed per call.
pub fn build_queue(
    corpus: &Corpus,
    settings: &Settings,
    zone: ZoneMode,
    now_ms: i64,
) -> QueueOutcome {
    let filter = match ContextFilter::from_settings(settings) {
        Some(f) => f,
        None => return QueueOutcome::NoActiveContexts,
    };

    let mut entries = Vec::new();
    for (path, fields) in corpus.iter() {
        let sched = Scheduling::from_fields(fields);
        if !filter.allows(&sched) {
            continue;
        }
        let Some(due_at) = note_due_time(path, &sched, zone) else {
            continue;
        };
        if now_ms > due_at {
            entries.push(DueEntry {
                path: path.clone(),
                due_at_ms: due_at,
            });
        }
    }

    // Stable: corpus iterates in path order, so equal due times keep it.
    entries.sort_by_key(|e| e.due_at_ms);
    QueueOutcome::Queue(entries)
}

enum ContextFilter {
    /// No contexts registered; everything passes.
    All,
    Active(Vec<String>),
}

impl ContextFilter {
    /// `None` means contexts exist but none is active.
    fn from_settings(settings: &Settings) -> Option<Self> {
        if settings.contexts.is_empty() {
            return Some(Self::All);
        }
        let active: Vec<String> = settings
            .active_context_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        if active.is_empty() {
            return None;
        }
        Some(Self::Active(active))
    }

    /// Untagged notes always pass; tagged notes need one active context.
    fn allows(&self, sched: &Scheduling) -> bool {
        match self {
            Self::All => true,
            Self::Active(active) => {
                sched.contexts.is_empty()
                    || sched.contexts.iter().any(|c| active.contains(c))
            }
        }
    }
}

/// Due time for an onboarded note; `None` for notes not yet onboarded.
/// A missing or unparseable `last-reviewed` counts as reviewed at epoch 0,
/// so an onboarded note is overdue rather than lost.
pub(crate) fn note_due_time(path: &VaultPath, sched: &Scheduling, zone: ZoneMode) -> Option<i64> {
    let interval = sched.interval?;
    let last_ms = match &sched.last_reviewed {
        None => 0,
        Some(raw) => match parse_timestamp(raw, zone) {
            Some(ms) => ms,
            None => {
                warn!(
                    path = %path.as_str_lossy(),
                    value = %raw,
                    "unparseable last-reviewed; treating note as always overdue"
                );
                0
            }
        },
    };
    Some(due_at_ms(last_ms, interval))
}
