use chrono::{DateTime, Utc};
use tracing::info;

use crate::fields::{FieldValue, Patch};
use crate::resolve::{resolve, MethodChoice};
use crate::schedule::{AlgorithmSet, ReviewState};
use crate::settings::{Algorithm, Context, Settings, SpacingMethod};
use crate::store::{keys, NoteStore, Scheduling};
use crate::timestamp::format_timestamp;
use crate::{Error, Result, VaultPath, ZoneMode};

/// A prompt's answer. Cancellation is a value, not an error: the user
/// abandoning a prompt aborts the operation with no mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Picked(T),
    Cancelled,
}

/// The user-interaction seam. The CLI implements this over stdin/flags;
/// tests script it.
pub trait ReviewPrompter {
    /// Context membership for a note being onboarded. An empty pick is a
    /// valid "no contexts" answer, distinct from cancellation.
    fn pick_contexts(&mut self, registered: &[Context]) -> Selection<Vec<String>>;
    /// Explicit method choice, asked only when more than one is registered.
    fn pick_method(&mut self, methods: &[SpacingMethod]) -> Selection<String>;
    /// Review outcome for this review's governing method.
    fn pick_review_option(&mut self, method: &SpacingMethod) -> Selection<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum OnboardOutcome {
    Onboarded {
        method: String,
        interval: f64,
        ease: Option<f64>,
        contexts: Vec<String>,
    },
    AlreadyOnboarded,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    Reviewed {
        method: String,
        option: String,
        score: f64,
        prior: ReviewState,
        next: ReviewState,
        /// Explanation when the method was inferred rather than stored.
        method_notice: Option<String>,
    },
    NotOnboarded,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotOnboarded,
}

/// Read-only scheduling report for one note.
#[derive(Debug, Clone)]
pub struct Status {
    pub scheduling: Scheduling,
    pub method: String,
    pub choice: MethodChoice,
    pub due_at_ms: Option<i64>,
    pub due_now: bool,
}

/// Orchestrates the per-note lifecycle over a metadata store. Operations
/// are short-lived and synchronous; each one applies at most one batched
/// metadata patch.
pub struct Scheduler<'a, S> {
    settings: &'a Settings,
    algorithms: &'a AlgorithmSet,
    store: &'a mut S,
    zone: ZoneMode,
}

impl<'a, S: NoteStore> Scheduler<'a, S> {
    pub fn new(
        settings: &'a Settings,
        algorithms: &'a AlgorithmSet,
        store: &'a mut S,
        zone: ZoneMode,
    ) -> Self {
        Self {
            settings,
            algorithms,
            store,
            zone,
        }
    }

    /// Register a note with the scheduler: contexts, method, defaults.
    /// Abortable at every prompt with zero mutation.
    pub fn onboard(
        &mut self,
        path: &VaultPath,
        prompter: &mut dyn ReviewPrompter,
        now: DateTime<Utc>,
    ) -> Result<OnboardOutcome> {
        let fields = self.store.fields(path)?;
        if Scheduling::from_fields(&fields).onboarded() {
            return Ok(OnboardOutcome::AlreadyOnboarded);
        }

        let contexts = match prompter.pick_contexts(&self.settings.contexts) {
            Selection::Picked(c) => c,
            Selection::Cancelled => return Ok(OnboardOutcome::Cancelled),
        };

        let method = if self.settings.methods.len() > 1 {
            match prompter.pick_method(&self.settings.methods) {
                Selection::Picked(name) => self
                    .settings
                    .method(&name)
                    .ok_or(Error::UnknownMethod(name))?,
                Selection::Cancelled => return Ok(OnboardOutcome::Cancelled),
            }
        } else {
            self.settings.first_method()?
        };

        let interval = method.default_interval;
        let ease = match method.algorithm {
            Algorithm::SuperMemo2 => Some(method.starting_ease()),
            Algorithm::Custom(_) => method.default_ease,
        };

        let mut patch = Patch::new();
        patch.insert(keys::INTERVAL.into(), Some(FieldValue::Number(interval)));
        if let Some(ease) = ease {
            patch.insert(keys::EASE.into(), Some(FieldValue::Number(ease)));
        }
        patch.insert(
            keys::LAST_REVIEWED.into(),
            Some(FieldValue::String(format_timestamp(now))),
        );
        patch.insert(
            keys::METHOD.into(),
            Some(FieldValue::String(method.name.clone())),
        );
        if !contexts.is_empty() {
            patch.insert(keys::CONTEXTS.into(), Some(contexts.clone().into()));
        }
        self.store.apply(path, patch)?;

        info!(
            path = %path.as_str_lossy(),
            method = %method.name,
            interval,
            "note onboarded"
        );
        Ok(OnboardOutcome::Onboarded {
            method: method.name.clone(),
            interval,
            ease,
            contexts,
        })
    }

    /// Review a scheduled note: resolve its method, ask for an outcome,
    /// compute and persist the new interval/ease in one patch.
    pub fn review(
        &mut self,
        path: &VaultPath,
        prompter: &mut dyn ReviewPrompter,
        now: DateTime<Utc>,
    ) -> Result<ReviewOutcome> {
        let fields = self.store.fields(path)?;
        let sched = Scheduling::from_fields(&fields);
        if !sched.onboarded() {
            return Ok(ReviewOutcome::NotOnboarded);
        }

        let resolution = resolve(self.settings, &fields)?;
        let method = resolution.method;

        let option = match prompter.pick_review_option(method) {
            Selection::Picked(o) => o,
            Selection::Cancelled => return Ok(ReviewOutcome::Cancelled),
        };
        let score = method.score_for(&option)?;

        let prior = ReviewState {
            interval: sched.interval.unwrap_or(method.default_interval),
            ease: sched.ease.unwrap_or_else(|| method.starting_ease()),
        };
        let next = self.algorithms.for_method(method)?.update(prior, score);

        // The resolver's write-back rides in the same patch, so a cancelled
        // or failed review persists nothing at all.
        let mut patch = resolution.pending_writeback().unwrap_or_default();
        patch.insert(
            keys::INTERVAL.into(),
            Some(FieldValue::Number(next.interval)),
        );
        patch.insert(keys::EASE.into(), Some(FieldValue::Number(next.ease)));
        patch.insert(
            keys::LAST_REVIEWED.into(),
            Some(FieldValue::String(format_timestamp(now))),
        );
        self.store.apply(path, patch)?;

        info!(
            path = %path.as_str_lossy(),
            method = %method.name,
            option = %option,
            score,
            prior_interval = prior.interval,
            new_interval = next.interval,
            new_ease = next.ease,
            "review recorded"
        );
        Ok(ReviewOutcome::Reviewed {
            method: method.name.clone(),
            option,
            score,
            prior,
            next,
            method_notice: resolution.notice(),
        })
    }

    /// Take a note back out of the scheduler. All scheduling keys are
    /// deleted, `method` included: removal returns the note to a blank
    /// slate and re-onboarding prompts afresh.
    pub fn remove(&mut self, path: &VaultPath) -> Result<RemoveOutcome> {
        let fields = self.store.fields(path)?;
        if !Scheduling::from_fields(&fields).onboarded() {
            return Ok(RemoveOutcome::NotOnboarded);
        }

        let patch: Patch = [
            keys::INTERVAL,
            keys::EASE,
            keys::LAST_REVIEWED,
            keys::CONTEXTS,
            keys::METHOD,
        ]
        .into_iter()
        .map(|k| (k.to_string(), None))
        .collect();
        self.store.apply(path, patch)?;

        info!(path = %path.as_str_lossy(), "note removed from scheduling");
        Ok(RemoveOutcome::Removed)
    }

    /// Read-only report; resolution here is never persisted.
    pub fn status(&self, path: &VaultPath, now: DateTime<Utc>) -> Result<Status> {
        let fields = self.store.fields(path)?;
        let sched = Scheduling::from_fields(&fields);
        let resolution = resolve(self.settings, &fields)?;
        let due_at_ms = crate::queue::note_due_time(path, &sched, self.zone);
        let due_now = due_at_ms.is_some_and(|due| now.timestamp_millis() > due);
        Ok(Status {
            method: resolution.method.name.clone(),
            choice: resolution.choice,
            scheduling: sched,
            due_at_ms,
            due_now,
        })
    }
}
