use crate::fields::{FieldMap, FieldValue, Patch};
use crate::settings::{Settings, SpacingMethod};
use crate::store::{keys, Scheduling};
use crate::Result;

/// How a note's governing spacing method was determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodChoice {
    /// The stored `method` key named a registered method.
    Stored,
    /// The note lists no contexts; the first registered method applies.
    NoContexts,
    /// The note's first context is bound to this method.
    ContextBinding { context: String },
    /// The first context is unregistered, unbound, or bound to a method
    /// that no longer exists; the first registered method applies.
    ContextFallback { context: String },
}

#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub method: &'a SpacingMethod,
    pub choice: MethodChoice,
}

impl Resolution<'_> {
    /// The `method` write-back to persist, when the choice was newly
    /// inferred. The caller folds this into its operation's single patch so
    /// the next resolution is stable and explicit.
    pub fn pending_writeback(&self) -> Option<Patch> {
        if self.choice == MethodChoice::Stored {
            return None;
        }
        let mut patch = Patch::new();
        patch.insert(
            keys::METHOD.to_string(),
            Some(FieldValue::String(self.method.name.clone())),
        );
        Some(patch)
    }

    /// Human-readable explanation of an implicit choice.
    pub fn notice(&self) -> Option<String> {
        let m = &self.method.name;
        match &self.choice {
            MethodChoice::Stored => None,
            MethodChoice::NoContexts => Some(format!(
                "note lists no contexts; assigned spacing method '{m}'"
            )),
            MethodChoice::ContextBinding { context } => Some(format!(
                "assigned spacing method '{m}' from context '{context}'"
            )),
            MethodChoice::ContextFallback { context } => Some(format!(
                "context '{context}' has no usable spacing method; assigned '{m}'"
            )),
        }
    }
}

/// Determine which spacing method governs a note.
///
/// Precedence: a stored `method` naming a registered method wins and is
/// never rewritten; otherwise the note's first context decides via its
/// binding; otherwise the first registered method is the universal
/// fallback. Fails only when no methods are registered at all.
pub fn resolve<'a>(settings: &'a Settings, fields: &FieldMap) -> Result<Resolution<'a>> {
    let sched = Scheduling::from_fields(fields);

    if let Some(stored) = &sched.method {
        if let Some(method) = settings.method(stored) {
            return Ok(Resolution {
                method,
                choice: MethodChoice::Stored,
            });
        }
    }

    let Some(context) = sched.contexts.first() else {
        return Ok(Resolution {
            method: settings.first_method()?,
            choice: MethodChoice::NoContexts,
        });
    };

    let bound = settings
        .context(context)
        .and_then(|c| c.method.as_deref())
        .and_then(|name| settings.method(name));

    match bound {
        Some(method) => Ok(Resolution {
            method,
            choice: MethodChoice::ContextBinding {
                context: context.clone(),
            },
        }),
        None => Ok(Resolution {
            method: settings.first_method()?,
            choice: MethodChoice::ContextFallback {
                context: context.clone(),
            },
        }),
    }
}
