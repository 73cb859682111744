use std::path::PathBuf;

use tracing::info;

use crate::{Error, Result, Vault};

pub const DEFAULT_EASE: f64 = 2.5;

/// Which interval-update algorithm a spacing method uses.
///
/// Serialized as a plain string: `"sm2"` for the built-in, `"custom:<name>"`
/// for a registered strategy.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Algorithm {
    SuperMemo2,
    Custom(String),
}

impl From<String> for Algorithm {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "sm2" | "supermemo2.0" => Algorithm::SuperMemo2,
            other => Algorithm::Custom(
                other.strip_prefix("custom:").unwrap_or(other).to_string(),
            ),
        }
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        match value {
            Algorithm::SuperMemo2 => "sm2".to_string(),
            Algorithm::Custom(name) => format!("custom:{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReviewOption {
    pub name: String,
    /// Review quality in [0, 5].
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SpacingMethod {
    pub name: String,
    #[serde(default = "Algorithm::default_selector")]
    pub algorithm: Algorithm,
    pub review_options: Vec<ReviewOption>,
    /// Interval in days assigned at onboarding and used as the prior for a
    /// first review.
    pub default_interval: f64,
    /// Starting ease factor; meaningful for SM-2 only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ease: Option<f64>,
}

impl Algorithm {
    fn default_selector() -> Self {
        Algorithm::SuperMemo2
    }
}

impl SpacingMethod {
    pub fn option(&self, name: &str) -> Option<&ReviewOption> {
        self.review_options.iter().find(|o| o.name == name)
    }

    pub fn score_for(&self, option: &str) -> Result<f64> {
        self.option(option)
            .map(|o| o.score)
            .ok_or_else(|| Error::UnknownReviewOption {
                method: self.name.clone(),
                option: option.to_string(),
            })
    }

    pub fn starting_ease(&self) -> f64 {
        self.default_ease.unwrap_or(DEFAULT_EASE)
    }

    fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidMethod {
            method: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.review_options.is_empty() {
            return Err(invalid("no review options"));
        }
        for opt in &self.review_options {
            if opt.name.trim().is_empty() {
                return Err(invalid("review option with empty name"));
            }
            if !(0.0..=5.0).contains(&opt.score) {
                return Err(Error::InvalidMethod {
                    method: self.name.clone(),
                    reason: format!(
                        "score {} for option {} is outside [0, 5]",
                        opt.score, opt.name
                    ),
                });
            }
        }
        if self.default_interval <= 0.0 {
            return Err(invalid("default interval must be positive"));
        }
        if let Some(ease) = self.default_ease {
            if ease < 1.3 {
                return Err(invalid("default ease must be at least 1.3"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Context {
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Spacing method this context assigns to its notes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    #[serde(default)]
    pub methods: Vec<SpacingMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<Context>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            methods: vec![SpacingMethod {
                name: "default".to_string(),
                algorithm: Algorithm::SuperMemo2,
                review_options: vec![
                    ReviewOption { name: "Struggled".into(), score: 0.0 },
                    ReviewOption { name: "Hard".into(), score: 2.0 },
                    ReviewOption { name: "Okay".into(), score: 3.0 },
                    ReviewOption { name: "Good".into(), score: 4.0 },
                    ReviewOption { name: "Easy".into(), score: 5.0 },
                ],
                default_interval: 1.0,
                default_ease: Some(DEFAULT_EASE),
            }],
            contexts: Vec::new(),
        }
    }
}

impl Settings {
    /// Load settings from the vault, or defaults when no file exists yet.
    pub fn load(vault: &Vault) -> Result<Self> {
        let path = settings_path(vault);
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "settings not found; using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(Error::io(&path, err)),
        };

        let settings: Settings =
            toml::from_str(&text).map_err(|e| Error::SettingsToml(e.to_string()))?;
        settings.validate()?;
        info!(
            path = %path.display(),
            methods = settings.methods.len(),
            contexts = settings.contexts.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Persist the whole settings object back to the vault.
    pub fn save(&self, vault: &Vault) -> Result<()> {
        self.validate()?;
        let path = settings_path(vault);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let text =
            toml::to_string_pretty(self).map_err(|e| Error::SettingsToml(e.to_string()))?;
        std::fs::write(&path, text).map_err(|e| Error::io(&path, e))?;
        info!(path = %path.display(), "settings saved");
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.methods.is_empty() {
            return Err(Error::NoMethods);
        }
        for (ix, m) in self.methods.iter().enumerate() {
            m.validate()?;
            if self.methods[..ix].iter().any(|other| other.name == m.name) {
                return Err(Error::DuplicateMethod(m.name.clone()));
            }
        }
        for (ix, c) in self.contexts.iter().enumerate() {
            if c.name.trim().is_empty() {
                return Err(Error::InvalidContext {
                    context: c.name.clone(),
                    reason: "name is empty".to_string(),
                });
            }
            if self.contexts[..ix].iter().any(|other| other.name == c.name) {
                return Err(Error::DuplicateContext(c.name.clone()));
            }
        }
        Ok(())
    }

    pub fn method(&self, name: &str) -> Option<&SpacingMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// The universal fallback: the first registered method.
    pub fn first_method(&self) -> Result<&SpacingMethod> {
        self.methods.first().ok_or(Error::NoMethods)
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    pub fn active_context_names(&self) -> Vec<&str> {
        self.contexts
            .iter()
            .filter(|c| c.active)
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn add_method(&mut self, method: SpacingMethod) -> Result<()> {
        method.validate()?;
        if self.method(&method.name).is_some() {
            return Err(Error::DuplicateMethod(method.name));
        }
        self.methods.push(method);
        Ok(())
    }

    /// Rename a method, cascading into any context bound to it by name.
    pub fn rename_method(&mut self, from: &str, to: &str) -> Result<()> {
        if self.method(to).is_some() {
            return Err(Error::DuplicateMethod(to.to_string()));
        }
        let Some(method) = self.methods.iter_mut().find(|m| m.name == from) else {
            return Err(Error::UnknownMethod(from.to_string()));
        };
        method.name = to.to_string();
        for ctx in &mut self.contexts {
            if ctx.method.as_deref() == Some(from) {
                ctx.method = Some(to.to_string());
            }
        }
        Ok(())
    }

    /// Delete a method. The last remaining method cannot be deleted; bindings
    /// of contexts that pointed at it are cleared.
    pub fn remove_method(&mut self, name: &str) -> Result<()> {
        let Some(ix) = self.methods.iter().position(|m| m.name == name) else {
            return Err(Error::UnknownMethod(name.to_string()));
        };
        if self.methods.len() == 1 {
            return Err(Error::LastMethod(name.to_string()));
        }
        self.methods.remove(ix);
        for ctx in &mut self.contexts {
            if ctx.method.as_deref() == Some(name) {
                ctx.method = None;
            }
        }
        Ok(())
    }

    pub fn add_context(&mut self, context: Context) -> Result<()> {
        if self.context(&context.name).is_some() {
            return Err(Error::DuplicateContext(context.name));
        }
        if let Some(method) = &context.method {
            if self.method(method).is_none() {
                return Err(Error::UnknownMethod(method.clone()));
            }
        }
        self.contexts.push(context);
        Ok(())
    }

    pub fn remove_context(&mut self, name: &str) -> Result<()> {
        let Some(ix) = self.contexts.iter().position(|c| c.name == name) else {
            return Err(Error::UnknownContext(name.to_string()));
        };
        self.contexts.remove(ix);
        Ok(())
    }

    pub fn set_context_active(&mut self, name: &str, active: bool) -> Result<()> {
        let Some(ctx) = self.contexts.iter_mut().find(|c| c.name == name) else {
            return Err(Error::UnknownContext(name.to_string()));
        };
        ctx.active = active;
        Ok(())
    }

    /// Bind (or with `None`, unbind) a context's spacing method.
    pub fn bind_context(&mut self, name: &str, method: Option<String>) -> Result<()> {
        if let Some(m) = &method {
            if self.method(m).is_none() {
                return Err(Error::UnknownMethod(m.clone()));
            }
        }
        let Some(ctx) = self.contexts.iter_mut().find(|c| c.name == name) else {
            return Err(Error::UnknownContext(name.to_string()));
        };
        ctx.method = method;
        Ok(())
    }
}

fn settings_path(vault: &Vault) -> PathBuf {
    vault.root().join(&vault.config().settings_path)
}
