use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use resurface::{
    build_queue, AlgorithmSet, Context, Corpus, FileStore, MethodChoice, OnboardOutcome,
    QueueOutcome, RemoveOutcome, ReviewOption, ReviewOutcome, ReviewPrompter, Scheduler,
    Selection, Settings, SpacingMethod, Vault,
};

#[derive(Debug, Parser)]
#[command(
    name = "resurface",
    version,
    about = "Spaced-repetition scheduling for vault notes"
)]
struct Cli {
    /// Path to the note vault.
    #[arg(long, env = "RESURFACE_VAULT", global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the most overdue note.
    Next,
    /// List due notes, most overdue first.
    Due {
        /// How many entries to print.
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Register a note with the scheduler.
    Onboard {
        note: PathBuf,
        /// Comma-separated context names; pass "" for none.
        #[arg(long)]
        contexts: Option<String>,
        /// Spacing method name; prompts when several are registered.
        #[arg(long)]
        method: Option<String>,
    },
    /// Record a review outcome for a note.
    Review {
        note: PathBuf,
        /// Review option name; prompts when omitted.
        #[arg(long)]
        option: Option<String>,
    },
    /// Take a note back out of the scheduler.
    Remove { note: PathBuf },
    /// Show a note's scheduling state.
    Status { note: PathBuf },
    /// Manage spacing methods.
    Methods {
        #[command(subcommand)]
        command: MethodsCommand,
    },
    /// Manage contexts.
    Contexts {
        #[command(subcommand)]
        command: ContextsCommand,
    },
}

#[derive(Debug, Subcommand)]
enum MethodsCommand {
    /// List registered spacing methods.
    List,
    /// Add a spacing method.
    Add {
        name: String,
        /// Default interval in days.
        #[arg(long, default_value_t = 1.0)]
        interval: f64,
        /// Default ease factor (SM-2 only).
        #[arg(long)]
        ease: Option<f64>,
        /// Review options as "Name=score,Name=score"; defaults to the
        /// built-in set.
        #[arg(long)]
        options: Option<String>,
        /// Algorithm selector: "sm2" or "custom:<name>".
        #[arg(long, default_value = "sm2")]
        algorithm: String,
    },
    /// Rename a method, cascading into context bindings.
    Rename { from: String, to: String },
    /// Delete a method (the last one cannot be deleted).
    Delete { name: String },
}

#[derive(Debug, Subcommand)]
enum ContextsCommand {
    /// List registered contexts.
    List,
    /// Add a context (active unless --inactive).
    Add {
        name: String,
        /// Spacing method to bind.
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        inactive: bool,
    },
    /// Mark a context active.
    Activate { name: String },
    /// Mark a context inactive.
    Deactivate { name: String },
    /// Bind a context to a spacing method.
    Bind { name: String, method: String },
    /// Remove a context's method binding.
    Unbind { name: String },
    /// Delete a context.
    Delete { name: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let vault = open_vault(cli.vault)?;

    match cli.command {
        Command::Next => handle_next(&vault)?,
        Command::Due { limit } => handle_due(&vault, limit)?,
        Command::Onboard {
            note,
            contexts,
            method,
        } => handle_onboard(&vault, &note, contexts, method)?,
        Command::Review { note, option } => handle_review(&vault, &note, option)?,
        Command::Remove { note } => handle_remove(&vault, &note)?,
        Command::Status { note } => handle_status(&vault, &note)?,
        Command::Methods { command } => handle_methods(&vault, command)?,
        Command::Contexts { command } => handle_contexts(&vault, command)?,
    }

    Ok(())
}

fn open_vault(path: Option<PathBuf>) -> anyhow::Result<Vault> {
    let Some(path) = path else {
        anyhow::bail!("no vault given; pass --vault or set RESURFACE_VAULT");
    };
    Ok(Vault::open(path)?)
}

fn handle_next(vault: &Vault) -> anyhow::Result<()> {
    let settings = Settings::load(vault)?;
    let corpus = Corpus::scan(vault)?;
    let zone = vault.config().bare_timestamp_zone;

    match build_queue(&corpus, &settings, zone, Utc::now().timestamp_millis()) {
        QueueOutcome::NoActiveContexts => {
            println!("no active contexts; activate one with `rsf contexts activate <name>`");
        }
        QueueOutcome::Queue(entries) => match entries.first() {
            None => println!("nothing due"),
            Some(head) => {
                println!(
                    "next: {} (due since {})",
                    head.path.as_str_lossy(),
                    format_ms(head.due_at_ms)
                );
            }
        },
    }
    Ok(())
}

fn handle_due(vault: &Vault, limit: Option<usize>) -> anyhow::Result<()> {
    let settings = Settings::load(vault)?;
    let corpus = Corpus::scan(vault)?;
    let zone = vault.config().bare_timestamp_zone;

    match build_queue(&corpus, &settings, zone, Utc::now().timestamp_millis()) {
        QueueOutcome::NoActiveContexts => {
            println!("no active contexts; activate one with `rsf contexts activate <name>`");
        }
        QueueOutcome::Queue(entries) => {
            if entries.is_empty() {
                println!("nothing due");
                return Ok(());
            }
            let shown = limit.unwrap_or(entries.len());
            for entry in entries.iter().take(shown) {
                println!(
                    "{}\tdue since {}",
                    entry.path.as_str_lossy(),
                    format_ms(entry.due_at_ms)
                );
            }
            if entries.len() > shown {
                println!("... and {} more", entries.len() - shown);
            }
        }
    }
    Ok(())
}

fn handle_onboard(
    vault: &Vault,
    note: &std::path::Path,
    contexts: Option<String>,
    method: Option<String>,
) -> anyhow::Result<()> {
    let settings = Settings::load(vault)?;
    let algorithms = AlgorithmSet::builtin();
    let zone = vault.config().bare_timestamp_zone;
    let path = vault.to_rel(note)?;
    let mut store = FileStore::new(vault.clone());
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, zone);
    let mut prompter = TermPrompter {
        preset_contexts: contexts.map(|s| split_names(&s)),
        preset_method: method,
        preset_option: None,
    };

    match scheduler.onboard(&path, &mut prompter, Utc::now())? {
        OnboardOutcome::Onboarded {
            method,
            interval,
            contexts,
            ..
        } => {
            if contexts.is_empty() {
                println!(
                    "onboarded {} with method '{method}', interval {interval}",
                    path.as_str_lossy()
                );
            } else {
                println!(
                    "onboarded {} with method '{method}', interval {interval}, contexts {}",
                    path.as_str_lossy(),
                    contexts.join(", ")
                );
            }
        }
        OnboardOutcome::AlreadyOnboarded => {
            println!("{} is already onboarded", path.as_str_lossy());
        }
        OnboardOutcome::Cancelled => println!("onboarding cancelled; nothing changed"),
    }
    Ok(())
}

fn handle_review(
    vault: &Vault,
    note: &std::path::Path,
    option: Option<String>,
) -> anyhow::Result<()> {
    let settings = Settings::load(vault)?;
    let algorithms = AlgorithmSet::builtin();
    let zone = vault.config().bare_timestamp_zone;
    let path = vault.to_rel(note)?;
    let mut store = FileStore::new(vault.clone());
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, zone);
    let mut prompter = TermPrompter {
        preset_contexts: None,
        preset_method: None,
        preset_option: option,
    };

    match scheduler.review(&path, &mut prompter, Utc::now())? {
        ReviewOutcome::Reviewed {
            option,
            prior,
            next,
            method_notice,
            ..
        } => {
            if let Some(notice) = method_notice {
                println!("{notice}");
            }
            println!(
                "reviewed as '{option}': interval updated from {} to {} (ease {})",
                prior.interval, next.interval, next.ease
            );
        }
        ReviewOutcome::NotOnboarded => {
            println!(
                "{} is not onboarded; run `rsf onboard {}` first",
                path.as_str_lossy(),
                path.as_str_lossy()
            );
        }
        ReviewOutcome::Cancelled => println!("review cancelled; nothing changed"),
    }
    Ok(())
}

fn handle_remove(vault: &Vault, note: &std::path::Path) -> anyhow::Result<()> {
    let settings = Settings::load(vault)?;
    let algorithms = AlgorithmSet::builtin();
    let zone = vault.config().bare_timestamp_zone;
    let path = vault.to_rel(note)?;
    let mut store = FileStore::new(vault.clone());
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, zone);

    match scheduler.remove(&path)? {
        RemoveOutcome::Removed => {
            println!("removed {} from scheduling", path.as_str_lossy());
        }
        RemoveOutcome::NotOnboarded => {
            println!("{} is not onboarded", path.as_str_lossy());
        }
    }
    Ok(())
}

fn handle_status(vault: &Vault, note: &std::path::Path) -> anyhow::Result<()> {
    let settings = Settings::load(vault)?;
    let algorithms = AlgorithmSet::builtin();
    let zone = vault.config().bare_timestamp_zone;
    let path = vault.to_rel(note)?;
    let mut store = FileStore::new(vault.clone());
    let scheduler = Scheduler::new(&settings, &algorithms, &mut store, zone);

    let status = scheduler.status(&path, Utc::now())?;
    println!("note: {}", path.as_str_lossy());
    if !status.scheduling.onboarded() {
        println!("  not onboarded");
    }
    if let Some(interval) = status.scheduling.interval {
        println!("  interval: {interval}");
    }
    if let Some(ease) = status.scheduling.ease {
        println!("  ease: {ease}");
    }
    if let Some(last) = &status.scheduling.last_reviewed {
        println!("  last-reviewed: {last}");
    }
    if !status.scheduling.contexts.is_empty() {
        println!("  contexts: {}", status.scheduling.contexts.join(", "));
    }
    let inferred = if status.choice == MethodChoice::Stored {
        ""
    } else {
        " (inferred)"
    };
    println!("  method: {}{}", status.method, inferred);
    if let Some(due) = status.due_at_ms {
        let when = format_ms(due);
        if status.due_now {
            println!("  due since {when}");
        } else {
            println!("  due at {when}");
        }
    }
    Ok(())
}

fn handle_methods(vault: &Vault, command: MethodsCommand) -> anyhow::Result<()> {
    let mut settings = Settings::load(vault)?;
    match command {
        MethodsCommand::List => {
            for m in &settings.methods {
                let algorithm: String = m.algorithm.clone().into();
                let options: Vec<String> = m
                    .review_options
                    .iter()
                    .map(|o| format!("{}={}", o.name, o.score))
                    .collect();
                println!(
                    "{}\t{}\tinterval {}\toptions [{}]",
                    m.name,
                    algorithm,
                    m.default_interval,
                    options.join(", ")
                );
            }
        }
        MethodsCommand::Add {
            name,
            interval,
            ease,
            options,
            algorithm,
        } => {
            let review_options = match options {
                Some(raw) => parse_options(&raw)?,
                None => Settings::default().methods[0].review_options.clone(),
            };
            settings.add_method(SpacingMethod {
                name: name.clone(),
                algorithm: algorithm.into(),
                review_options,
                default_interval: interval,
                default_ease: ease,
            })?;
            settings.save(vault)?;
            println!("added method '{name}'");
        }
        MethodsCommand::Rename { from, to } => {
            settings.rename_method(&from, &to)?;
            settings.save(vault)?;
            println!("renamed method '{from}' to '{to}'");
        }
        MethodsCommand::Delete { name } => {
            settings.remove_method(&name)?;
            settings.save(vault)?;
            println!("deleted method '{name}'");
        }
    }
    Ok(())
}

fn handle_contexts(vault: &Vault, command: ContextsCommand) -> anyhow::Result<()> {
    let mut settings = Settings::load(vault)?;
    match command {
        ContextsCommand::List => {
            for c in &settings.contexts {
                let state = if c.active { "active" } else { "inactive" };
                match &c.method {
                    Some(m) => println!("{}\t{}\tmethod {}", c.name, state, m),
                    None => println!("{}\t{}", c.name, state),
                }
            }
        }
        ContextsCommand::Add {
            name,
            method,
            inactive,
        } => {
            settings.add_context(Context {
                name: name.clone(),
                active: !inactive,
                method,
            })?;
            settings.save(vault)?;
            println!("added context '{name}'");
        }
        ContextsCommand::Activate { name } => {
            settings.set_context_active(&name, true)?;
            settings.save(vault)?;
            println!("activated context '{name}'");
        }
        ContextsCommand::Deactivate { name } => {
            settings.set_context_active(&name, false)?;
            settings.save(vault)?;
            println!("deactivated context '{name}'");
        }
        ContextsCommand::Bind { name, method } => {
            settings.bind_context(&name, Some(method.clone()))?;
            settings.save(vault)?;
            println!("bound context '{name}' to method '{method}'");
        }
        ContextsCommand::Unbind { name } => {
            settings.bind_context(&name, None)?;
            settings.save(vault)?;
            println!("unbound context '{name}'");
        }
        ContextsCommand::Delete { name } => {
            settings.remove_context(&name)?;
            settings.save(vault)?;
            println!("deleted context '{name}'");
        }
    }
    Ok(())
}

/// Prompter over presets from flags, falling back to stdin. An empty line
/// is an empty-but-valid selection where one is legal; EOF cancels.
struct TermPrompter {
    preset_contexts: Option<Vec<String>>,
    preset_method: Option<String>,
    preset_option: Option<String>,
}

impl ReviewPrompter for TermPrompter {
    fn pick_contexts(&mut self, registered: &[Context]) -> Selection<Vec<String>> {
        if let Some(preset) = self.preset_contexts.take() {
            return Selection::Picked(preset);
        }
        if !std::io::stdin().is_terminal() {
            return Selection::Picked(Vec::new());
        }
        if registered.is_empty() {
            println!("no contexts registered yet; enter names to tag the note anyway");
        } else {
            let names: Vec<&str> = registered.iter().map(|c| c.name.as_str()).collect();
            println!("registered contexts: {}", names.join(", "));
        }
        println!("contexts (comma separated, empty for none, ctrl-d cancels):");
        match read_line() {
            Some(line) => Selection::Picked(split_names(&line)),
            None => Selection::Cancelled,
        }
    }

    fn pick_method(&mut self, methods: &[SpacingMethod]) -> Selection<String> {
        if let Some(preset) = self.preset_method.take() {
            return Selection::Picked(preset);
        }
        if !std::io::stdin().is_terminal() {
            return Selection::Cancelled;
        }
        println!("spacing methods:");
        for (ix, m) in methods.iter().enumerate() {
            println!("  {}. {}", ix + 1, m.name);
        }
        println!("method (number or name, ctrl-d cancels):");
        match read_line() {
            Some(line) => pick_by_number_or_name(&line, methods, |m| &m.name),
            None => Selection::Cancelled,
        }
    }

    fn pick_review_option(&mut self, method: &SpacingMethod) -> Selection<String> {
        if let Some(preset) = self.preset_option.take() {
            return Selection::Picked(preset);
        }
        if !std::io::stdin().is_terminal() {
            return Selection::Cancelled;
        }
        println!("review options for '{}':", method.name);
        for (ix, o) in method.review_options.iter().enumerate() {
            println!("  {}. {} ({})", ix + 1, o.name, o.score);
        }
        println!("outcome (number or name, ctrl-d cancels):");
        match read_line() {
            Some(line) => pick_by_number_or_name(&line, &method.review_options, |o| &o.name),
            None => Selection::Cancelled,
        }
    }
}

fn read_line() -> Option<String> {
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim().to_string()),
    }
}

fn pick_by_number_or_name<T>(
    input: &str,
    items: &[T],
    name: impl Fn(&T) -> &str,
) -> Selection<String> {
    let input = input.trim();
    if input.is_empty() {
        return Selection::Cancelled;
    }
    if let Ok(n) = input.parse::<usize>() {
        if let Some(item) = n.checked_sub(1).and_then(|ix| items.get(ix)) {
            return Selection::Picked(name(item).to_string());
        }
    }
    Selection::Picked(input.to_string())
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_options(raw: &str) -> anyhow::Result<Vec<ReviewOption>> {
    let mut out = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((name, score)) = part.split_once('=') else {
            anyhow::bail!("bad review option '{part}', expected Name=score");
        };
        let score: f64 = score
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("bad score in review option '{part}'"))?;
        out.push(ReviewOption {
            name: name.trim().to_string(),
            score,
        });
    }
    if out.is_empty() {
        anyhow::bail!("no review options given");
    }
    Ok(out)
}

fn format_ms(ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        None => format!("{ms}ms"),
    }
}
