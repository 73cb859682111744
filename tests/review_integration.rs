use chrono::{TimeZone, Utc};
use resurface::{
    AlgorithmSet, Context, FieldValue, FileStore, NoteStore, OnboardOutcome, RemoveOutcome,
    ReviewPrompter, Scheduler, Selection, Settings, SpacingMethod, Vault, ZoneMode,
};

struct Scripted {
    contexts: Selection<Vec<String>>,
    method: Selection<String>,
    option: Selection<String>,
}

impl Scripted {
    fn picking_option(option: &str) -> Self {
        Self {
            contexts: Selection::Picked(Vec::new()),
            method: Selection::Cancelled,
            option: Selection::Picked(option.to_string()),
        }
    }
}

impl ReviewPrompter for Scripted {
    fn pick_contexts(&mut self, _registered: &[Context]) -> Selection<Vec<String>> {
        self.contexts.clone()
    }

    fn pick_method(&mut self, _methods: &[SpacingMethod]) -> Selection<String> {
        self.method.clone()
    }

    fn pick_review_option(&mut self, _method: &SpacingMethod) -> Selection<String> {
        self.option.clone()
    }
}

fn setup_vault(notes: &[(&str, &str)]) -> (tempfile::TempDir, Vault) {
    let temp = tempfile::tempdir().unwrap();
    let root = temp.path().join("vault");
    std::fs::create_dir_all(&root).unwrap();
    for (rel, content) in notes {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    let vault = Vault::open(&root).unwrap();
    (temp, vault)
}

#[test]
fn onboard_review_remove_round_trip() -> anyhow::Result<()> {
    let (_temp, vault) = setup_vault(&[(
        "notes/essay.md",
        "---\ntitle: Essay\n---\n\n# Essay\nDraft body.\n",
    )]);
    let settings = Settings::default();
    let algorithms = AlgorithmSet::builtin();
    let path = vault.to_rel(std::path::Path::new("notes/essay.md"))?;
    let mut store = FileStore::new(vault.clone());
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);

    // Onboard with one context.
    let mut prompter = Scripted {
        contexts: Selection::Picked(vec!["drafts".to_string()]),
        method: Selection::Cancelled,
        option: Selection::Cancelled,
    };
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let outcome = scheduler.onboard(&path, &mut prompter, t0)?;
    assert!(matches!(outcome, OnboardOutcome::Onboarded { .. }));

    let fields = store.fields(&path)?;
    assert_eq!(fields.get("interval"), Some(&FieldValue::Number(1.0)));
    assert_eq!(fields.get("ease"), Some(&FieldValue::Number(2.5)));
    assert_eq!(
        fields.get("last-reviewed"),
        Some(&FieldValue::String("2024-03-01T12:00:00Z".into()))
    );
    assert_eq!(
        fields.get("method"),
        Some(&FieldValue::String("default".into()))
    );
    assert_eq!(
        fields.get("contexts"),
        Some(&FieldValue::List(vec![FieldValue::String("drafts".into())]))
    );
    assert_eq!(fields.get("title"), Some(&FieldValue::String("Essay".into())));

    // Second onboard is a no-op.
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);
    let outcome = scheduler.onboard(&path, &mut prompter, t0)?;
    assert_eq!(outcome, OnboardOutcome::AlreadyOnboarded);

    // A strong review grows the interval by the new ease, exactly.
    let t1 = Utc.with_ymd_and_hms(2024, 3, 3, 9, 30, 0).unwrap();
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);
    scheduler.review(&path, &mut Scripted::picking_option("Easy"), t1)?;

    let fields = store.fields(&path)?;
    assert_eq!(fields.get("interval"), Some(&FieldValue::Number(2.6)));
    assert_eq!(fields.get("ease"), Some(&FieldValue::Number(2.6)));
    assert_eq!(
        fields.get("last-reviewed"),
        Some(&FieldValue::String("2024-03-03T09:30:00Z".into()))
    );

    // A weak review drops the ease and resets the interval to one day.
    let t2 = Utc.with_ymd_and_hms(2024, 3, 6, 9, 30, 0).unwrap();
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);
    scheduler.review(&path, &mut Scripted::picking_option("Hard"), t2)?;

    let fields = store.fields(&path)?;
    assert_eq!(fields.get("interval"), Some(&FieldValue::Number(1.0)));
    assert_eq!(fields.get("ease"), Some(&FieldValue::Number(2.28)));

    // Removal clears every scheduling key, method included, and keeps the
    // rest of the note intact.
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);
    let outcome = scheduler.remove(&path)?;
    assert_eq!(outcome, RemoveOutcome::Removed);

    let fields = store.fields(&path)?;
    for key in ["interval", "ease", "last-reviewed", "method", "contexts"] {
        assert!(fields.get(key).is_none(), "{key} should be gone");
    }
    assert_eq!(fields.get("title"), Some(&FieldValue::String("Essay".into())));

    let content = std::fs::read_to_string(vault.to_abs(&path))?;
    assert!(content.contains("# Essay\nDraft body.\n"));

    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);
    assert_eq!(scheduler.remove(&path)?, RemoveOutcome::NotOnboarded);
    Ok(())
}

#[test]
fn cancelled_onboarding_leaves_the_file_untouched() -> anyhow::Result<()> {
    let original = "---\ntitle: Essay\n---\nbody\n";
    let (_temp, vault) = setup_vault(&[("essay.md", original)]);
    let settings = Settings::default();
    let algorithms = AlgorithmSet::builtin();
    let path = vault.to_rel(std::path::Path::new("essay.md"))?;
    let mut store = FileStore::new(vault.clone());
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);

    let mut prompter = Scripted {
        contexts: Selection::Cancelled,
        method: Selection::Cancelled,
        option: Selection::Cancelled,
    };
    let outcome = scheduler.onboard(&path, &mut prompter, Utc::now())?;
    assert_eq!(outcome, OnboardOutcome::Cancelled);

    assert_eq!(std::fs::read_to_string(vault.to_abs(&path))?, original);
    Ok(())
}

#[test]
fn onboarding_with_several_methods_requires_an_explicit_choice() -> anyhow::Result<()> {
    let (_temp, vault) = setup_vault(&[("essay.md", "body only\n")]);
    let mut settings = Settings::default();
    settings.add_method(SpacingMethod {
        name: "writing".into(),
        algorithm: resurface::Algorithm::SuperMemo2,
        review_options: Settings::default().methods[0].review_options.clone(),
        default_interval: 3.0,
        default_ease: Some(2.5),
    })?;
    let algorithms = AlgorithmSet::builtin();
    let path = vault.to_rel(std::path::Path::new("essay.md"))?;
    let mut store = FileStore::new(vault.clone());

    // Cancelling the method prompt aborts with zero mutation.
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);
    let mut prompter = Scripted {
        contexts: Selection::Picked(Vec::new()),
        method: Selection::Cancelled,
        option: Selection::Cancelled,
    };
    let outcome = scheduler.onboard(&path, &mut prompter, Utc::now())?;
    assert_eq!(outcome, OnboardOutcome::Cancelled);
    assert_eq!(std::fs::read_to_string(vault.to_abs(&path))?, "body only\n");

    // Picking the second method uses its defaults.
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);
    let mut prompter = Scripted {
        contexts: Selection::Picked(Vec::new()),
        method: Selection::Picked("writing".to_string()),
        option: Selection::Cancelled,
    };
    let outcome = scheduler.onboard(&path, &mut prompter, Utc::now())?;
    let OnboardOutcome::Onboarded {
        method, interval, ..
    } = outcome
    else {
        panic!("expected onboarding to complete");
    };
    assert_eq!(method, "writing");
    assert_eq!(interval, 3.0);

    let fields = store.fields(&path)?;
    assert_eq!(
        fields.get("method"),
        Some(&FieldValue::String("writing".into()))
    );
    Ok(())
}

#[test]
fn reviewing_an_unonboarded_note_is_refused() -> anyhow::Result<()> {
    let (_temp, vault) = setup_vault(&[("essay.md", "---\ntitle: Essay\n---\n")]);
    let settings = Settings::default();
    let algorithms = AlgorithmSet::builtin();
    let path = vault.to_rel(std::path::Path::new("essay.md"))?;
    let mut store = FileStore::new(vault.clone());
    let mut scheduler = Scheduler::new(&settings, &algorithms, &mut store, ZoneMode::Utc);

    let outcome = scheduler.review(&path, &mut Scripted::picking_option("Easy"), Utc::now())?;
    assert_eq!(outcome, resurface::ReviewOutcome::NotOnboarded);
    Ok(())
}
