mod common;

use std::collections::BTreeSet;
use std::fs;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{write_extension, write_manifest, Harness};
use powi_bot::application::errors::{error_chain, LifecycleError};
use powi_bot::domain::entities::{ExtensionState, ExtensionStatus, FailureKind, Operation};
use powi_bot::domain::traits::HostRuntime;
use powi_bot::extensions::{Candidate, Discovery, Validator, DEFAULT_ENTRY_FILE};

#[tokio::test]
async fn load_marks_extension_loaded() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    h.manager.start(false).await.unwrap();

    h.manager.load("alpha").await.unwrap();

    let snapshot = h.manager.snapshot().await;
    assert!(snapshot.loaded.contains("alpha"));
    assert!(!snapshot.unloaded.contains("alpha"));
    assert!(h.has_command("alpha").await);
}

#[tokio::test]
async fn load_then_unload_is_unloaded() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    h.manager.start(false).await.unwrap();

    h.manager.load("alpha").await.unwrap();
    h.manager.unload("alpha").await.unwrap();

    let snapshot = h.manager.snapshot().await;
    assert!(snapshot.unloaded.contains("alpha"));
    assert!(!snapshot.loaded.contains("alpha"));
    assert!(!h.has_command("alpha").await);
    assert_eq!(h.runtime.listener_count("alpha").await, 0);
}

#[tokio::test]
async fn reload_of_healthy_extension_stays_loaded() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    h.manager.start(true).await.unwrap();

    h.manager.reload("alpha").await.unwrap();

    assert!(h.manager.snapshot().await.loaded.contains("alpha"));
    assert!(h.has_command("alpha").await);
}

#[tokio::test]
async fn failing_entry_point_is_failed_with_cause() {
    let h = Harness::new();
    write_extension(h.path(), "failing", "failing");
    h.manager.start(false).await.unwrap();

    let error = h.manager.load("failing").await.unwrap_err();
    assert!(matches!(error, LifecycleError::Activation { .. }));
    assert!(error_chain(&error).contains("missing API key"));

    let snapshot = h.manager.snapshot().await;
    assert!(!snapshot.loaded.contains("failing"));
    let reason = &snapshot.failed["failing"];
    assert_eq!(reason.kind, FailureKind::Error);
    assert!(reason.message.contains("could not connect"));
    assert!(!h.has_command("never").await);
}

#[tokio::test]
async fn discovery_returns_only_plausible_candidates() {
    let root = tempfile::tempdir().unwrap();
    for name in ["alpha", "beta", "gamma"] {
        write_extension(root.path(), name, name);
    }
    fs::write(root.path().join("README.md"), "not an extension").unwrap();
    fs::create_dir_all(root.path().join("assets")).unwrap();
    write_extension(root.path(), ".hidden", "alpha");
    write_extension(root.path(), "__pycache__", "alpha");

    let names = Discovery::new(root.path(), DEFAULT_ENTRY_FILE).list_candidates().unwrap();

    let expected: BTreeSet<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn invalid_candidate_is_tracked_separately() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    // No module and no library: nothing to activate
    write_manifest(h.path(), "beta", "description: half finished\n");

    let snapshot = h.manager.start(true).await.unwrap();

    assert_eq!(snapshot.loaded, BTreeSet::from(["alpha".to_string()]));
    assert!(snapshot.invalid.contains_key("beta"));
    assert!(!snapshot.unloaded.contains("beta"));
    assert!(!snapshot.failed.contains_key("beta"));
}

#[tokio::test]
async fn unload_of_unknown_name_changes_nothing() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    h.manager.start(true).await.unwrap();
    let before = h.manager.snapshot().await;

    let error = h.manager.unload("ghost").await.unwrap_err();

    assert!(matches!(error, LifecycleError::NotFound(ref name) if name == "ghost"));
    assert_eq!(h.manager.snapshot().await, before);
}

#[tokio::test]
async fn reload_after_breaking_edit_is_failed() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    h.manager.start(true).await.unwrap();

    write_extension(h.path(), "alpha", "failing");
    let error = h.manager.reload("alpha").await.unwrap_err();

    assert!(matches!(error, LifecycleError::Activation { .. }));
    let descriptor = h.manager.descriptor("alpha").await.unwrap();
    assert_eq!(descriptor.status(), ExtensionStatus::Failed);
    assert!(!h.has_command("alpha").await);
    assert!(h.runtime.list_active().await.is_empty());
}

#[tokio::test]
async fn slow_activation_times_out_as_failed() {
    let h = Harness::with_timeout(Duration::from_millis(100));
    write_extension(h.path(), "slow", "slow");
    h.manager.start(false).await.unwrap();

    let error = h.manager.load("slow").await.unwrap_err();

    assert!(matches!(error, LifecycleError::Timeout { .. }));
    match h.manager.descriptor("slow").await.unwrap().state {
        ExtensionState::Failed(reason) => assert_eq!(reason.kind, FailureKind::Timeout),
        other => panic!("unexpected state {:?}", other),
    }
    assert!(h.runtime.list_active().await.is_empty());
}

#[tokio::test]
async fn concurrent_loads_of_one_name_are_serialized() {
    let h = Harness::new();
    write_extension(h.path(), "counting", "counting");
    h.manager.start(false).await.unwrap();

    let (first, second) = tokio::join!(h.manager.load("counting"), h.manager.load("counting"));

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(LifecycleError::AlreadyInState {
            state: ExtensionStatus::Loaded,
            operation: Operation::Load,
            ..
        })
    )));
    assert_eq!(h.activations.load(Ordering::SeqCst), 1);
    assert!(h.manager.snapshot().await.loaded.contains("counting"));
}

#[tokio::test]
async fn command_conflict_only_fails_the_newcomer() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    write_extension(h.path(), "alpha_copy", "alpha");
    h.manager.start(false).await.unwrap();

    h.manager.load("alpha").await.unwrap();
    let error = h.manager.load("alpha_copy").await.unwrap_err();

    assert!(error_chain(&error).contains("already registered by 'alpha'"));
    let snapshot = h.manager.snapshot().await;
    assert!(snapshot.loaded.contains("alpha"));
    assert!(snapshot.failed.contains_key("alpha_copy"));
    assert!(h.has_command("alpha").await);
}

#[tokio::test]
async fn missing_root_is_an_enumeration_error() {
    let h = Harness::new();
    let missing = h.path().join("nowhere");
    let runtime = h.runtime.clone();
    let manager = powi_bot::LifecycleManager::new(
        Discovery::new(&missing, DEFAULT_ENTRY_FILE),
        runtime,
        Duration::from_secs(1),
    );

    assert!(matches!(manager.start(true).await, Err(LifecycleError::Enumeration { .. })));
    assert!(matches!(manager.load("alpha").await, Err(LifecycleError::Enumeration { .. })));
}

#[tokio::test]
async fn fixed_invalid_extension_can_be_loaded() {
    let h = Harness::new();
    write_extension(h.path(), "gamma", "no_such_module");
    h.manager.start(true).await.unwrap();
    assert!(h.manager.snapshot().await.invalid.contains_key("gamma"));

    // Still broken: stays invalid
    assert!(matches!(
        h.manager.load("gamma").await,
        Err(LifecycleError::Validation { .. })
    ));
    assert!(h.manager.snapshot().await.invalid.contains_key("gamma"));

    write_extension(h.path(), "gamma", "gamma");
    h.manager.load("gamma").await.unwrap();
    assert!(h.manager.snapshot().await.loaded.contains("gamma"));
}

#[tokio::test]
async fn snapshot_picks_up_new_directories() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    h.manager.start(true).await.unwrap();

    write_extension(h.path(), "gamma", "gamma");
    let snapshot = h.manager.snapshot().await;

    assert!(snapshot.unloaded.contains("gamma"));
    h.manager.load("gamma").await.unwrap();
    assert!(h.manager.verify_runtime().await);
}

#[tokio::test]
async fn failed_extension_can_be_loaded_after_fix() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "failing");
    let snapshot = h.manager.start(true).await.unwrap();
    assert!(snapshot.failed.contains_key("alpha"));

    write_extension(h.path(), "alpha", "alpha");
    h.manager.load("alpha").await.unwrap();

    assert!(h.manager.snapshot().await.loaded.contains("alpha"));
}

#[tokio::test]
async fn validator_reports_without_raising() {
    let h = Harness::new();
    write_extension(h.path(), "alpha", "alpha");
    write_manifest(h.path(), "broken", "module: [not, a, string]\n");
    write_extension(h.path(), "bad-name", "alpha");

    let validator = Validator::new(h.runtime.clone());
    let candidate = |name: &str| Candidate {
        name: name.to_string(),
        dir: h.path().join(name),
        entry: h.path().join(name).join(DEFAULT_ENTRY_FILE),
    };

    assert!(validator.validate(&candidate("alpha")).await);
    assert!(!validator.validate(&candidate("broken")).await);
    assert!(!validator.validate(&candidate("bad-name")).await);
    assert!(h.runtime.list_active().await.is_empty());
}

#[tokio::test]
async fn load_after_unload_runs_edited_code() {
    let h = Harness::new();
    write_extension(h.path(), "swap", "alpha");
    h.manager.start(true).await.unwrap();
    h.manager.unload("swap").await.unwrap();

    write_extension(h.path(), "swap", "failing");
    let error = h.manager.load("swap").await.unwrap_err();

    assert!(matches!(error, LifecycleError::Activation { .. }));
    assert!(error_chain(&error).contains("missing API key"));
    assert!(!h.has_command("alpha").await);
    assert!(h.manager.snapshot().await.failed.contains_key("swap"));
}

#[tokio::test]
async fn load_after_validation_only_start_runs_edited_code() {
    let h = Harness::new();
    write_extension(h.path(), "swap", "alpha");
    let snapshot = h.manager.start(false).await.unwrap();
    assert!(snapshot.unloaded.contains("swap"));

    write_extension(h.path(), "swap", "failing");
    let error = h.manager.load("swap").await.unwrap_err();

    assert!(error_chain(&error).contains("missing API key"));
    assert!(!h.has_command("alpha").await);
    assert!(h.runtime.list_active().await.is_empty());
}

#[tokio::test]
async fn edit_to_unknown_module_before_load_is_invalid() {
    let h = Harness::new();
    write_extension(h.path(), "swap", "alpha");
    h.manager.start(false).await.unwrap();

    write_extension(h.path(), "swap", "no_such_module");
    let error = h.manager.load("swap").await.unwrap_err();

    assert!(matches!(error, LifecycleError::Validation { .. }));
    assert!(h.manager.snapshot().await.invalid.contains_key("swap"));
    assert!(!h.has_command("alpha").await);
}

#[tokio::test]
async fn reload_that_times_out_is_failed() {
    let h = Harness::with_timeout(Duration::from_millis(100));
    write_extension(h.path(), "alpha", "alpha");
    h.manager.start(true).await.unwrap();

    write_extension(h.path(), "alpha", "slow");
    let error = h.manager.reload("alpha").await.unwrap_err();

    assert!(matches!(
        error,
        LifecycleError::Timeout {
            operation: Operation::Reload,
            ..
        }
    ));
    match h.manager.descriptor("alpha").await.unwrap().state {
        ExtensionState::Failed(reason) => assert_eq!(reason.kind, FailureKind::Timeout),
        other => panic!("unexpected state {:?}", other),
    }
    assert!(h.runtime.list_active().await.is_empty());
    assert!(!h.has_command("alpha").await);
}
