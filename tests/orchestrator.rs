mod common;

use common::*;
use tokio_util::sync::CancellationToken;
use vulnrepro::models::{AttemptStatus, Category, VerdictStatus, VulnerabilityReport};

fn reset_report() -> VulnerabilityReport {
    // Broken authentication has no built-in runner, so it goes through generation
    VulnerabilityReport::new("Weak password reset", "Reset tokens can be guessed on /#/forgot-password")
}

#[tokio::test]
async fn test_sqli_runner_bypasses_generation() {
    let tmp = tempfile::tempdir().unwrap();
    let behavior = PageBehavior {
        landing_after_click: Some("http://localhost:3000/#/search".into()),
        ..Default::default()
    };
    let h = harness(tmp.path(), ScriptedLLM::new(vec![SUCCESS_PLAN]), behavior, true);
    let report = VulnerabilityReport::new("SQL Injection", "Login form concatenates the email into a query");

    let verdict = h.orchestrator.run(&report, &CancellationToken::new()).await;

    assert_eq!(verdict.category, Category::SqlInjection);
    assert_eq!(verdict.status, VerdictStatus::Succeeded);
    assert!(verdict.success);
    assert_eq!(verdict.attempts.len(), 1);
    assert!(verdict.evidence.iter().any(|e| e.starts_with("Login bypass successful with: ")));
    assert!(!verdict.screenshots.is_empty());
    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.browser.opened(), 1);
    assert_eq!(h.browser.closed(), 1);
}

#[tokio::test]
async fn test_unknown_category_needs_manual_testing() {
    let tmp = tempfile::tempdir().unwrap();
    let h = harness(tmp.path(), ScriptedLLM::new(vec![SUCCESS_PLAN]), PageBehavior::default(), true);
    let report = VulnerabilityReport::new("Confusing UI", "The footer layout is odd");

    let verdict = h.orchestrator.run(&report, &CancellationToken::new()).await;

    assert_eq!(verdict.category, Category::Unknown);
    assert_eq!(verdict.status, VerdictStatus::ManualTestingRequired);
    assert!(!verdict.success);
    assert!(verdict.attempts.is_empty());
    assert_eq!(h.llm.calls(), 0);
    assert_eq!(h.browser.opened(), 0);
}

#[tokio::test]
async fn test_regenerates_until_markers_present() {
    let tmp = tempfile::tempdir().unwrap();
    let llm = ScriptedLLM::new(vec![NO_EVIDENCE_PLAN, NO_EVIDENCE_PLAN, SUCCESS_PLAN]);
    let h = harness(tmp.path(), llm, PageBehavior::default(), true);

    let verdict = h.orchestrator.run(&reset_report(), &CancellationToken::new()).await;

    assert_eq!(h.llm.calls(), 3);
    assert_eq!(verdict.attempts.len(), 1);
    assert_eq!(verdict.status, VerdictStatus::Succeeded);
    // rejected plans never reach a browser
    assert_eq!(h.browser.opened(), 1);
}

#[tokio::test]
async fn test_generation_budget_spent_is_error_attempt() {
    let tmp = tempfile::tempdir().unwrap();
    let h = harness(tmp.path(), ScriptedLLM::new(vec![NO_EVIDENCE_PLAN]), PageBehavior::default(), true);

    let verdict = h.orchestrator.run(&reset_report(), &CancellationToken::new()).await;

    // three generation calls per attempt, three attempts
    assert_eq!(h.llm.calls(), 9);
    assert_eq!(verdict.status, VerdictStatus::Exhausted);
    assert_eq!(verdict.attempts.len(), 3);
    for attempt in &verdict.attempts {
        assert_eq!(attempt.status(), AttemptStatus::Error);
        assert!(attempt.record.error.as_deref().unwrap().contains("evidence append"));
    }
    assert_eq!(h.browser.opened(), 0);
}

#[tokio::test]
async fn test_attempts_are_bounded() {
    let tmp = tempfile::tempdir().unwrap();
    let h = harness(tmp.path(), ScriptedLLM::new(vec![NO_LUCK_PLAN]), PageBehavior::default(), true);

    let verdict = h.orchestrator.run(&reset_report(), &CancellationToken::new()).await;

    assert_eq!(verdict.status, VerdictStatus::Exhausted);
    assert!(!verdict.success);
    assert_eq!(
        verdict.attempts.iter().map(|a| a.attempt_number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(verdict.attempts.iter().all(|a| a.status() == AttemptStatus::Failed));
    assert_eq!(verdict.steps_to_reproduce.len(), 3);
    assert_eq!(h.browser.opened(), 3);
    assert_eq!(h.browser.closed(), 3);
}

#[tokio::test]
async fn test_stops_at_first_success() {
    let tmp = tempfile::tempdir().unwrap();
    let h = harness(tmp.path(), ScriptedLLM::new(vec![NO_LUCK_PLAN, SUCCESS_PLAN]), PageBehavior::default(), true);

    let verdict = h.orchestrator.run(&reset_report(), &CancellationToken::new()).await;

    assert_eq!(verdict.status, VerdictStatus::Succeeded);
    assert!(verdict.success);
    assert_eq!(verdict.attempts.len(), 2);
    assert!(!verdict.attempts[0].success());
    assert!(verdict.attempts[1].success());
    // collections concatenate in attempt order
    assert_eq!(
        verdict.steps_to_reproduce,
        vec!["Try the reset form".to_string(), "Open the login page".to_string()]
    );
    assert_eq!(verdict.evidence, vec!["Reset token accepted".to_string()]);
    assert_eq!(verdict.screenshots.len(), 2);
    assert_eq!(h.llm.calls(), 2);
}

#[tokio::test]
async fn test_runtime_error_moves_to_next_attempt() {
    let tmp = tempfile::tempdir().unwrap();
    let llm = ScriptedLLM::new(vec![BROKEN_SELECTOR_PLAN, SUCCESS_PLAN]);
    let h = harness(tmp.path(), llm, PageBehavior::default(), true);

    let verdict = h.orchestrator.run(&reset_report(), &CancellationToken::new()).await;

    assert_eq!(verdict.attempts.len(), 2);
    let first = &verdict.attempts[0];
    assert_eq!(first.status(), AttemptStatus::Error);
    assert!(first.record.error.as_deref().unwrap().contains("no element matches #missing"));
    assert_eq!(first.record.steps_to_reproduce, vec!["Click the reset button"]);
    assert!(verdict.attempts[1].success());
    assert_eq!(h.browser.opened(), 2);
    assert_eq!(h.browser.closed(), 2);
}

#[tokio::test]
async fn test_cancel_during_attempt_fails_loop() {
    let tmp = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let behavior = PageBehavior { cancel_on_click: Some(cancel.clone()), ..Default::default() };
    let plan = r#"{"routines": [{"name": "main", "async": true, "actions": [
        {"op": "append", "into": "steps_to_reproduce", "text": "Submit the form"},
        {"op": "click", "selector": "button"},
        {"op": "screenshot", "label": "submitted", "into": "screenshots"},
        {"op": "append", "into": "evidence", "text": "submitted"},
        {"op": "set_success"}
    ]}]}"#;
    let h = harness(tmp.path(), ScriptedLLM::new(vec![plan]), behavior, true);

    let verdict = h.orchestrator.run(&reset_report(), &cancel).await;

    assert_eq!(verdict.status, VerdictStatus::Failed);
    assert!(!verdict.success);
    assert_eq!(verdict.attempts.len(), 1);
    assert_eq!(verdict.attempts[0].status(), AttemptStatus::Error);
    assert_eq!(h.browser.closed(), 1);
}

#[tokio::test]
async fn test_without_runners_sqli_is_generated() {
    let tmp = tempfile::tempdir().unwrap();
    let h = harness(tmp.path(), ScriptedLLM::new(vec![SUCCESS_PLAN]), PageBehavior::default(), false);
    let report = VulnerabilityReport::new("SQL Injection", "Login form");

    let verdict = h.orchestrator.run(&report, &CancellationToken::new()).await;

    assert_eq!(verdict.status, VerdictStatus::Succeeded);
    assert_eq!(h.llm.calls(), 1);
}
