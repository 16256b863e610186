//! Integration Tests
//!
//! End-to-end workflows: page selection or context menu, through the
//! background coordinator and the real HTTP client, to a rendered modal.

use crate::actors::background::{BackgroundHandle, CONTEXT_MENU_ID};
use crate::actors::content::ContentScriptHandle;
use crate::actors::messages::ContentAction;
use crate::actors::runtime::HostRuntime;
use crate::config::Config;
use crate::models::ResultTheme;
use crate::state::ExtensionState;
use crate::ui::modal::ModalKind;
use serde_json::json;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Fixtures
// ============================================================================

const PENICILLIN: &str = "La pénicilline a été découverte par Alexander Fleming en 1899.";
const PENICILLIN_FIXED: &str = "La pénicilline a été découverte par Alexander Fleming en 1928.";

fn config_for(base_url: &str) -> Config {
    Config {
        base_url: Url::parse(base_url).unwrap(),
        request_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

async fn start(config: &Config) -> (HostRuntime, BackgroundHandle) {
    let runtime = HostRuntime::new(ExtensionState::in_memory());
    let background = BackgroundHandle::new(config, runtime.clone());
    background.installed().await.unwrap();
    (runtime, background)
}

async fn open_page(runtime: &HostRuntime, background: &BackgroundHandle) -> ContentScriptHandle {
    let tab = runtime.open_tab(Some("https://fr.wikipedia.org/wiki/Penicilline")).await;
    runtime.inject(tab, background.clone()).await.unwrap()
}

async fn mount_penicillin(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/api/v1/detect-hallucination"))
        .and(body_json(json!({ "prompt": PENICILLIN })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Workflows
// ============================================================================

#[tokio::test]
async fn test_selection_to_warning_result() {
    let server = MockServer::start().await;
    mount_penicillin(
        &server,
        json!({
            "is_correct": false,
            "confidence": 0.92,
            "corrected_version": PENICILLIN_FIXED,
            "explanation": "Fleming discovered penicillin in 1928."
        }),
    )
    .await;

    let config = config_for(&server.uri());
    let (runtime, background) = start(&config).await;
    let script = open_page(&runtime, &background).await;

    script
        .send(ContentAction::AnalyzeText {
            text: PENICILLIN.to_string(),
        })
        .await
        .unwrap();
    let kind = script.wait_for_outcome(Duration::from_secs(5)).await.unwrap();
    assert_eq!(kind, ModalKind::Result(ResultTheme::Warning));

    let snapshot = script.snapshot().await.unwrap();
    assert_eq!(
        snapshot.history,
        vec![ModalKind::Loader, ModalKind::Result(ResultTheme::Warning)]
    );
    assert_eq!(snapshot.modal_nodes, 1);
    let html = snapshot.html.unwrap();
    assert!(html.contains("hd-theme-warning"));
    assert!(html.contains("92% • Hallucination"));
    assert!(html.contains(&format!("<del class=\"hd-original\">{}</del>", PENICILLIN)));
    assert!(html.contains(PENICILLIN_FIXED));

    let reply = script.send(ContentAction::CopyCorrection).await.unwrap();
    assert!(reply.success);
    let snapshot = script.snapshot().await.unwrap();
    assert_eq!(snapshot.clipboard.as_deref(), Some(PENICILLIN_FIXED));
}

#[tokio::test]
async fn test_network_error_shows_guidance() {
    // Nothing listens on the discard port.
    let config = config_for("http://127.0.0.1:9");
    let (runtime, background) = start(&config).await;
    let script = open_page(&runtime, &background).await;

    script
        .send(ContentAction::AnalyzeText {
            text: PENICILLIN.to_string(),
        })
        .await
        .unwrap();
    let kind = script.wait_for_outcome(Duration::from_secs(5)).await.unwrap();
    assert_eq!(kind, ModalKind::Error);

    let snapshot = script.snapshot().await.unwrap();
    assert_eq!(snapshot.history, vec![ModalKind::Loader, ModalKind::Error]);
    let html = snapshot.html.unwrap();
    assert!(html.contains("HTTP error"));
    assert!(html.contains("http://localhost:8000"));
}

#[tokio::test]
async fn test_context_menu_with_envelope_response() {
    let server = MockServer::start().await;
    mount_penicillin(
        &server,
        json!({
            "original_prompt": PENICILLIN,
            "ai_analysis": {
                "is_hallucination": false,
                "confidence_score": 0.75,
                "corrected_text": PENICILLIN_FIXED,
                "explanation": "Mostly right."
            }
        }),
    )
    .await;

    let config = config_for(&server.uri());
    let (runtime, background) = start(&config).await;
    let tab = runtime.open_tab(Some("https://fr.wikipedia.org/wiki/Penicilline")).await;

    background
        .context_menu_clicked(tab, CONTEXT_MENU_ID, Some(PENICILLIN.to_string()))
        .await
        .unwrap();

    let script = runtime.content_script(tab).await.expect("script injected");
    let snapshot = script.snapshot().await.unwrap();
    assert_eq!(snapshot.view, ModalKind::Result(ResultTheme::Warning));
    let html = snapshot.html.unwrap();
    assert!(html.contains("75% • Doubtful"));
    assert!(html.contains("Mostly right."));
}

#[tokio::test]
async fn test_context_menu_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/detect-hallucination"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let (runtime, background) = start(&config).await;
    let script = open_page(&runtime, &background).await;
    let tab = runtime.query().await[0].id;

    background
        .context_menu_clicked(tab, CONTEXT_MENU_ID, Some(PENICILLIN.to_string()))
        .await
        .unwrap();

    let snapshot = script.snapshot().await.unwrap();
    assert_eq!(snapshot.view, ModalKind::Error);
    let html = snapshot.html.unwrap();
    assert!(html.contains("Unable to reach the AI: Server error (500): model crashed"));
}

#[tokio::test]
async fn test_backend_status_against_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/detect-hallucination"))
        .and(body_json(json!({ "prompt": "test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_correct": true,
            "confidence": 1.0,
            "corrected_version": "test",
            "explanation": ""
        })))
        .mount(&server)
        .await;

    let config = config_for(&server.uri());
    let (_, background) = start(&config).await;
    assert!(background.check_backend_status().await.unwrap());

    let (_, offline) = start(&config_for("http://127.0.0.1:9")).await;
    assert!(!offline.check_backend_status().await.unwrap());
}
