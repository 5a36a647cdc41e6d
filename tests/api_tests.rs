use axum_test::TestServer;
use serde_json::{Value, json};

use flashcard_tutor::{
    AuthService, LLMService, SpeechClient,
    api::{AppState, create_router},
    config::{AuthConfig, SpeechConfig},
};

/// Spin up a test server whose language model always returns the given
/// completion. Speech and auth clients point at unreachable endpoints and
/// are only exercised by the tests that expect failure.
fn test_server(completion: &str) -> TestServer {
    let llm_service = LLMService::new_static(completion);
    let speech = SpeechClient::new(&SpeechConfig {
        api_key: String::new(),
        voice: "en-US-Chirp3-HD-Charon".to_string(),
        default_language: "en-US".to_string(),
    });
    let auth = AuthService::new(&AuthConfig {
        supabase_url: "https://localhost.supabase.co".to_string(),
        anon_key: String::new(),
    });
    let state = AppState::new(llm_service, speech, auth);
    TestServer::new(create_router(state)).expect("failed to start test server")
}

fn deck_json(count: usize) -> String {
    let cards: Vec<_> = (1..=count)
        .map(|i| json!({"question": format!("Q{}?", i), "answer": format!("A{}", i)}))
        .collect();
    serde_json::to_string(&cards).unwrap()
}

#[tokio::test]
async fn test_generate_from_topic_success_envelope() {
    let server = test_server(&deck_json(10));

    let response = server
        .post("/api/flashcards/manual")
        .json(&json!({"subject": "Arithmetic"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    assert_eq!(body["data"][0]["question"], json!("Q1?"));
    assert!(body["error"].is_null());
}

#[tokio::test]
async fn test_generate_from_topic_garbage_completion_yields_empty_deck() {
    // Unusable model output is not an HTTP error; the caller gets an
    // empty deck and can retry.
    let server = test_server("I'd rather talk about something else.");

    let response = server
        .post("/api/flashcards/manual")
        .json(&json!({"subject": "Arithmetic"}))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_generate_from_topic_rejects_blank_subject() {
    let server = test_server(&deck_json(10));

    let response = server
        .post("/api/flashcards/manual")
        .json(&json!({"subject": "   "}))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("Subject"));
}

#[tokio::test]
async fn test_generated_deck_is_stored_and_fetchable() {
    let server = test_server(&deck_json(10));

    server
        .post("/api/flashcards/manual")
        .json(&json!({"subject": "Arithmetic"}))
        .await
        .assert_status_ok();

    let response = server.get("/api/flashcards/manual").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    // The auto-mode slot is independent and still empty.
    let response = server.get("/api/flashcards/auto").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_get_deck_rejects_unknown_mode() {
    let server = test_server(&deck_json(10));

    let response = server.get("/api/flashcards/bogus").await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_edit_with_failed_completion_returns_cards_unchanged() {
    let server = test_server("Sorry, I couldn't apply that edit.");

    let cards = json!([
        {"question": "Q1?", "answer": "A1"},
        {"question": "Q2?", "answer": "A2"}
    ]);
    let response = server
        .post("/api/flashcards/edit")
        .json(&json!({
            "mode": "manual",
            "cards": cards,
            "instruction": "Reword everything"
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], cards);
}

#[tokio::test]
async fn test_edit_without_cards_or_stored_deck_is_rejected() {
    let server = test_server(&deck_json(3));

    let response = server
        .post("/api/flashcards/edit")
        .json(&json!({"mode": "manual", "instruction": "Shorten the answers"}))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_edit_rejects_blank_instruction() {
    let server = test_server(&deck_json(3));

    let response = server
        .post("/api/flashcards/edit")
        .json(&json!({
            "mode": "manual",
            "cards": [{"question": "Q1?", "answer": "A1"}],
            "instruction": ""
        }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tutor_reply_returns_model_text() {
    let server = test_server("Hmm, why does that work?");

    let response = server
        .post("/api/tutor/reply")
        .json(&json!({
            "messages": [
                {"role": "user", "content": "Multiplication is repeated addition."}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["reply"], json!("Hmm, why does that work?"));
}

#[tokio::test]
async fn test_tutor_reply_rejects_empty_transcript() {
    let server = test_server("unused");

    let response = server
        .post("/api/tutor/reply")
        .json(&json!({"messages": []}))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_evaluate_returns_scores() {
    let server = test_server(
        &json!({
            "knowledge_accuracy": 9,
            "explanation_quality": 7,
            "intuitiveness": 8,
            "overall_score": 8
        })
        .to_string(),
    );

    let response = server
        .post("/api/tutor/evaluate")
        .json(&json!({
            "messages": [
                {"role": "user", "content": "Photosynthesis converts light into sugar."},
                {"role": "assistant", "content": "Where does the carbon come from?"}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["knowledge_accuracy"], json!(9));
    assert_eq!(body["data"]["overall_score"], json!(8));
}

#[tokio::test]
async fn test_evaluate_garbage_returns_zeroed_scores() {
    let server = test_server("A lovely chat, ten out of ten.");

    let response = server
        .post("/api/tutor/evaluate")
        .json(&json!({
            "messages": [{"role": "user", "content": "Let me explain entropy."}]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["data"],
        json!({
            "knowledge_accuracy": 0,
            "explanation_quality": 0,
            "intuitiveness": 0,
            "overall_score": 0
        })
    );
}

#[tokio::test]
async fn test_synthesize_rejects_blank_text() {
    let server = test_server("unused");

    let response = server
        .post("/api/speech/synthesize")
        .json(&json!({"text": "  "}))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_auth_validate_requires_bearer_token() {
    let server = test_server("unused");

    let response = server.get("/api/auth/validate").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

    let response = server
        .get("/api/auth/me")
        .add_header("authorization", "Basic abc")
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}
