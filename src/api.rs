use axum::{
    Router,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::{
    auth::AuthService,
    errors::{ApiError, ErrorContext},
    llm_service::LLMService,
    models::*,
    pdf,
    speech::SpeechClient,
};

// Import logging macros
use crate::{log_api_start, log_api_success, log_api_warn};

/// Ephemeral per-session deck storage, keyed by session and generation
/// mode. A new deck wholly replaces the prior one for its mode; nothing
/// survives process restart.
pub type DeckStore = Arc<Mutex<HashMap<(String, GenerationMode), Vec<Flashcard>>>>;

#[derive(Clone)]
pub struct AppState {
    pub llm_service: LLMService,
    pub speech: SpeechClient,
    pub auth: AuthService,
    pub decks: DeckStore,
}

impl AppState {
    pub fn new(llm_service: LLMService, speech: SpeechClient, auth: AuthService) -> Self {
        Self {
            llm_service,
            speech,
            auth,
            decks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

type ErrorResponse = (StatusCode, Json<ApiResponse<()>>);

/// Identify the caller's session from the Authorization header. Decks for
/// unauthenticated callers share one anonymous bucket.
fn session_key(headers: &HeaderMap) -> String {
    bearer_token(headers)
        .map(str::to_string)
        .unwrap_or_else(|| "anonymous".to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

fn store_deck(state: &AppState, key: String, mode: GenerationMode, cards: &[Flashcard]) {
    let mut decks = state.decks.lock().expect("deck store lock poisoned");
    decks.insert((key, mode), cards.to_vec());
}

// Flashcard endpoints

/// Generate a 5-card deck from an uploaded PDF (multipart field `file`).
pub async fn generate_from_pdf(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Vec<Flashcard>>>, ErrorResponse> {
    log_api_start!("generate_from_pdf", mode = GenerationMode::Auto);

    let mut file_bytes: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::BadRequest(format!("Malformed multipart request: {}", e))
            .to_response_with_context(ErrorContext::new("generate_from_pdf", "flashcards"))
    })? {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            if !file_name.to_lowercase().ends_with(".pdf") {
                let error = ApiError::ValidationError("File must be a PDF".to_string());
                return Err(error.to_response_with_context(ErrorContext::new(
                    "generate_from_pdf",
                    "flashcards",
                )));
            }
            let bytes = field.bytes().await.map_err(|e| {
                ApiError::BadRequest(format!("Failed to read uploaded file: {}", e))
                    .to_response_with_context(ErrorContext::new("generate_from_pdf", "flashcards"))
            })?;
            file_bytes = Some(bytes.to_vec());
        }
    }

    let Some(file_bytes) = file_bytes else {
        let error = ApiError::ValidationError("Missing 'file' upload field".to_string());
        return Err(
            error.to_response_with_context(ErrorContext::new("generate_from_pdf", "flashcards"))
        );
    };

    let source_text = match pdf::extract_text(&file_bytes) {
        Ok(text) => text,
        Err(e) => {
            let error = ApiError::ValidationError(format!("Could not read PDF: {}", e));
            return Err(error.to_response_with_context(ErrorContext::new(
                "generate_from_pdf",
                "flashcards",
            )));
        }
    };

    match state.llm_service.generate_from_text(&source_text).await {
        Ok(cards) => {
            log_api_success!("generate_from_pdf", card_count = cards.len(), "deck generated");
            store_deck(&state, session_key(&headers), GenerationMode::Auto, &cards);
            Ok(Json(ApiResponse::success(cards)))
        }
        Err(e) => {
            let error = ApiError::LLMError(e.to_string());
            Err(error
                .to_response_with_context(ErrorContext::new("generate_from_pdf", "flashcards")))
        }
    }
}

/// Generate a 10-card deck from a free-text subject.
pub async fn generate_from_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<TopicRequest>,
) -> Result<Json<ApiResponse<Vec<Flashcard>>>, ErrorResponse> {
    log_api_start!("generate_from_topic", mode = GenerationMode::Manual);

    let subject = request.subject.trim();
    if subject.is_empty() {
        let error = ApiError::ValidationError("Subject must not be empty".to_string());
        return Err(
            error.to_response_with_context(ErrorContext::new("generate_from_topic", "flashcards"))
        );
    }

    match state.llm_service.generate_from_topic(subject).await {
        Ok(cards) => {
            log_api_success!("generate_from_topic", card_count = cards.len(), "deck generated");
            store_deck(&state, session_key(&headers), GenerationMode::Manual, &cards);
            Ok(Json(ApiResponse::success(cards)))
        }
        Err(e) => {
            let error = ApiError::LLMError(e.to_string());
            Err(error
                .to_response_with_context(ErrorContext::new("generate_from_topic", "flashcards")))
        }
    }
}

/// Apply a natural-language edit instruction to a deck. Cards may come from
/// the request body or from the stored deck for the given mode; a failed
/// edit silently returns the input deck unchanged.
pub async fn edit_deck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<EditRequest>,
) -> Result<Json<ApiResponse<Vec<Flashcard>>>, ErrorResponse> {
    log_api_start!("edit_deck", mode = request.mode);

    if request.instruction.trim().is_empty() {
        let error = ApiError::ValidationError("Edit instruction must not be empty".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("edit_deck", "flashcards")));
    }

    let key = session_key(&headers);
    let cards = match request.cards {
        Some(cards) => cards,
        None => {
            let decks = state.decks.lock().expect("deck store lock poisoned");
            match decks.get(&(key.clone(), request.mode)) {
                Some(stored) => stored.clone(),
                None => {
                    log_api_warn!("edit_deck", mode = request.mode, "no stored deck for session");
                    let error = ApiError::ValidationError(
                        "No cards supplied and no stored deck for this mode".to_string(),
                    );
                    return Err(error.to_response_with_context(ErrorContext::new(
                        "edit_deck",
                        "flashcards",
                    )));
                }
            }
        }
    };

    match state
        .llm_service
        .edit_flashcards(&cards, &request.instruction)
        .await
    {
        Ok(updated) => {
            log_api_success!("edit_deck", mode = request.mode, "deck edited");
            store_deck(&state, key, request.mode, &updated);
            Ok(Json(ApiResponse::success(updated)))
        }
        Err(e) => {
            let error = ApiError::LLMError(e.to_string());
            Err(error.to_response_with_context(ErrorContext::new("edit_deck", "flashcards")))
        }
    }
}

/// Fetch the stored deck for a mode. An empty array means nothing has been
/// generated in this session yet.
pub async fn get_deck(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(mode): Path<String>,
) -> Result<Json<ApiResponse<Vec<Flashcard>>>, ErrorResponse> {
    let Some(mode) = GenerationMode::parse(&mode) else {
        let error =
            ApiError::ValidationError(format!("Unknown mode '{}', expected auto or manual", mode));
        return Err(error.to_response_with_context(ErrorContext::new("get_deck", "flashcards")));
    };

    let decks = state.decks.lock().expect("deck store lock poisoned");
    let cards = decks
        .get(&(session_key(&headers), mode))
        .cloned()
        .unwrap_or_default();

    debug!(mode = ?mode, card_count = cards.len(), "Fetched stored deck");
    Ok(Json(ApiResponse::success(cards)))
}

// Tutoring endpoints

/// Produce the simulated learner's next reply for a transcript.
pub async fn tutor_reply(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    log_api_start!("tutor_reply", message_count = request.messages.len());

    if request.messages.is_empty() {
        let error = ApiError::ValidationError("Transcript must not be empty".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("tutor_reply", "transcript")));
    }

    match state.llm_service.learner_reply(&request.messages).await {
        Ok(reply) => {
            log_api_success!("tutor_reply", "learner reply generated");
            Ok(Json(ApiResponse::success(json!({ "reply": reply }))))
        }
        Err(e) => {
            let error = ApiError::LLMError(e.to_string());
            Err(error.to_response_with_context(ErrorContext::new("tutor_reply", "transcript")))
        }
    }
}

/// Score a finished tutoring conversation. Always returns a well-shaped
/// evaluation; unusable model output yields all-zero scores.
pub async fn evaluate_conversation(
    State(state): State<AppState>,
    Json(request): Json<TranscriptRequest>,
) -> Result<Json<ApiResponse<Evaluation>>, ErrorResponse> {
    log_api_start!("evaluate_conversation", message_count = request.messages.len());

    match state
        .llm_service
        .evaluate_conversation(&request.messages)
        .await
    {
        Ok(evaluation) => {
            info!(
                overall_score = evaluation.overall_score,
                "Conversation evaluated"
            );
            Ok(Json(ApiResponse::success(evaluation)))
        }
        Err(e) => {
            let error = ApiError::LLMError(e.to_string());
            Err(error
                .to_response_with_context(ErrorContext::new("evaluate_conversation", "transcript")))
        }
    }
}

// Speech endpoints

/// Transcribe uploaded audio (multipart fields `audio` and optional
/// `language`).
pub async fn transcribe_audio(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<Vec<Transcription>>>, ErrorResponse> {
    let mut audio_bytes: Option<Vec<u8>> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        ApiError::BadRequest(format!("Malformed multipart request: {}", e))
            .to_response_with_context(ErrorContext::new("transcribe_audio", "speech"))
    })? {
        match field.name() {
            Some("audio") => {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read audio upload: {}", e))
                        .to_response_with_context(ErrorContext::new("transcribe_audio", "speech"))
                })?;
                audio_bytes = Some(bytes.to_vec());
            }
            Some("language") => {
                let value = field.text().await.map_err(|e| {
                    ApiError::BadRequest(format!("Failed to read language field: {}", e))
                        .to_response_with_context(ErrorContext::new("transcribe_audio", "speech"))
                })?;
                language = Some(value);
            }
            _ => {}
        }
    }

    let Some(audio_bytes) = audio_bytes else {
        let error = ApiError::ValidationError("Missing 'audio' upload field".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("transcribe_audio", "speech")));
    };

    let language = language.unwrap_or_else(|| state.speech.default_language().to_string());
    log_api_start!("transcribe_audio", language = language);

    match state.speech.transcribe(&audio_bytes, &language).await {
        Ok(transcriptions) => {
            if transcriptions.is_empty() {
                log_api_warn!("transcribe_audio", "empty transcription result");
            }
            Ok(Json(ApiResponse::success(transcriptions)))
        }
        Err(e) => {
            let error = ApiError::UpstreamError(e.to_string());
            Err(error.to_response_with_context(
                ErrorContext::new("transcribe_audio", "speech")
                    .with_user_message("Speech transcription failed. Please try again."),
            ))
        }
    }
}

/// Synthesize speech for a text snippet, returning MP3 bytes.
pub async fn synthesize_speech(
    State(state): State<AppState>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<(StatusCode, [(&'static str, &'static str); 1], Vec<u8>), ErrorResponse> {
    if request.text.trim().is_empty() {
        let error = ApiError::ValidationError("Text must not be empty".to_string());
        return Err(error.to_response_with_context(ErrorContext::new("synthesize_speech", "speech")));
    }

    let language = request
        .language
        .unwrap_or_else(|| state.speech.default_language().to_string());
    log_api_start!("synthesize_speech", language = language);

    match state.speech.synthesize(&request.text, &language).await {
        Ok(audio) => Ok((StatusCode::OK, [("content-type", "audio/mpeg")], audio)),
        Err(e) => {
            let error = ApiError::UpstreamError(e.to_string());
            Err(error.to_response_with_context(
                ErrorContext::new("synthesize_speech", "speech")
                    .with_user_message("Speech synthesis failed. Please try again."),
            ))
        }
    }
}

// Auth endpoints

/// Validate the caller's bearer token against the identity provider.
pub async fn validate_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<serde_json::Value>>, ErrorResponse> {
    log_api_start!("validate_token");

    let Some(token) = bearer_token(&headers) else {
        let error = ApiError::Unauthorized;
        return Err(error.to_response_with_context(ErrorContext::new("validate_token", "token")));
    };

    match state.auth.resolve_user(token).await {
        Ok(user) => {
            log_api_success!("validate_token", "token accepted");
            Ok(Json(ApiResponse::success(
                json!({ "valid": true, "user_id": user.id }),
            )))
        }
        Err(e) => {
            warn!(error = %e, "Token validation failed");
            let error: ApiError = e.into();
            Err(error.to_response_with_context(ErrorContext::new("validate_token", "token")))
        }
    }
}

/// Return the authenticated user's identity.
pub async fn get_user_info(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<crate::auth::UserIdentity>>, ErrorResponse> {
    let Some(token) = bearer_token(&headers) else {
        let error = ApiError::Unauthorized;
        return Err(error.to_response_with_context(ErrorContext::new("get_user_info", "token")));
    };

    match state.auth.resolve_user(token).await {
        Ok(user) => Ok(Json(ApiResponse::success(user))),
        Err(e) => {
            let error: ApiError = e.into();
            Err(error.to_response_with_context(ErrorContext::new("get_user_info", "token")))
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Flashcard routes. The static paths shadow `/:mode` in axum's
        // matcher, so GET must be registered on them explicitly for
        // `get_deck` to be reachable at /auto and /manual.
        .route(
            "/api/flashcards/auto",
            post(generate_from_pdf).get(|state: State<AppState>, headers: HeaderMap| {
                get_deck(state, headers, Path("auto".to_string()))
            }),
        )
        .route(
            "/api/flashcards/manual",
            post(generate_from_topic).get(|state: State<AppState>, headers: HeaderMap| {
                get_deck(state, headers, Path("manual".to_string()))
            }),
        )
        .route("/api/flashcards/edit", post(edit_deck))
        .route("/api/flashcards/:mode", get(get_deck))
        // Tutoring routes
        .route("/api/tutor/reply", post(tutor_reply))
        .route("/api/tutor/evaluate", post(evaluate_conversation))
        // Speech routes
        .route("/api/speech/transcribe", post(transcribe_audio))
        .route("/api/speech/synthesize", post(synthesize_speech))
        // Auth routes
        .route("/api/auth/validate", get(validate_token))
        .route("/api/auth/me", get(get_user_info))
        .with_state(state)
}
