pub mod api;
pub mod auth;
pub mod completion;
pub mod config;
pub mod errors;
pub mod llm_providers;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod pdf;
pub mod prompts;
pub mod speech;

pub use auth::{AuthError, AuthService, UserIdentity};
pub use completion::{JsonShape, SchemaError, repair, validate_evaluation, validate_flashcards};
pub use config::Config;
pub use errors::*;
pub use llm_providers::{GenerationParams, LLMProvider, LLMProviderFactory, LLMProviderType};
pub use llm_service::LLMService;
pub use models::*;
pub use speech::SpeechClient;
