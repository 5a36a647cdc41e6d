use anyhow::Result;
use tracing::{debug, error, info, warn};

use crate::completion::{self, JsonShape};
use crate::llm_providers::{GenerationParams, LLMProvider, LLMProviderFactory, LLMProviderType, StaticProvider};
use crate::models::{ChatMessage, Evaluation, Flashcard};
use crate::prompts;

/// Orchestrates the per-task pipeline: build prompt, call the provider,
/// repair the completion, validate it, and apply the task's fallback policy.
///
/// Owns no state across calls - concurrent invocations share nothing
/// mutable. Schema failures are always absorbed here per task policy;
/// transport failures from the provider always propagate to the caller.
#[derive(Clone)]
pub struct LLMService {
    provider: LLMProvider,
}

impl LLMService {
    pub fn new_with_provider(
        api_key: String,
        base_url: Option<String>,
        provider_type: LLMProviderType,
        model: Option<String>,
    ) -> Self {
        let provider = LLMProviderFactory::create_provider(provider_type, api_key, base_url, model);
        Self { provider }
    }

    /// Service backed by a canned completion; used offline and in tests.
    pub fn new_static(response: impl Into<String>) -> Self {
        Self {
            provider: LLMProvider::Static(StaticProvider::new(response)),
        }
    }

    /// Get the provider name for logging and testing
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Get the model name being used
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Generate exactly `prompts::TEXT_DECK_SIZE` cards from source text.
    ///
    /// Fallback policy: schema failure yields an empty deck (there is no
    /// safe prior state; the caller must re-request).
    pub async fn generate_from_text(&self, source_text: &str) -> Result<Vec<Flashcard>> {
        info!(
            source_length = source_text.len(),
            "Generating flashcards from source text"
        );

        let prompt = prompts::generate_from_text(source_text);
        let raw = self
            .provider
            .make_request(None, &prompt, GenerationParams::with_temperature(0.1))
            .await?;

        Ok(self.cards_or_empty(&raw, prompts::TEXT_DECK_SIZE, "generate_from_text"))
    }

    /// Generate exactly `prompts::TOPIC_DECK_SIZE` cards about a subject.
    pub async fn generate_from_topic(&self, subject: &str) -> Result<Vec<Flashcard>> {
        info!(subject = %subject, "Generating flashcards from topic");

        let prompt = prompts::generate_from_topic(subject);
        let raw = self
            .provider
            .make_request(None, &prompt, GenerationParams::with_temperature(0.7))
            .await?;

        Ok(self.cards_or_empty(&raw, prompts::TOPIC_DECK_SIZE, "generate_from_topic"))
    }

    fn cards_or_empty(&self, raw: &str, expected: usize, task: &str) -> Vec<Flashcard> {
        let repaired = completion::repair(raw, JsonShape::Array);
        debug!(task = task, raw_length = raw.len(), "Repaired model completion");

        match completion::validate_flashcards(&repaired, Some(expected)) {
            Ok(cards) => {
                info!(task = task, card_count = cards.len(), "Deck generated successfully");
                cards
            }
            Err(e) => {
                error!(
                    task = task,
                    error = %e,
                    repaired = %repaired,
                    "Completion failed validation, returning empty deck"
                );
                Vec::new()
            }
        }
    }

    /// Apply a free-text instruction to an existing deck.
    ///
    /// Fallback policy: schema failure returns the input deck unchanged -
    /// the user is already looking at a safe prior state, so a silent no-op
    /// is less disruptive than an error.
    pub async fn edit_flashcards(
        &self,
        cards: &[Flashcard],
        instruction: &str,
    ) -> Result<Vec<Flashcard>> {
        info!(
            card_count = cards.len(),
            instruction_length = instruction.len(),
            "Editing flashcard deck"
        );

        let prompt = prompts::edit(cards, instruction);
        let raw = self
            .provider
            .make_request(None, &prompt, GenerationParams::with_temperature(0.3))
            .await?;

        let repaired = completion::repair(&raw, JsonShape::Array);
        match completion::validate_flashcards(&repaired, None) {
            Ok(updated) => {
                info!(
                    card_count = updated.len(),
                    "Deck edited successfully"
                );
                Ok(updated)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    repaired = %repaired,
                    "Edit completion failed validation, keeping original deck"
                );
                Ok(cards.to_vec())
            }
        }
    }

    /// Score a finished tutoring transcript against the rubric.
    ///
    /// Fallback policy: evaluation is advisory and must never block the
    /// caller's flow, so any schema failure yields the all-zero record.
    pub async fn evaluate_conversation(&self, transcript: &[ChatMessage]) -> Result<Evaluation> {
        info!(
            message_count = transcript.len(),
            "Evaluating tutoring conversation"
        );

        let prompt = prompts::evaluate(transcript);
        let raw = self
            .provider
            .make_request(None, &prompt, GenerationParams::with_temperature(0.7))
            .await?;

        let repaired = completion::repair(&raw, JsonShape::Object);
        match completion::validate_evaluation(&repaired) {
            Ok(evaluation) => {
                info!(
                    overall_score = evaluation.overall_score,
                    "Conversation evaluated successfully"
                );
                Ok(evaluation)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    repaired = %repaired,
                    "Evaluation completion failed validation, returning zeroed scores"
                );
                Ok(Evaluation::default())
            }
        }
    }

    /// Produce the simulated learner's next conversational reply.
    ///
    /// Free text, no JSON pipeline; transport failures propagate like any
    /// other model invocation error.
    pub async fn learner_reply(&self, transcript: &[ChatMessage]) -> Result<String> {
        info!(
            message_count = transcript.len(),
            "Generating learner reply"
        );

        let prompt = prompts::render_transcript(transcript);
        let params = GenerationParams {
            temperature: 0.7,
            top_p: 0.85,
            top_k: 40,
            max_output_tokens: 800,
        };
        let reply = self
            .provider
            .make_request(Some(prompts::LEARNER_SYSTEM), &prompt, params)
            .await?;

        debug!(reply_length = reply.len(), "Learner reply generated");
        Ok(reply)
    }
}
