use serde::{Deserialize, Serialize};

/// A single question/answer study unit.
///
/// Both fields are non-empty after trimming. `Flashcard::normalized` is the
/// one place that enforces the invariant; everything that builds cards from
/// model output goes through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

impl Flashcard {
    /// Trim both fields; rejects the card if either is empty afterwards.
    pub fn normalized(question: &str, answer: &str) -> Option<Self> {
        let question = question.trim();
        let answer = answer.trim();
        if question.is_empty() || answer.is_empty() {
            return None;
        }
        Some(Self {
            question: question.to_string(),
            answer: answer.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// One turn of a tutoring conversation. Transcripts are ordered,
/// append-only sequences of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Rubric scores for a full tutoring conversation. The all-zero default is
/// the caller-visible fallback when the model output cannot be scored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub knowledge_accuracy: i32,
    pub explanation_quality: i32,
    pub intuitiveness: i32,
    pub overall_score: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcription {
    pub transcript: String,
    pub confidence: f32,
}

/// Which generation flow produced a deck; also the session-store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    Auto,
    Manual,
}

impl GenerationMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(GenerationMode::Auto),
            "manual" => Some(GenerationMode::Manual),
            _ => None,
        }
    }
}

// API request types

#[derive(Debug, Clone, Deserialize)]
pub struct TopicRequest {
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditRequest {
    pub mode: GenerationMode,
    /// Cards to edit. When absent, the stored deck for `mode` is used.
    pub cards: Option<Vec<Flashcard>>,
    pub instruction: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub language: Option<String>,
}
