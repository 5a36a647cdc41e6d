use crate::models::{ChatMessage, Flashcard, Role};

/// Deck size for generation from uploaded source text.
pub const TEXT_DECK_SIZE: usize = 5;
/// Deck size for generation from a free-text subject.
pub const TOPIC_DECK_SIZE: usize = 10;

/// Persona for the simulated learner in the tutoring loop. The user plays
/// teacher; the model plays a curious student who asks follow-up questions.
pub const LEARNER_SYSTEM: &str = "You are a curious student being taught by the user. \
Listen to their explanation, respond conversationally, and ask one short follow-up \
question that probes whether they really understand the topic. Keep replies under \
three sentences and never lecture back - your job is to be taught, not to teach.";

/// Instruction header for conversation evaluation. The strict JSON demands
/// here shape the output but do not guarantee it; the repair/validate
/// pipeline handles the rest.
const EVALUATOR_SYSTEM: &str = "You are an evaluator scoring how well the user taught \
a topic to a simulated student. Score the conversation on a 0-10 scale for each \
criterion.";

/// Prompt demanding exactly `TEXT_DECK_SIZE` cards from uploaded material.
pub fn generate_from_text(source_text: &str) -> String {
    format!(
        r#"You are a JSON generator. Your task is to create exactly {count} flashcards from the given text.
You must respond with ONLY a JSON array containing exactly {count} objects.

Each object in the array must have exactly these two fields:
- "question": A clear, concise question about the text
- "answer": The corresponding answer from the text

Example format:
[
    {{"question": "What is X?", "answer": "X is Y"}},
    {{"question": "How does Z work?", "answer": "Z works by..."}}
]

IMPORTANT:
1. Respond with ONLY the JSON array - no other text, no explanations
2. The response must start with [ and end with ]
3. Use double quotes for all strings
4. Include exactly {count} flashcards
5. Each flashcard must be unique

Text to process:
{source_text}"#,
        count = TEXT_DECK_SIZE,
        source_text = source_text
    )
}

/// Prompt demanding exactly `TOPIC_DECK_SIZE` cards about a subject.
pub fn generate_from_topic(subject: &str) -> String {
    format!(
        r#"You are a JSON generator. Your task is to create exactly {count} flashcards about the subject: {subject}.
You must respond with ONLY a JSON array containing exactly {count} objects.

Each object in the array must have exactly these two fields:
- "question": A clear, concise question about the subject
- "answer": The corresponding answer

Example format:
[
    {{"question": "What is X?", "answer": "X is Y"}},
    {{"question": "How does Z work?", "answer": "Z works by..."}}
]

IMPORTANT:
1. Respond with ONLY the JSON array - no other text, no explanations
2. The response must start with [ and end with ]
3. Use double quotes for all strings
4. Include exactly {count} flashcards
5. Each flashcard must be unique
6. Focus on the main concepts of {subject}
7. Make questions and answers educational and informative"#,
        count = TOPIC_DECK_SIZE,
        subject = subject
    )
}

/// Prompt embedding the current deck plus a free-text edit instruction.
/// The model returns a full replacement array, not a diff, and the count is
/// instruction-dependent, so no cardinality is demanded here.
pub fn edit(cards: &[Flashcard], instruction: &str) -> String {
    let current = serde_json::to_string_pretty(cards).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"You are a JSON editor. Your task is to modify the following flashcards based on the user's instructions.
You must respond with ONLY a JSON array containing the modified flashcards.

Current flashcards:
{current}

User instructions:
{instruction}

IMPORTANT:
1. Respond with ONLY the JSON array - no other text, no explanations
2. The response must start with [ and end with ]
3. Use double quotes for all strings
4. Each flashcard must have exactly these two fields: "question" and "answer"
5. Follow the user's instructions precisely
6. If the user wants to add new flashcards, add them to the array
7. If the user wants to remove flashcards, remove them from the array
8. If the user wants to modify specific flashcards, modify them according to the instructions"#,
        current = current,
        instruction = instruction
    )
}

/// Prompt demanding a single JSON object with the four rubric scores for a
/// finished tutoring transcript.
pub fn evaluate(transcript: &[ChatMessage]) -> String {
    format!(
        r#"{header}

Conversation transcript:
{transcript}

You must respond with ONLY a JSON object containing exactly these four integer fields:
- "knowledge_accuracy": how factually accurate the teaching was
- "explanation_quality": how clear and well-structured the explanations were
- "intuitiveness": how intuitive and relatable the examples were
- "overall_score": overall teaching performance

IMPORTANT:
1. Respond with ONLY the JSON object - no other text, no explanations
2. The response must start with {{ and end with }}
3. Use double quotes for all field names
4. All four values must be integers"#,
        header = EVALUATOR_SYSTEM,
        transcript = render_transcript(transcript)
    )
}

/// Flatten a transcript into labeled lines for prompt embedding.
///
/// System messages are never forwarded as a distinct role; the single
/// leading instruction (the system prompt for the task) already covers
/// them, so they are skipped here.
pub fn render_transcript(transcript: &[ChatMessage]) -> String {
    let mut lines = Vec::with_capacity(transcript.len());
    for message in transcript {
        let label = match message.role {
            Role::User => "Teacher",
            Role::Assistant => "Student",
            Role::System => continue,
        };
        lines.push(format!("{}: {}", label, message.content));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompts_state_cardinality() {
        let text_prompt = generate_from_text("Some source material.");
        assert!(text_prompt.contains("exactly 5 flashcards"));
        assert!(text_prompt.contains("Some source material."));

        let topic_prompt = generate_from_topic("Arithmetic");
        assert!(topic_prompt.contains("exactly 10 flashcards"));
        assert!(topic_prompt.contains("Arithmetic"));
    }

    #[test]
    fn test_edit_prompt_embeds_current_deck() {
        let cards = vec![
            Flashcard {
                question: "What is ownership?".to_string(),
                answer: "A memory management model.".to_string(),
            },
        ];
        let prompt = edit(&cards, "Make the answers shorter");
        assert!(prompt.contains("What is ownership?"));
        assert!(prompt.contains("Make the answers shorter"));
    }

    #[test]
    fn test_render_transcript_skips_system_messages() {
        let transcript = vec![
            ChatMessage {
                role: Role::System,
                content: "be a student".to_string(),
            },
            ChatMessage {
                role: Role::User,
                content: "Photosynthesis converts light to energy.".to_string(),
            },
            ChatMessage {
                role: Role::Assistant,
                content: "What happens at night?".to_string(),
            },
        ];
        let rendered = render_transcript(&transcript);
        assert_eq!(
            rendered,
            "Teacher: Photosynthesis converts light to energy.\nStudent: What happens at night?"
        );
    }

    #[test]
    fn test_evaluate_prompt_names_all_fields() {
        let prompt = evaluate(&[]);
        for field in [
            "knowledge_accuracy",
            "explanation_quality",
            "intuitiveness",
            "overall_score",
        ] {
            assert!(prompt.contains(field), "missing field {}", field);
        }
    }
}
