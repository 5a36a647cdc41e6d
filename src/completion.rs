use serde_json::Value;
use tracing::debug;

use crate::models::{Evaluation, Flashcard};

/// Outer JSON shape a task expects from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    Array,
    Object,
}

impl JsonShape {
    fn opening(self) -> char {
        match self {
            JsonShape::Array => '[',
            JsonShape::Object => '{',
        }
    }

    fn closing(self) -> char {
        match self {
            JsonShape::Array => ']',
            JsonShape::Object => '}',
        }
    }
}

/// Structural contract violations found in a repaired completion.
///
/// These are handled locally by the fallback policy in `llm_service` and are
/// never surfaced to API callers as raw parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("completion is not parseable JSON")]
    ParseFailure,

    #[error("completion is not a JSON array")]
    NotAnArray,

    #[error("expected {expected} cards, got {actual}")]
    WrongCount { expected: usize, actual: usize },

    #[error("required field missing or not an integer: {0}")]
    MissingField(&'static str),
}

/// Best-effort textual patch turning a raw model completion into JSON text.
///
/// Handles the two failure patterns seen in practice: a markdown code-fence
/// wrapper around the payload, and a missing outer bracket when the model
/// truncates or adds commentary. Fence markers are removed wherever they
/// appear, not only at the ends. Deliberately shallow beyond that: no
/// bracket balancing, no quote escaping, no recovery from interior
/// corruption. Idempotent, and the result may still fail to parse.
pub fn repair(raw: &str, shape: JsonShape) -> String {
    let stripped = raw.trim().replace("```json", "").replace("```", "");
    let mut text = stripped.trim().to_string();

    if !text.starts_with(shape.opening()) {
        text.insert(0, shape.opening());
    }
    if !text.ends_with(shape.closing()) {
        text.push(shape.closing());
    }
    text
}

/// Parse repaired completion text and enforce the flashcard contract.
///
/// Non-mapping array elements are dropped silently to maximize yield from a
/// partially-good response; elements missing a non-empty `question` or
/// `answer` are dropped the same way. With `expected_count` set, a retained
/// count that differs from it rejects the whole batch - four valid cards
/// where five were asked for is a failure, not a near miss, because
/// consumers assume the exact deck size.
pub fn validate_flashcards(
    json_text: &str,
    expected_count: Option<usize>,
) -> Result<Vec<Flashcard>, SchemaError> {
    let value: Value = serde_json::from_str(json_text).map_err(|_| SchemaError::ParseFailure)?;
    let items = value.as_array().ok_or(SchemaError::NotAnArray)?;

    let mut cards = Vec::with_capacity(items.len());
    for item in items {
        let Some(object) = item.as_object() else {
            debug!(element = %item, "Dropping non-object element from card array");
            continue;
        };
        let question = object.get("question").and_then(Value::as_str).unwrap_or("");
        let answer = object.get("answer").and_then(Value::as_str).unwrap_or("");
        if let Some(card) = Flashcard::normalized(question, answer) {
            cards.push(card);
        }
    }

    if let Some(expected) = expected_count {
        if cards.len() != expected {
            return Err(SchemaError::WrongCount {
                expected,
                actual: cards.len(),
            });
        }
    }
    Ok(cards)
}

const EVALUATION_FIELDS: [&str; 4] = [
    "knowledge_accuracy",
    "explanation_quality",
    "intuitiveness",
    "overall_score",
];

/// Parse repaired completion text as a rubric evaluation.
///
/// All four integer fields must be present. The caller substitutes the
/// zeroed default on any error here; evaluation never fails loudly.
pub fn validate_evaluation(json_text: &str) -> Result<Evaluation, SchemaError> {
    let value: Value = serde_json::from_str(json_text).map_err(|_| SchemaError::ParseFailure)?;
    let object = value.as_object().ok_or(SchemaError::ParseFailure)?;

    let mut scores = [0i32; 4];
    for (slot, field) in scores.iter_mut().zip(EVALUATION_FIELDS) {
        *slot = object
            .get(field)
            .and_then(Value::as_i64)
            .ok_or(SchemaError::MissingField(field))? as i32;
    }

    Ok(Evaluation {
        knowledge_accuracy: scores[0],
        explanation_quality: scores[1],
        intuitiveness: scores[2],
        overall_score: scores[3],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_strips_fences_at_ends() {
        let raw = "```json\n[{\"question\": \"q\", \"answer\": \"a\"}]\n```";
        let repaired = repair(raw, JsonShape::Array);
        assert_eq!(repaired, "[{\"question\": \"q\", \"answer\": \"a\"}]");
    }

    #[test]
    fn test_repair_strips_fences_anywhere() {
        let raw = "Here you go:\n```json\n[1, 2]\n```\nLet me know if you need more.";
        let repaired = repair(raw, JsonShape::Array);
        assert!(!repaired.contains("```"));
        assert!(repaired.starts_with('['));
        assert!(repaired.ends_with(']'));
    }

    #[test]
    fn test_repair_patches_missing_brackets() {
        assert_eq!(repair("{\"a\": 1}", JsonShape::Array), "[{\"a\": 1}]");
        assert!(repair("\"a\": 1}", JsonShape::Object).starts_with('{'));
        assert!(repair("{\"a\": 1", JsonShape::Object).ends_with('}'));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let inputs = [
            "[{\"question\": \"q\", \"answer\": \"a\"}]",
            "```json\n[1]\n```",
            "not json at all",
            "",
        ];
        for input in inputs {
            let once = repair(input, JsonShape::Array);
            let twice = repair(&once, JsonShape::Array);
            assert_eq!(once, twice, "repair not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_repair_object_shape() {
        let repaired = repair("\"overall_score\": 4}", JsonShape::Object);
        assert_eq!(repaired, "{\"overall_score\": 4}");
    }

    #[test]
    fn test_validate_exact_count_passes_through() {
        let json = r#"[
            {"question": " Q1 ", "answer": "A1"},
            {"question": "Q2", "answer": " A2 "}
        ]"#;
        let cards = validate_flashcards(json, Some(2)).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "Q1");
        assert_eq!(cards[1].answer, "A2");
    }

    #[test]
    fn test_validate_drops_non_object_elements() {
        let json = r#"[
            {"question": "Q1", "answer": "A1"},
            "stray string",
            42,
            {"question": "Q2", "answer": "A2"}
        ]"#;
        let cards = validate_flashcards(json, None).unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "Q1");
        assert_eq!(cards[1].question, "Q2");
    }

    #[test]
    fn test_validate_drops_incomplete_cards() {
        let json = r#"[
            {"question": "Q1", "answer": "A1"},
            {"question": "", "answer": "A2"},
            {"question": "Q3"},
            {"question": "Q4", "answer": "   "}
        ]"#;
        let cards = validate_flashcards(json, None).unwrap();
        assert_eq!(cards.len(), 1);
    }

    #[test]
    fn test_validate_rejects_wrong_count() {
        let json = r#"[
            {"question": "Q1", "answer": "A1"},
            {"question": "Q2", "answer": "A2"},
            {"question": "Q3", "answer": "A3"},
            {"question": "Q4", "answer": "A4"}
        ]"#;
        let result = validate_flashcards(json, Some(5));
        assert_eq!(
            result.unwrap_err(),
            SchemaError::WrongCount {
                expected: 5,
                actual: 4
            }
        );
    }

    #[test]
    fn test_validate_wrong_count_after_dropping_invalid() {
        // Five elements arrive but only four survive field validation.
        let json = r#"[
            {"question": "Q1", "answer": "A1"},
            {"question": "Q2", "answer": "A2"},
            {"question": "Q3", "answer": "A3"},
            {"question": "Q4", "answer": "A4"},
            {"question": "Q5", "answer": ""}
        ]"#;
        assert!(matches!(
            validate_flashcards(json, Some(5)),
            Err(SchemaError::WrongCount { .. })
        ));
    }

    #[test]
    fn test_validate_parse_failure() {
        assert_eq!(
            validate_flashcards("[not json", None).unwrap_err(),
            SchemaError::ParseFailure
        );
    }

    #[test]
    fn test_validate_not_an_array() {
        assert_eq!(
            validate_flashcards("{\"question\": \"q\"}", None).unwrap_err(),
            SchemaError::NotAnArray
        );
    }

    #[test]
    fn test_validate_evaluation_complete() {
        let json = r#"{
            "knowledge_accuracy": 8,
            "explanation_quality": 7,
            "intuitiveness": 6,
            "overall_score": 7
        }"#;
        let evaluation = validate_evaluation(json).unwrap();
        assert_eq!(evaluation.knowledge_accuracy, 8);
        assert_eq!(evaluation.overall_score, 7);
    }

    #[test]
    fn test_validate_evaluation_missing_field() {
        let json = r#"{"knowledge_accuracy": 8, "overall_score": 7}"#;
        assert_eq!(
            validate_evaluation(json).unwrap_err(),
            SchemaError::MissingField("explanation_quality")
        );
    }

    #[test]
    fn test_validate_evaluation_non_integer_score() {
        let json = r#"{
            "knowledge_accuracy": "high",
            "explanation_quality": 7,
            "intuitiveness": 6,
            "overall_score": 7
        }"#;
        assert_eq!(
            validate_evaluation(json).unwrap_err(),
            SchemaError::MissingField("knowledge_accuracy")
        );
    }

    #[test]
    fn test_repair_then_validate_fenced_response() {
        let raw = "```json\n[{\"question\": \"What is X?\", \"answer\": \"X is Y\"}]\n```";
        let cards = validate_flashcards(&repair(raw, JsonShape::Array), Some(1)).unwrap();
        assert_eq!(cards[0].question, "What is X?");
    }
}
