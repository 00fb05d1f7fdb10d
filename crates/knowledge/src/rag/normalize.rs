//! Normalization of raw model output into an `AnswerResult`.
//!
//! The model is asked for a JSON object but nothing guarantees it sends
//! one. Whatever arrives, the caller gets a well-formed answer: a usable
//! object is cleaned up and clamped, anything else is replaced by text
//! taken from the retrieved context, or by the refusal phrase when there
//! is no context at all.

use crate::rag::types::{clamp_confidence, AnswerPolicy, AnswerResult};
use ragline_prompt::REFUSAL_PHRASE;
use serde_json::{Map, Value};

/// Why raw output could not be used as an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unusable {
    Empty,
    NotJson,
    NotObject,
    MissingAnswer,
    AnswerNotString,
    BlankAnswer,
}

/// Fields recovered from a usable model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAnswer {
    pub answer: String,
    pub sources: Option<Vec<String>>,
    pub confidence: Option<f64>,
}

/// Turn raw model output into the canonical answer. Never fails.
pub fn normalize_response(
    raw: &str,
    sources: &[String],
    context: &str,
    policy: &AnswerPolicy,
) -> AnswerResult {
    match parse_model_output(raw) {
        Ok(parsed) => {
            let sources = match parsed.sources {
                Some(parsed_sources) if !parsed_sources.is_empty() => parsed_sources,
                _ => sources.to_vec(),
            };
            let confidence = parsed.confidence.unwrap_or(policy.default_confidence);

            AnswerResult {
                answer: parsed.answer,
                sources,
                confidence: clamp_confidence(confidence),
            }
        }
        Err(reason) => {
            tracing::warn!(?reason, raw_len = raw.len(), "Model output unusable, falling back");
            fallback_answer(sources, context, policy)
        }
    }
}

/// Parse raw output leniently: surrounding whitespace and a single
/// Markdown code fence are tolerated.
pub fn parse_model_output(raw: &str) -> Result<ParsedAnswer, Unusable> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Unusable::Empty);
    }

    let value: Value =
        serde_json::from_str(strip_code_fence(trimmed)).map_err(|_| Unusable::NotJson)?;
    let object = value.as_object().ok_or(Unusable::NotObject)?;

    let answer = match object.get("answer") {
        None | Some(Value::Null) => return Err(Unusable::MissingAnswer),
        Some(Value::String(answer)) => answer.trim(),
        Some(_) => return Err(Unusable::AnswerNotString),
    };
    if answer.is_empty() {
        return Err(Unusable::BlankAnswer);
    }

    Ok(ParsedAnswer {
        answer: answer.to_string(),
        sources: parse_sources(object),
        confidence: parse_confidence(object),
    })
}

/// String elements of `sources`; other element types are dropped.
fn parse_sources(object: &Map<String, Value>) -> Option<Vec<String>> {
    let items = object.get("sources")?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// A number, or a string holding one. Non-finite values count as absent.
fn parse_confidence(object: &Map<String, Value>) -> Option<f64> {
    let value = match object.get("confidence")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value.filter(|v| v.is_finite())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text
        .strip_prefix("```")
        .and_then(|rest| rest.strip_suffix("```"))
    else {
        return text;
    };

    // The opening line may carry a language tag such as `json`
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}

/// Answer built without the model: collapsed context, or the refusal phrase.
pub fn fallback_answer(sources: &[String], context: &str, policy: &AnswerPolicy) -> AnswerResult {
    let collapsed = context.trim().replace("\n\n", "\n");
    let excerpt: String = collapsed.chars().take(policy.fallback_max_chars).collect();

    if excerpt.trim().is_empty() {
        return AnswerResult {
            answer: REFUSAL_PHRASE.to_string(),
            sources: sources.to_vec(),
            confidence: policy.refusal_confidence,
        };
    }

    AnswerResult {
        answer: excerpt,
        sources: sources.to_vec(),
        confidence: policy.fallback_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const CONTEXT: &str = "We offer consulting and AI implementation.";

    fn sources() -> Vec<String> {
        vec!["https://example.com/services".to_string()]
    }

    fn normalize(raw: &str, context: &str) -> AnswerResult {
        normalize_response(raw, &sources(), context, &AnswerPolicy::default())
    }

    #[test]
    fn test_well_formed_reply_passes_through() {
        let raw = r#"{"answer": "We offer consulting.", "sources": ["https://example.com/services"], "confidence": 0.85}"#;
        let result = normalize(raw, CONTEXT);

        assert_eq!(result.answer, "We offer consulting.");
        assert_eq!(result.sources, sources());
        assert_eq!(result.confidence, 0.85);
    }

    #[test]
    fn test_echo_returns_fields_unchanged_except_clamp() {
        let raw = serde_json::json!({
            "answer": "Echoed answer",
            "sources": ["https://a.example", "file://b.md"],
            "confidence": 2.3
        })
        .to_string();

        let result = normalize_response(&raw, &[], "", &AnswerPolicy::default());

        assert_eq!(result.answer, "Echoed answer");
        assert_eq!(result.sources, vec!["https://a.example", "file://b.md"]);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let low = normalize(r#"{"answer": "x", "confidence": -5}"#, CONTEXT);
        let high = normalize(r#"{"answer": "x", "confidence": 2.3}"#, CONTEXT);

        assert_eq!(low.confidence, 0.0);
        assert_eq!(high.confidence, 1.0);
    }

    #[test]
    fn test_missing_confidence_uses_default() {
        let result = normalize(r#"{"answer": "x", "sources": []}"#, CONTEXT);
        assert_eq!(result.confidence, 0.6);
    }

    #[test]
    fn test_unparseable_confidence_uses_default() {
        for raw in [
            r#"{"answer": "x", "confidence": "high"}"#,
            r#"{"answer": "x", "confidence": null}"#,
            r#"{"answer": "x", "confidence": true}"#,
            r#"{"answer": "x", "confidence": "NaN"}"#,
            r#"{"answer": "x", "confidence": [0.9]}"#,
        ] {
            assert_eq!(normalize(raw, CONTEXT).confidence, 0.6, "raw: {}", raw);
        }
    }

    #[test]
    fn test_numeric_string_confidence_accepted() {
        let result = normalize(r#"{"answer": "x", "confidence": " 0.7 "}"#, CONTEXT);
        assert_eq!(result.confidence, 0.7);
    }

    #[test]
    fn test_missing_sources_uses_retrieval_list() {
        let retrieved = vec![
            "https://example.com/services".to_string(),
            "file://linkedin.md".to_string(),
        ];
        let result = normalize_response(
            r#"{"answer": "x", "confidence": 0.9}"#,
            &retrieved,
            CONTEXT,
            &AnswerPolicy::default(),
        );

        let got: HashSet<_> = result.sources.iter().collect();
        let want: HashSet<_> = retrieved.iter().collect();
        assert_eq!(got, want);
    }

    #[test]
    fn test_empty_or_invalid_sources_use_retrieval_list() {
        for raw in [
            r#"{"answer": "x", "sources": []}"#,
            r#"{"answer": "x", "sources": "https://other.example"}"#,
            r#"{"answer": "x", "sources": [1, null, ""]}"#,
        ] {
            assert_eq!(normalize(raw, CONTEXT).sources, sources(), "raw: {}", raw);
        }
    }

    #[test]
    fn test_non_string_sources_dropped() {
        let result = normalize(
            r#"{"answer": "x", "sources": ["https://a.example", 42, {"url": "b"}, "file://c.md"]}"#,
            CONTEXT,
        );
        assert_eq!(result.sources, vec!["https://a.example", "file://c.md"]);
    }

    #[test]
    fn test_answer_is_trimmed() {
        let result = normalize(r#"{"answer": "  padded answer \n"}"#, CONTEXT);
        assert_eq!(result.answer, "padded answer");
    }

    #[test]
    fn test_empty_answer_treated_as_unparseable() {
        for raw in [
            r#"{"answer": "", "sources": [], "confidence": 0.9}"#,
            r#"{"answer": "   ", "confidence": 0.9}"#,
        ] {
            let result = normalize(raw, CONTEXT);
            assert_eq!(result.answer, CONTEXT);
            assert_eq!(result.confidence, 0.4);
        }
    }

    #[test]
    fn test_unparseable_with_context_falls_back_to_context() {
        let context = format!("{}\n\n{}", "a".repeat(500), "b".repeat(500));

        for raw in ["", "   ", "not json", "[1, 2]", r#""just a string""#, r#"{"answer": 5}"#, r#"{"sources": []}"#] {
            let result = normalize(raw, &context);

            let expected: String = context.replace("\n\n", "\n").chars().take(700).collect();
            assert_eq!(result.answer, expected, "raw: {:?}", raw);
            assert_eq!(result.answer.chars().count(), 700);
            assert_eq!(result.confidence, 0.4);
            assert_eq!(result.sources, sources());
        }
    }

    #[test]
    fn test_unparseable_with_empty_context_refuses() {
        for context in ["", "  \n\n  "] {
            let result = normalize("garbage", context);
            assert_eq!(result.answer, REFUSAL_PHRASE);
            assert_eq!(result.confidence, 0.1);
            assert_eq!(result.sources, sources());
        }
    }

    #[test]
    fn test_fallback_truncates_on_char_boundaries() {
        let context = "é".repeat(800);
        let result = normalize("", &context);
        assert_eq!(result.answer.chars().count(), 700);
        assert!(result.answer.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_fallback_uses_policy_values() {
        let policy = AnswerPolicy {
            default_confidence: 0.5,
            fallback_confidence: 0.3,
            refusal_confidence: 0.05,
            fallback_max_chars: 10,
        };

        let result = normalize_response("oops", &[], "0123456789abcdef", &policy);
        assert_eq!(result.answer, "0123456789");
        assert_eq!(result.confidence, 0.3);

        let refused = normalize_response("oops", &[], "", &policy);
        assert_eq!(refused.confidence, 0.05);

        let parsed = normalize_response(r#"{"answer": "x"}"#, &[], "", &policy);
        assert_eq!(parsed.confidence, 0.5);
    }

    #[test]
    fn test_zero_max_chars_refuses() {
        let policy = AnswerPolicy {
            fallback_max_chars: 0,
            ..AnswerPolicy::default()
        };
        let result = normalize_response("", &[], CONTEXT, &policy);
        assert_eq!(result.answer, REFUSAL_PHRASE);
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let raw = "```json\n{\"answer\": \"fenced\", \"confidence\": 0.9}\n```";
        let result = normalize(raw, CONTEXT);
        assert_eq!(result.answer, "fenced");
        assert_eq!(result.confidence, 0.9);

        let bare = "```{\"answer\": \"bare fence\"}```";
        assert_eq!(normalize(bare, CONTEXT).answer, "bare fence");
    }

    #[test]
    fn test_parse_reasons() {
        assert_eq!(parse_model_output(" "), Err(Unusable::Empty));
        assert_eq!(parse_model_output("{"), Err(Unusable::NotJson));
        assert_eq!(parse_model_output("[]"), Err(Unusable::NotObject));
        assert_eq!(parse_model_output("{}"), Err(Unusable::MissingAnswer));
        assert_eq!(parse_model_output(r#"{"answer": null}"#), Err(Unusable::MissingAnswer));
        assert_eq!(parse_model_output(r#"{"answer": []}"#), Err(Unusable::AnswerNotString));
        assert_eq!(parse_model_output(r#"{"answer": " "}"#), Err(Unusable::BlankAnswer));
    }

    #[test]
    fn test_company_services_scenario() {
        let result = normalize("Sure! We do lots of things.", CONTEXT);

        assert_eq!(
            result,
            AnswerResult {
                answer: CONTEXT.to_string(),
                sources: vec!["https://example.com/services".to_string()],
                confidence: 0.4,
            }
        );
    }

    #[test]
    fn test_every_path_yields_valid_shape() {
        let raws = [
            "",
            "null",
            "{}",
            r#"{"answer": "ok", "confidence": -1e308}"#,
            r#"{"answer": "ok", "confidence": 1e308}"#,
            "```\n```",
        ];

        for raw in raws {
            for context in ["", CONTEXT] {
                let result = normalize(raw, context);
                assert!(!result.answer.trim().is_empty());
                assert!((0.0..=1.0).contains(&result.confidence));
            }
        }
    }
}
