//! Fixed instruction text shared by every request.

/// Answer the model must give when the context lacks evidence.
///
/// Also used verbatim by answer normalization when there is neither a
/// usable model answer nor any retrieved context.
pub const REFUSAL_PHRASE: &str = "insufficient information in the knowledge base";

/// Shape reminder appended to the user message.
pub const RESPONSE_SHAPE: &str =
    r#"{"answer": "text", "sources": ["url1","url2"], "confidence": 0.8}"#;

/// Process-wide system instruction.
pub const SYSTEM_INSTRUCTION: &str = "You are an assistant that answers using only the information in the 'Context'. \
If there is not enough evidence, answer exactly: \"insufficient information in the knowledge base\". \
Return EXCLUSIVELY a JSON object with the keys: \
answer (string), sources (array of strings), confidence (number between 0 and 1). \
Do not add any text outside the JSON object.";
