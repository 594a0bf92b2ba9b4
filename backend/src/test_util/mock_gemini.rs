use serde_json::{json, Value};

/// `generateContent` response carrying a single text part.
pub fn text_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            },
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {
            "promptTokenCount": 42,
            "candidatesTokenCount": text.split_whitespace().count(),
        }
    })
}

/// A response whose candidate has no text, as when output is blocked.
pub fn empty_response() -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [] },
            "finishReason": "SAFETY"
        }]
    })
}

/// A week plan serialized the way the structured-output mode returns it.
pub fn week_plan_response(theme: &str) -> Value {
    let days: Vec<Value> = [
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday",
        "Sunday",
    ]
    .iter()
    .map(|day| {
        json!({
            "day": day,
            "topic": format!("{} on {}", theme, day),
            "format": "Instagram Post",
            "prompt": format!("Write a short reflection about {}", theme),
        })
    })
    .collect();

    text_response(&Value::Array(days).to_string())
}

pub fn error_json(code: u16, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "status": "INVALID_ARGUMENT"
        }
    })
}
