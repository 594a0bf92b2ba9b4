//! Prompt templates for the generation workflow.

use mindful_common::ContentType;
use serde_json::{json, Value};

/// Prefix every generated piece must start with.
pub const DISCLAIMER: &str = "Disclaimer: This content is for informational purposes only and is not a substitute for professional mental health advice.";

/// Tone and safety constraints sent as the system instruction on every call.
pub fn system_instruction() -> String {
    format!(
        "You are an AI assistant specialized in creating content for mental health professionals. \
         Your tone should be empathetic, supportive, and professional. \
         The content must be general advice and must not be presented as clinical diagnosis or treatment. \
         Start every response with a disclaimer: '{}'",
        DISCLAIMER
    )
}

/// Instruction for the persona sub-workflow. No disclaimer: the output is
/// context for later prompts, not publishable content.
pub fn persona_system_instruction() -> &'static str {
    "You help mental health professionals understand their audience. \
     Respond with a single paragraph only, with no heading, list or disclaimer."
}

pub fn generate_prompt(topic: &str, content_type: ContentType, persona: Option<&str>) -> String {
    let mut prompt = format!(
        "Generate a \"{}\" about the following topic: \"{}\"",
        content_type.label(),
        topic.trim()
    );
    if let Some(persona) = persona.map(str::trim).filter(|p| !p.is_empty()) {
        prompt.push_str(&format!(
            "\n\nWrite it for this target audience persona:\n{}",
            persona
        ));
    }
    prompt
}

pub fn refine_prompt(previous: &str, instruction: &str) -> String {
    format!(
        "Refine the following content. Instruction: \"{}\".\n\nKeep the disclaimer at the start.\n\nOriginal content:\n{}",
        instruction.trim(),
        previous.trim()
    )
}

pub fn persona_prompt(audience: &str) -> String {
    format!(
        "Create a one-paragraph audience persona for a mental health professional's content, \
         based on this description: \"{}\". Describe who they are, what they struggle with, \
         and what kind of content helps them.",
        audience.trim()
    )
}

pub fn plan_prompt(theme: &str) -> String {
    format!(
        "Create a 7-day social media content plan for a mental health professional. \
         Overall theme: \"{}\". For each day from Monday to Sunday give the day name, \
         a specific topic, a content format (for example Instagram Post, Short Video Script, \
         Blog Post Idea or Client Worksheet Idea), and a short prompt that could be used to \
         generate that piece.",
        theme.trim()
    )
}

/// Response schema for the weekly plan: an array of day entries.
pub fn plan_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "day": { "type": "STRING" },
                "topic": { "type": "STRING" },
                "format": { "type": "STRING" },
                "prompt": { "type": "STRING" }
            },
            "required": ["day", "topic", "format", "prompt"],
            "propertyOrdering": ["day", "topic", "format", "prompt"]
        }
    })
}
