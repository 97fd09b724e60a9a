// src/services/prompt.rs
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::services::openrouter::{extract_json, ChatMessage, ChatOutcome, ChatRequest, OpenRouterClient};

pub const DEFAULT_PROMPT_MODEL: &str = "deepseek/deepseek-r1:free";

const TOOL_NAME: &str = "emit_prompt";

const TOOL_SYSTEM_PROMPT: &str = "You are an expert in professional design prompt engineering. \
Always return outputs ONLY through the provided function tool, never in plain text. \
Your job is to transform tasks into highly optimized creative prompts for generative design AI tools. \
The result must be JSON with two keys: \
- 'final_prompt': the optimized design prompt (ready-to-use, standalone, polished, <1600 chars). \
- 'template_prompt': a structured reusable version with placeholders. \
Do not explain, do not add commentary. Always respect all mandatory rules, negatives, and technical specifications.";

const JSON_SYSTEM_PROMPT: &str =
    "You must return a single JSON object matching the provided schema. No prose, no markdown, no code fences.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedPrompt {
    pub audience: String,
    pub prompt: String,
    pub template: String,
}

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Model did not return valid JSON")]
    InvalidModelOutput { raw: Value },

    #[error(transparent)]
    Relay(#[from] anyhow::Error),
}

/// Instructions for a print-ready, design-only prompt plus a reusable template.
pub fn build_task() -> String {
    [
        "TASK: Create one single highly-optimized, professional design prompt for generative design tools (Midjourney, SDXL, DALL·E). ",
        "1. SUBJECT: Provide an ultra-specific and visually rich description of [SUBJECT]. Focus on fine details, unique attributes, and key defining features. ",
        "2. STYLE: Specify artistic style, movement, or school (e.g. Bauhaus, Surrealism, Ukiyo-e, Cyberpunk). Include references to famous artists or design techniques if appropriate. ",
        "3. COMPOSITION: Give precise layout instructions (symmetry, balance, focal point, perspective, background treatment). ",
        "4. COLOR: Define a deliberate color palette with exact hues (e.g. 'deep ultramarine blue', 'soft pastel peach'). ",
        "5. LIGHTING: Describe lighting setup (cinematic, natural, neon glow, chiaroscuro, backlit, golden hour). ",
        "6. MOOD: Convey emotional tone (e.g. calm, vibrant, nostalgic, futuristic). ",
        "7. MATERIAL/TEXTURE: Add tactile qualities (smooth metallic, rough canvas, glossy ceramic). ",
        "8. CAMERA/FORMAT: If relevant, specify angle, lens type, or vector-style (e.g. 'flat vector graphic, clean outlines'). ",
        "9. DIMENSIONS: If aspect ratio applies, include it (e.g. 1:1, 4:5, 16:9). ",
        "MANDATORY for Print-on-Demand: The output must be a DESIGN-ONLY artwork prompt, never a mockup. ",
        "Required details: isolated graphic design, perfectly centered composition, transparent background, no environmental context, ",
        "no shadows, no reflections, print-ready vector or high-resolution format. ",
        "Technical Specs: 4500x5400px, PNG 300 DPI or vector SVG. ",
        "Hard NEGATIVES: Never include t-shirt, hoodie, clothing, apparel, model, person, body parts, hands, mannequin, hanger, tag, label, wrinkles, studio, room, flatlay, mockup, or any physical product context. ",
        "Keep the full prompt under 1400 characters for optimal model performance. ",
        "ALSO OUTPUT a REUSABLE TEMPLATE version with placeholders: [SUBJECT], [STYLE], [COLOR_PALETTE], [MOOD], [LIGHTING], [MATERIAL], [COMPOSITION]. ",
        "Make placeholders intuitive, clearly labeled, and easy for non-designers to customize while preserving structure and quality.",
    ]
    .concat()
}

pub fn prompt_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "audience": { "type": "string", "description": "Echo the provided audience exactly." },
            "prompt": { "type": "string", "description": "The final optimized design prompt." },
            "template": { "type": "string", "description": "A reusable template version with placeholders for customization." }
        },
        "required": ["audience", "prompt", "template"]
    })
}

/// A candidate is usable only if all three fields are non-empty strings.
fn usable(candidate: &Value) -> Option<GeneratedPrompt> {
    let field = |name: &str| {
        candidate
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };

    Some(GeneratedPrompt {
        audience: field("audience")?,
        prompt: field("prompt")?,
        template: field("template")?,
    })
}

fn lacks_tool_support(outcome: &ChatOutcome) -> bool {
    outcome.status.as_u16() == 404
        || outcome
            .response
            .error
            .as_ref()
            .map_or(false, |e| e.message.to_lowercase().contains("support tool use"))
}

fn from_tool_outcome(outcome: &ChatOutcome) -> Option<GeneratedPrompt> {
    let message = outcome.response.first_message()?;

    let from_tool = message
        .tool_calls
        .first()
        .filter(|call| call.function.name == TOOL_NAME)
        .and_then(|call| extract_json(&call.function.arguments))
        .and_then(|args| usable(&args));

    from_tool.or_else(|| {
        let content = message.content.as_deref()?;
        usable(&extract_json(content)?)
    })
}

fn context_json(audience: &str, inputs: &Map<String, Value>) -> String {
    json!({ "audience": audience, "inputs": inputs }).to_string()
}

/// Generate a design prompt for `audience` from the form `inputs`, using `model`.
///
/// Tries a forced function call first; falls back to JSON mode when the model
/// has no tool support or gives nothing usable.
pub async fn generate_prompt(
    client: &OpenRouterClient,
    model: &str,
    audience: &str,
    inputs: &Map<String, Value>,
) -> Result<GeneratedPrompt, PromptError> {
    let task = build_task();
    let schema = prompt_schema();
    let context = context_json(audience, inputs);

    let tools_request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(TOOL_SYSTEM_PROMPT),
            ChatMessage::user(task.clone()),
            ChatMessage::user(context.clone()),
        ],
        tools: Some(json!([{
            "type": "function",
            "function": {
                "name": TOOL_NAME,
                "description": "Return the final optimized design prompt and template as JSON.",
                "parameters": schema
            }
        }])),
        tool_choice: Some(json!({ "type": "function", "function": { "name": TOOL_NAME } })),
        temperature: Some(0.35),
        top_p: Some(0.9),
        max_tokens: Some(900),
        ..Default::default()
    };

    let outcome = client.send_chat(&tools_request).await?;
    if lacks_tool_support(&outcome) {
        info!("Model {} has no tool support, using JSON mode", model);
    } else if let Some(generated) = from_tool_outcome(&outcome) {
        info!("Design prompt generated through tool call ({} characters)", generated.prompt.len());
        return Ok(generated);
    } else {
        warn!("Tool call attempt with {} gave no usable prompt, using JSON mode", model);
    }

    let json_request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(JSON_SYSTEM_PROMPT),
            ChatMessage::user(task),
            ChatMessage::user(format!(
                "Schema: {}\nContext: {}\nReturn exactly: {{\"audience\":\"{}\",\"prompt\":\"...\",\"template\":\"...\"}}",
                schema, context, audience
            )),
        ],
        response_format: Some(json!({ "type": "json_object" })),
        temperature: Some(0.3),
        top_p: Some(0.9),
        max_tokens: Some(900),
        stop: Some(vec!["```".to_string()]),
        ..Default::default()
    };

    let outcome = client.send_chat(&json_request).await?;
    let content = outcome.response.first_content();
    if let Some(generated) = content.and_then(extract_json).as_ref().and_then(usable) {
        info!("Design prompt generated in JSON mode ({} characters)", generated.prompt.len());
        return Ok(generated);
    }

    let raw = match content {
        Some(text) => Value::String(text.to_string()),
        None => outcome.raw,
    };
    Err(PromptError::InvalidModelOutput { raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::openrouter::ChatResponse;
    use reqwest::StatusCode;

    fn outcome(status: u16, body: Value) -> ChatOutcome {
        ChatOutcome {
            status: StatusCode::from_u16(status).unwrap(),
            response: serde_json::from_value::<ChatResponse>(body.clone()).unwrap_or_default(),
            raw: body,
        }
    }

    #[test]
    fn usable_requires_all_fields() {
        assert!(usable(&json!({"audience": "moms", "prompt": "p", "template": "t"})).is_some());
        assert!(usable(&json!({"audience": "moms", "prompt": "p"})).is_none());
        assert!(usable(&json!({"audience": "moms", "prompt": "", "template": "t"})).is_none());
        assert!(usable(&json!({"audience": "moms", "prompt": 3, "template": "t"})).is_none());
    }

    #[test]
    fn detects_missing_tool_support() {
        assert!(lacks_tool_support(&outcome(404, json!({}))));
        assert!(lacks_tool_support(&outcome(
            400,
            json!({"error": {"message": "This model does not Support Tool Use"}})
        )));
        assert!(!lacks_tool_support(&outcome(200, json!({"choices": []}))));
    }

    #[test]
    fn reads_tool_call_arguments() {
        let args = json!({"audience": "gamers", "prompt": "neon dragon", "template": "[SUBJECT] dragon"}).to_string();
        let o = outcome(200, json!({
            "choices": [{"message": {"content": null, "tool_calls": [
                {"id": "1", "type": "function", "function": {"name": "emit_prompt", "arguments": args}}
            ]}}]
        }));
        let generated = from_tool_outcome(&o).unwrap();
        assert_eq!(generated.audience, "gamers");
        assert_eq!(generated.template, "[SUBJECT] dragon");
    }

    #[test]
    fn falls_back_to_message_content() {
        let o = outcome(200, json!({
            "choices": [{"message": {"content": "```json\n{\"audience\":\"a\",\"prompt\":\"p\",\"template\":\"t\"}\n```",
                         "tool_calls": [{"function": {"name": "other_tool", "arguments": "{}"}}]}}]
        }));
        assert_eq!(from_tool_outcome(&o).unwrap().prompt, "p");
    }

    #[test]
    fn task_carries_pod_rules() {
        let task = build_task();
        assert!(task.starts_with("TASK: Create one single"));
        assert!(task.contains("DESIGN-ONLY"));
        assert!(task.contains("[COLOR_PALETTE]"));
    }
}
