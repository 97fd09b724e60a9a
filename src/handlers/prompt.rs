// src/handlers/prompt.rs
use log::{error, info};
use serde_json::{Map, Value};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use crate::context::AppContext;
use crate::services::prompt::{self, PromptError, DEFAULT_PROMPT_MODEL};

/// Audience, form inputs and model from a raw JSON body.
pub fn parse_prompt_request(body: &Value) -> Result<(String, Map<String, Value>, String), ApiError> {
    let body = body
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Invalid JSON body"))?;

    let audience = body
        .get("audience")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("audience is required (string)"))?;

    // Anything that is not an object counts as no inputs
    let inputs = match body.get("inputs") {
        Some(Value::Object(inputs)) => inputs.clone(),
        _ => Map::new(),
    };

    let model = body
        .get("model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PROMPT_MODEL);

    Ok((audience.to_string(), inputs, model.to_string()))
}

pub async fn generate_prompt(body: Value, ctx: Arc<AppContext>) -> Result<Json, Rejection> {
    let (audience, inputs, model) = parse_prompt_request(&body).map_err(warp::reject::custom)?;

    let relay = ctx.relay.as_ref().ok_or_else(|| {
        error!("Prompt requested but OPENROUTER_API_KEY is not configured");
        warp::reject::custom(ApiError::new("Missing OPENROUTER_API_KEY"))
    })?;

    info!("Generating design prompt for \"{}\" with {} ({} inputs)", audience, model, inputs.len());
    match prompt::generate_prompt(relay, &model, &audience, &inputs).await {
        Ok(generated) => Ok(warp::reply::json(&generated)),
        Err(PromptError::InvalidModelOutput { raw }) => {
            error!("Model {} returned no usable prompt", model);
            Err(warp::reject::custom(ApiError::bad_gateway(
                "Model did not return valid JSON",
                raw,
            )))
        }
        Err(PromptError::Relay(e)) => {
            error!("Prompt generation failed: {:#}", e);
            Err(warp::reject::custom(ApiError::new("Something went wrong")))
        }
    }
}
