// src/handlers/error.rs
use serde_json::{json, Value};
use std::fmt;
use warp::http::StatusCode;
use warp::reject::Reject;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub message: Option<String>,
    /// Unusable upstream output, echoed back for debugging
    pub raw: Option<Value>,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: error.into(),
            message: None,
            raw: None,
        }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            ..ApiError::new(error)
        }
    }

    pub fn analysis_failed(message: impl Into<String>) -> Self {
        ApiError {
            message: Some(message.into()),
            ..ApiError::new("Failed to analyze keyword")
        }
    }

    pub fn bad_gateway(error: impl Into<String>, raw: Value) -> Self {
        ApiError {
            status: StatusCode::BAD_GATEWAY,
            raw: Some(raw),
            ..ApiError::new(error)
        }
    }

    pub fn body(&self) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.error,
        });
        if let Some(message) = &self.message {
            body["message"] = json!(message);
        }
        if let Some(raw) = &self.raw {
            body["raw"] = raw.clone();
        }
        body
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {}", self.error, message),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ApiError {}
impl Reject for ApiError {}
