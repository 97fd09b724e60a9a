// src/error.rs
use std::time::Duration;
use thiserror::Error;

/// Failures talking to the trends upstream.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to trends provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("trends provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode trends response: {0}")]
    Decode(String),

    #[error("trends provider did not return a {0} widget")]
    MissingWidget(&'static str),

    #[error("trends provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Failures of a keyword analysis as seen by callers of the pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No trend data available for \"{keyword}\"")]
    EmptySeries { keyword: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),
}
