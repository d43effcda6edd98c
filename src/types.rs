//! Request and response types for the gacha API.

use serde::{Deserialize, Serialize};

use crate::pipeline::AcquisitionResult;

/// Body of `GET /api/scrape`: exactly one of `horses` or `error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScrapeResponse {
    Horses { horses: Vec<String> },
    Error { error: String },
}

impl From<AcquisitionResult> for ScrapeResponse {
    fn from(result: AcquisitionResult) -> Self {
        match result {
            AcquisitionResult::Success(horses) => Self::Horses { horses },
            AcquisitionResult::Failure { message, .. } => Self::Error { error: message },
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
