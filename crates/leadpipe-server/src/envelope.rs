use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use leadpipe_core::LeadRecord;
use serde::Serialize;

/// Machine-readable failure codes carried in the `error` field.
#[derive(Clone, Copy, Debug)]
pub enum ErrorCode {
    RateLimited,
    MissingApiKey,
    MissingKeyword,
    NoResults,
    SearchFailed,
    HealthCheckFailed,
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::MissingApiKey => "missing_api_key",
            Self::MissingKeyword => "missing_keyword",
            Self::NoResults => "no_results",
            Self::SearchFailed => "search_failed",
            Self::HealthCheckFailed => "health_check_failed",
            Self::Internal => "internal_error",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::MissingApiKey | Self::MissingKeyword => StatusCode::BAD_REQUEST,
            Self::NoResults => StatusCode::NOT_FOUND,
            Self::SearchFailed | Self::HealthCheckFailed | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadsResponse {
    pub success: bool,
    pub data: Vec<LeadRecord>,
    pub results_count: usize,
    pub total_found: usize,
    pub processing_rate: u32,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: &'static str,
    pub message: String,
}

pub fn failure(code: ErrorCode, message: impl Into<String>) -> Response {
    (
        code.status(),
        Json(ErrorResponse {
            success: false,
            error: code.as_str(),
            message: message.into(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_expected_statuses() {
        assert_eq!(ErrorCode::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ErrorCode::MissingApiKey.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::MissingKeyword.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NoResults.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::SearchFailed.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn leads_response_uses_wire_field_names() {
        let body = LeadsResponse {
            success: true,
            data: Vec::new(),
            results_count: 1,
            total_found: 2,
            processing_rate: 50,
        };
        let js = serde_json::to_value(&body).unwrap();
        assert_eq!(js["resultsCount"], 1);
        assert_eq!(js["totalFound"], 2);
        assert_eq!(js["processingRate"], 50);
    }
}
