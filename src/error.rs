use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorMessage {
    ReferralCodeNotFound,
    CustomerNotFound,
    RedemptionNotFound,
    RewardAlreadyRedeemed,
}

impl ErrorMessage {
    pub fn to_str(&self) -> String {
        match self {
            ErrorMessage::ReferralCodeNotFound => "Referral code not found".to_string(),
            ErrorMessage::CustomerNotFound => "No customer found with this email".to_string(),
            ErrorMessage::RedemptionNotFound => "No reward redemption found".to_string(),
            ErrorMessage::RewardAlreadyRedeemed => "Reward already redeemed".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpError {
    pub message: String,
    pub status: StatusCode,
}

impl HttpError {
    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        HttpError {
            message: message.into(),
            status,
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::BAD_REQUEST)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::NOT_FOUND)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        HttpError::new(message, StatusCode::CONFLICT)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HttpError: message: {}, status: {}",
            self.message, self.status
        )
    }
}

impl std::error::Error for HttpError {}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        // Internal details stay in the logs, not in 5xx bodies.
        let message = if self.status.is_server_error() {
            tracing::error!("internal error: {}", self.message);
            "Internal server error".to_string()
        } else {
            self.message
        };

        (
            self.status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}
