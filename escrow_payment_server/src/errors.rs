use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use escrow_payment_engine::{ErrorKind, EscrowApiError};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    ApiError(#[from] EscrowApiError),
}

impl ServerError {
    /// The machine-readable error code included in every error response.
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequestBody(_) => "invalid_request",
            Self::ApiError(e) => match e.kind() {
                ErrorKind::Validation => "invalid_request",
                ErrorKind::NotFound => "not_found",
                ErrorKind::StateConflict => "state_conflict",
                ErrorKind::GatewayDeclined => "gateway_declined",
                ErrorKind::GatewayTransient => "gateway_unavailable",
                ErrorKind::GatewayUnknown => "gateway_outcome_unknown",
                ErrorKind::PartialBatch => "partial_batch",
                ErrorKind::Internal => "internal",
            },
            _ => "internal",
        }
    }

    /// The customer/provider-facing message. Validation and state-conflict errors are safe to
    /// report verbatim; money-movement failures are deliberately coarse, with the gateway detail
    /// retained in the server-side log only.
    fn user_message(&self) -> String {
        match self {
            Self::InvalidRequestBody(_) => self.to_string(),
            Self::ApiError(e) => match e.kind() {
                ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::StateConflict => e.to_string(),
                ErrorKind::GatewayDeclined | ErrorKind::GatewayTransient | ErrorKind::GatewayUnknown => {
                    "The payment operation could not be completed. Please contact support.".into()
                },
                ErrorKind::PartialBatch => {
                    "The operation completed partially and requires follow-up. Please contact support.".into()
                },
                ErrorKind::Internal => "An internal error occurred. Please try again later.".into(),
            },
            _ => "An internal error occurred. Please try again later.".into(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ApiError(e) => match e.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::StateConflict => StatusCode::CONFLICT,
                ErrorKind::GatewayDeclined => StatusCode::PAYMENT_REQUIRED,
                ErrorKind::GatewayTransient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::GatewayUnknown => StatusCode::BAD_GATEWAY,
                ErrorKind::PartialBatch | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) |
            Self::BackendError(_) |
            Self::IOError(_) |
            Self::ConfigurationError(_) |
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // the detailed error stays on the server side for support follow-up
        error!("💻️ Request failed ({}): {self}", self.code());
        let mut body = serde_json::json!({
            "success": false,
            "code": self.code(),
            "error": self.user_message(),
        });
        // partial-batch responses must enumerate what succeeded and what did not, so the failed
        // subset can be replayed
        if let Self::ApiError(EscrowApiError::PartialBatch(detail)) = self {
            body["detail"] = serde_json::json!(detail);
        }
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}
