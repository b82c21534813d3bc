use escrow_payment_engine::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayClientError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid request: {0}")]
    RequestError(String),
    #[error("The request timed out")]
    Timeout,
    #[error("Could not reach the gateway: {0}")]
    Connection(String),
    #[error("Could not deserialize gateway response: {0}")]
    JsonError(String),
    #[error("Gateway returned {status} ({code}): {message}")]
    QueryError { status: u16, code: String, message: String },
}

impl GatewayClientError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() || e.is_request() {
            Self::Connection(e.to_string())
        } else {
            Self::RequestError(e.to_string())
        }
    }
}

// Classifies transport and HTTP failures into the engine's taxonomy. The gateway's own error
// code and message are carried through verbatim.
impl From<GatewayClientError> for GatewayError {
    fn from(e: GatewayClientError) -> Self {
        match e {
            // a timeout means the outcome is unknown, not failed
            GatewayClientError::Timeout => GatewayError::unknown("timeout", "The gateway request timed out"),
            GatewayClientError::Connection(msg) => GatewayError::transient("connection_error", msg),
            GatewayClientError::QueryError { status, code, message } => match status {
                408 | 429 => GatewayError { kind: escrow_payment_engine::GatewayErrorKind::Transient, code, message },
                500..=599 => GatewayError { kind: escrow_payment_engine::GatewayErrorKind::Transient, code, message },
                _ => GatewayError { kind: escrow_payment_engine::GatewayErrorKind::Declined, code, message },
            },
            GatewayClientError::JsonError(msg) => GatewayError::unknown("invalid_response", msg),
            GatewayClientError::Initialization(msg) | GatewayClientError::RequestError(msg) => {
                GatewayError::declined("client_error", msg)
            },
        }
    }
}
