use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use pesa_engine::{OrderApiError, PaymentFlowError, ReconciliationError};
use pesa_gateway::GatewayError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("A payment for this checkout is already in progress or complete")]
    DuplicateRequest(String),
    #[error("The payment gateway rejected the request. {0}")]
    GatewayRejected(String),
    #[error("The payment gateway rejected our credentials. {0}")]
    GatewayAuthFailed(String),
    #[error("The payment gateway did not respond in time")]
    GatewayTimeout,
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::DuplicateRequest(_) => StatusCode::CONFLICT,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::GatewayRejected(_) => StatusCode::BAD_GATEWAY,
            Self::GatewayAuthFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::PoorlyFormattedToken(_) => StatusCode::BAD_REQUEST,
            },
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::DuplicateRequest(id) => json!({ "error": self.to_string(), "correlationId": id }),
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Access token is invalid. {0}")]
    ValidationError(String),
    #[error("Access token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
}

impl From<GatewayError> for ServerError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Timeout => Self::GatewayTimeout,
            GatewayError::AuthFailed(s) => Self::GatewayAuthFailed(s),
            GatewayError::Initialization(s) => Self::InitializeError(s),
            e @ (GatewayError::Rejected { .. } |
            GatewayError::Transport(_) |
            GatewayError::Json(_) |
            GatewayError::MalformedCallback(_)) => Self::GatewayRejected(e.to_string()),
        }
    }
}

impl From<PaymentFlowError> for ServerError {
    fn from(e: PaymentFlowError) -> Self {
        match e {
            PaymentFlowError::Validation(e) => Self::ValidationError(e.to_string()),
            PaymentFlowError::InvalidRequest(s) => Self::InvalidRequestBody(s),
            PaymentFlowError::DuplicateRequest(id) => Self::DuplicateRequest(id),
            PaymentFlowError::Gateway(e) => e.into(),
            PaymentFlowError::Store(e) => Self::BackendError(e.to_string()),
            e @ PaymentFlowError::PaymentNotFound(_) => Self::NoRecordFound(e.to_string()),
            e @ (PaymentFlowError::AlreadyTerminal { .. } | PaymentFlowError::NotCompleted(_)) => {
                Self::Conflict(e.to_string())
            },
            e @ PaymentFlowError::Forbidden(_) => Self::InsufficientPermissions(e.to_string()),
        }
    }
}

impl From<OrderApiError> for ServerError {
    fn from(e: OrderApiError) -> Self {
        match e {
            e @ OrderApiError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            e @ OrderApiError::ForbiddenTransition { .. } => Self::Conflict(e.to_string()),
            OrderApiError::InvalidOrder(s) => Self::InvalidRequestBody(s),
            OrderApiError::Store(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<ReconciliationError> for ServerError {
    fn from(e: ReconciliationError) -> Self {
        match e {
            e @ ReconciliationError::InProgress(_) => Self::Conflict(e.to_string()),
            ReconciliationError::Store(e) => Self::BackendError(e.to_string()),
        }
    }
}
