use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("The gateway did not respond in time")]
    Timeout,
    #[error("The gateway rejected our credentials: {0}")]
    AuthFailed(String),
    #[error("The gateway rejected the request. Error {code}. {description}")]
    Rejected { code: String, description: String },
    #[error("Invalid callback payload: {0}")]
    MalformedCallback(String),
    #[error("Could not reach the gateway: {0}")]
    Transport(String),
    #[error("Could not deserialize JSON: {0}")]
    Json(String),
}

impl GatewayError {
    /// The error code the gateway uses when an STK push has been accepted, but the customer has not responded yet.
    pub const STILL_PROCESSING_CODE: &'static str = "500.001.1001";

    pub fn is_still_processing(&self) -> bool {
        matches!(self, GatewayError::Rejected { code, .. } if code == Self::STILL_PROCESSING_CODE)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Timeout
        } else if e.is_decode() {
            GatewayError::Json(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}
