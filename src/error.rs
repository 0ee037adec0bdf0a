use thiserror::Error;

/// Failures raised by the ADO and model gateways.
///
/// Callers turn these into user-facing messages at the operation boundary.
/// Nothing here is retried automatically.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(
        "Access denied: your Azure DevOps personal access token has expired or is invalid. \
         Update ADO_PAT_TOKEN and try again."
    )]
    Auth,

    #[error("{what} not found")]
    NotFound { what: String },

    #[error("Azure DevOps request failed: {status} - {body}")]
    Remote { status: u16, body: String },

    #[error("Model endpoint error: {status} - {body}")]
    ModelGateway { status: u16, body: String },

    #[error("Failed to parse JSON from model response ({reason}): {raw}")]
    MalformedModelOutput { raw: String, reason: String },

    #[error("Response has an unexpected shape, expected {expected}: {detail}")]
    UnexpectedShape {
        expected: &'static str,
        detail: String,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Auth failures end a batch: every following call would be rejected the same way.
    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth)
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
