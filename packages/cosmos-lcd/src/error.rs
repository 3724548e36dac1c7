//! Error types exposed by this package.

/// Errors that can occur while talking to an LCD endpoint.
#[derive(thiserror::Error, Debug)]
pub enum LcdError {
    /// Could not reach the endpoint at all.
    #[error("Network error calling {url}: {source}")]
    Network {
        /// Full URL of the request
        url: String,
        /// Underlying HTTP client error
        source: reqwest::Error,
    },
    /// The request did not complete in time.
    #[error("Request to {url} timed out after {seconds} seconds")]
    Timeout {
        /// Full URL of the request
        url: String,
        /// Configured timeout
        seconds: u32,
    },
    /// The endpoint answered with a non-success status.
    #[error("LCD endpoint {url} returned HTTP status {status}, code {code}: {message}")]
    Endpoint {
        /// Full URL of the request
        url: String,
        /// HTTP status code
        status: u16,
        /// gRPC status code reported by the gateway, 0 if absent
        code: i64,
        /// Error message reported by the gateway, or the raw body
        message: String,
    },
    /// The endpoint answered with something we could not parse.
    #[error("Unable to parse JSON response from {url}: {source}. Body: {body}")]
    InvalidJson {
        /// Full URL of the request
        url: String,
        /// Raw response body
        body: String,
        /// Parse error
        source: serde_json::Error,
    },
    /// The request could not be encoded before sending.
    #[error("Unable to encode request: {0}")]
    Encode(#[from] ChainParseError),
}

/// gRPC status code used by the gateway for missing entities.
const GRPC_NOT_FOUND: i64 = 5;

impl LcdError {
    /// Did the endpoint report that the requested entity does not exist?
    pub fn is_not_found(&self) -> bool {
        match self {
            LcdError::Endpoint {
                status,
                code,
                message,
                ..
            } => {
                *status == 404
                    || *code == GRPC_NOT_FOUND
                    // Some nodes wrap NotFound inside a generic 500.
                    || message.contains("not found")
            }
            _ => false,
        }
    }

    /// Error message reported by the endpoint, if any.
    pub fn endpoint_message(&self) -> Option<&str> {
        match self {
            LcdError::Endpoint { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Should the request layer try again, possibly on a different node?
    pub(crate) fn is_retryable(&self) -> bool {
        match self {
            LcdError::Network { .. } | LcdError::Timeout { .. } => true,
            LcdError::Endpoint { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            LcdError::InvalidJson { .. } | LcdError::Encode(_) => false,
        }
    }
}

/// Errors converting between JSON, protobuf and the types in this crate.
#[derive(thiserror::Error, Debug)]
pub enum ChainParseError {
    #[error("Unsupported message type: {type_url}")]
    UnsupportedMessage { type_url: String },
    #[error("Unsupported public key type: {type_url}")]
    UnsupportedPublicKey { type_url: String },
    #[error("Invalid amount {amount:?} for denom {denom}")]
    InvalidCoinAmount { denom: String, amount: String },
    #[error("Missing field {field} in {context}")]
    MissingField {
        field: &'static str,
        context: &'static str,
    },
    #[error("Unknown sign mode {0}")]
    UnknownSignMode(i32),
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
    #[error("Unable to decode protobuf for {type_url}: {source}")]
    Decode {
        type_url: String,
        source: prost::DecodeError,
    },
    #[error("Invalid JSON for {type_url}: {source}")]
    Json {
        type_url: String,
        source: serde_json::Error,
    },
}
