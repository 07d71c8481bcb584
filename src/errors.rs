use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// Main error type for the campus-notify service
#[derive(Debug)]
pub enum NotifyError {
    // Trigger surface errors
    BadRequest(String),
    NotFound(String),
    InternalServer(String),

    // Document store errors
    StoreLookup(String),
    StoreQuery(String),
    DocumentDecode(String),

    // Delivery provider errors
    FcmDelivery(String),
    FcmInvalidToken(String),
    FcmQuotaExceeded,

    // Network and HTTP client errors
    NetworkTimeout,
    NetworkConnection(String),
    HttpClient(String),

    // Serialization and parsing errors
    JsonParsing(String),
    JsonSerialization(String),
    InvalidFormat(String),

    // Dispatch logic errors
    UnmappedRole(String),

    // Configuration and setup errors
    ConfigurationError(String),
    MissingEnvironmentVariable(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            NotifyError::NotFound(msg) => write!(f, "Not found: {}", msg),
            NotifyError::InternalServer(msg) => write!(f, "Internal server error: {}", msg),

            NotifyError::StoreLookup(msg) => write!(f, "Document store lookup error: {}", msg),
            NotifyError::StoreQuery(msg) => write!(f, "Document store query error: {}", msg),
            NotifyError::DocumentDecode(msg) => write!(f, "Document decode error: {}", msg),

            NotifyError::FcmDelivery(msg) => write!(f, "FCM delivery error: {}", msg),
            NotifyError::FcmInvalidToken(msg) => write!(f, "Invalid FCM token: {}", msg),
            NotifyError::FcmQuotaExceeded => write!(f, "FCM quota exceeded"),

            NotifyError::NetworkTimeout => write!(f, "Network request timed out"),
            NotifyError::NetworkConnection(msg) => write!(f, "Network connection error: {}", msg),
            NotifyError::HttpClient(msg) => write!(f, "HTTP client error: {}", msg),

            NotifyError::JsonParsing(msg) => write!(f, "JSON parsing error: {}", msg),
            NotifyError::JsonSerialization(msg) => write!(f, "JSON serialization error: {}", msg),
            NotifyError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),

            NotifyError::UnmappedRole(role) => write!(f, "No collection mapped for role: {}", role),

            NotifyError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            NotifyError::MissingEnvironmentVariable(var) => {
                write!(f, "Missing environment variable: {}", var)
            }
        }
    }
}

impl std::error::Error for NotifyError {}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            NotifyError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            NotifyError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),

            // All other errors are treated as internal server errors
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", self.to_string()),
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, axum::Json(error_response)).into_response()
    }
}

// Convenience type alias for Results
pub type NotifyResult<T> = Result<T, NotifyError>;

// Conversion implementations for common error types
impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotifyError::NetworkTimeout
        } else if err.is_connect() {
            NotifyError::NetworkConnection(err.to_string())
        } else {
            NotifyError::HttpClient(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_syntax() {
            NotifyError::JsonParsing(err.to_string())
        } else {
            NotifyError::JsonSerialization(err.to_string())
        }
    }
}

impl From<chrono::ParseError> for NotifyError {
    fn from(err: chrono::ParseError) -> Self {
        NotifyError::InvalidFormat(format!("Invalid date/time format: {}", err))
    }
}

// Helper functions for creating common errors
impl NotifyError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        NotifyError::BadRequest(msg.into())
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        NotifyError::NotFound(resource.into())
    }

    pub fn internal_error(msg: impl Into<String>) -> Self {
        NotifyError::InternalServer(msg.into())
    }

    pub fn store_lookup(msg: impl Into<String>) -> Self {
        NotifyError::StoreLookup(msg.into())
    }

    pub fn store_query(msg: impl Into<String>) -> Self {
        NotifyError::StoreQuery(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        NotifyError::ConfigurationError(msg.into())
    }
}
