use aws_sdk_dynamodb::error::{self, ProvideErrorMetadata};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use thiserror::Error;

/// Store error codes that mean the caller lacks permission on the table.
const ACCESS_DENIED_CODES: [&str; 3] = [
    "AccessDeniedException",
    "MissingAuthenticationTokenException",
    "UnrecognizedClientException",
];

/// Store error codes that are worth retrying as-is.
const RETRYABLE_CODES: [&str; 6] = [
    "InternalServerError",
    "ProvisionedThroughputExceededException",
    "RequestLimitExceeded",
    "ThrottlingException",
    "TransactionConflictException",
    "TransactionInProgressException",
];

/// Caller-facing error kind.
///
/// Every [`Error`] maps onto exactly one code; this is what transports see.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ErrorCode {
    /// Missing or invalid configuration.
    ConfigError,
    /// Unknown sort/filter field or malformed filter syntax.
    InvalidFilter,
    /// Continuation token failed to decode.
    InvalidToken,
    /// Single-record update/delete target is absent.
    ItemNotFound,
    /// Some records of a bulk operation failed.
    PartialFailure,
    /// Malformed request shape or document.
    ValidationError,
    /// Unexpected failure, including store access errors.
    InternalError,
}

impl ErrorCode {
    /// HTTP-style status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            Self::ConfigError | Self::InternalError => 500,
            Self::InvalidFilter | Self::InvalidToken | Self::ValidationError => 400,
            Self::ItemNotFound => 404,
            Self::PartialFailure => 207,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Crate error.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// Unknown sort/filter field or malformed filter syntax.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    /// Continuation token failed to decode or does not belong to the query.
    #[error("invalid continuation token: {0}")]
    InvalidToken(String),
    /// Target record is absent.
    #[error("item not found: {0}")]
    ItemNotFound(String),
    /// Bulk operation where some records failed; `details` holds the bulk result.
    #[error("{failed} of {total} records failed")]
    PartialFailure {
        /// Number of failed records.
        failed: usize,
        /// Number of input records.
        total: usize,
        /// Serialized bulk result.
        details: Value,
    },
    /// Malformed request shape or document.
    #[error("validation error: {0}")]
    Validation(String),
    /// The store refused the call for lack of permissions.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A conditional write lost against a concurrent writer.
    #[error("conflicting concurrent write: {0}")]
    Conflict(String),
    /// A store call did not complete in time.
    #[error("store call timed out: {0}")]
    Timeout(String),
    /// Any other store failure.
    #[error("store error: {message}")]
    Store {
        /// Store-provided description.
        message: String,
        /// Whether repeating the call may succeed.
        retryable: bool,
    },
    /// Item conversion failure.
    #[error("item conversion error: {0}")]
    Item(#[from] serde_dynamo::Error),
    /// JSON failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Caller-facing kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::ConfigError,
            Self::InvalidFilter(_) => ErrorCode::InvalidFilter,
            Self::InvalidToken(_) => ErrorCode::InvalidToken,
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::PartialFailure { .. } => ErrorCode::PartialFailure,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::PermissionDenied(_)
            | Self::Conflict(_)
            | Self::Timeout(_)
            | Self::Store { .. }
            | Self::Item(_)
            | Self::Json(_)
            | Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether the same call may succeed if repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict(_) | Self::Timeout(_) => true,
            Self::Store { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Render the `{code, message, statusCode, details?}` triple for transports.
    pub fn to_response(&self) -> Value {
        let code = self.code();
        let mut response = json!({
            "code": code,
            "message": self.to_string(),
            "statusCode": code.status_code(),
        });
        if let Self::PartialFailure { details, .. } = self {
            response["details"] = details.clone();
        }
        response
    }
}

impl From<error::BuildError> for Error {
    fn from(err: error::BuildError) -> Self {
        Self::Internal(format!("invalid store request: {err}"))
    }
}

impl<E, R> From<error::SdkError<E, R>> for Error
where
    E: ProvideErrorMetadata,
{
    fn from(err: error::SdkError<E, R>) -> Self {
        let retryable_transport = matches!(
            err,
            error::SdkError::DispatchFailure(_) | error::SdkError::ResponseError(_)
        );
        if let error::SdkError::TimeoutError(_) = err {
            return Self::Timeout("the store client gave up waiting for a response".to_string());
        }
        let (code, message) = match err.as_service_error() {
            Some(service_error) => (
                service_error.code().unwrap_or_default().to_string(),
                service_error.message().unwrap_or("no message").to_string(),
            ),
            None => (String::new(), "the request did not reach the store".to_string()),
        };
        if ACCESS_DENIED_CODES.contains(&code.as_str()) {
            return Self::PermissionDenied(format!(
                "the configured credentials are not allowed to access the table ({code})"
            ));
        }
        match code.as_str() {
            "ResourceNotFoundException" => Self::Config(format!("table not found: {message}")),
            "TransactionCanceledException" if message.contains("ConditionalCheckFailed") => {
                Self::Conflict(message)
            }
            "TransactionCanceledException" => Self::Store {
                retryable: message.contains("TransactionConflict")
                    || message.contains("ThrottlingError"),
                message,
            },
            _ => Self::Store {
                retryable: retryable_transport || RETRYABLE_CODES.contains(&code.as_str()),
                message: if code.is_empty() {
                    message
                } else {
                    format!("{code}: {message}")
                },
            },
        }
    }
}

/// Per-record failure attached to bulk results.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct OperationError {
    /// Record id, when one was known.
    pub id: Option<String>,
    /// Failure kind.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
}

impl OperationError {
    /// Capture `error` for the record `id`.
    pub fn new(id: Option<String>, error: &Error) -> Self {
        Self {
            id,
            code: error.code(),
            message: error.to_string(),
        }
    }
}
