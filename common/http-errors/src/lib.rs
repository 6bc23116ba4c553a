use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

pub const ERROR_CODE_HEADER: &str = "X-Error-Code";

/// Closed set of error kinds surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    MethodNotAllowed,
    DuplicatedEntry,
    Unauthorized,
    Forbidden,
    BadRequest,
    UnprocessableValue,
    TooManyRequests,
    OperationFailed,
    UnknownError,
    InternalError,
}

impl ErrorKind {
    /// Value of the `type` field in the error envelope.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::MethodNotAllowed => "method not allowed",
            ErrorKind::DuplicatedEntry => "duplicated entry",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::UnprocessableValue => "unprocessable value",
            ErrorKind::TooManyRequests => "too many request",
            ErrorKind::OperationFailed => "operation failed",
            ErrorKind::UnknownError => "unknown error",
            ErrorKind::InternalError => "internal error",
        }
    }

    /// Machine-friendly code for the `X-Error-Code` header and metric labels.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::MethodNotAllowed => "method_not_allowed",
            ErrorKind::DuplicatedEntry => "duplicated_entry",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::UnprocessableValue => "unprocessable_value",
            ErrorKind::TooManyRequests => "too_many_requests",
            ErrorKind::OperationFailed => "operation_failed",
            ErrorKind::UnknownError => "unknown_error",
            ErrorKind::InternalError => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorKind::DuplicatedEntry => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::UnprocessableValue => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::OperationFailed => StatusCode::FAILED_DEPENDENCY,
            ErrorKind::UnknownError | ErrorKind::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// One segment of an error location, e.g. `["request body", "accompaniments", 2]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Key(String),
    Index(usize),
}

impl From<&str> for Location {
    fn from(value: &str) -> Self {
        Location::Key(value.to_owned())
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Location::Key(value)
    }
}

impl From<usize> for Location {
    fn from(value: usize) -> Self {
        Location::Index(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub location: Vec<Location>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
    location: Vec<Location>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Vec::new(),
        }
    }

    pub fn with_location<I, L>(mut self, location: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Location>,
    {
        self.location = location.into_iter().map(Into::into).collect();
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotAllowed, message)
    }

    pub fn duplicated_entry(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicatedEntry, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnprocessableValue, message)
    }

    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TooManyRequests, message)
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperationFailed, message)
    }

    /// Logs the underlying cause and hides it from the client.
    pub fn internal<E: fmt::Display>(cause: E) -> Self {
        error!(error = %cause, "internal error");
        Self::new(ErrorKind::InternalError, "internal server error")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &[Location] {
        &self.location
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            errors: vec![ErrorDetail {
                error_type: self.kind.as_str().to_owned(),
                message: self.message.clone(),
                location: self.location.clone(),
            }],
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        let code = self.kind.code();
        let mut resp = (status, Json(self.body())).into_response();
        resp.headers_mut()
            .insert(ERROR_CODE_HEADER, HeaderValue::from_static(code));
        resp
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::unprocessable(value.body_text()).with_location(["request body"])
    }
}

impl From<QueryRejection> for ApiError {
    fn from(value: QueryRejection) -> Self {
        ApiError::unprocessable(value.body_text()).with_location(["query parameter"])
    }
}

impl From<PathRejection> for ApiError {
    fn from(value: PathRejection) -> Self {
        ApiError::unprocessable(value.body_text()).with_location(["path parameter"])
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_type_message_and_location() {
        let err = ApiError::unprocessable("invalid item id")
            .with_location([Location::from("request body"), Location::from("accompaniments"), Location::Index(2)]);
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "errors": [{
                    "type": "unprocessable value",
                    "message": "invalid item id",
                    "location": ["request body", "accompaniments", 2]
                }]
            })
        );
    }

    #[test]
    fn internal_hides_cause() {
        let err = ApiError::internal("connection reset by peer");
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert_eq!(err.message(), "internal server error");
    }
}
