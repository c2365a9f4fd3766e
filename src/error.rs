/*
 * Responsibility
 * - HttpException: typed, user-facing HTTP faults with a fixed status/label per kind
 * - ApiError: the one error type middlewares return and the composer renders
 * - IntoResponse impl (HTTP status / JSON error body, fixed wire shapes)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// The recoverable, client-facing fault kinds. Each kind fixes its HTTP
/// status and its error label; only the message varies per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    Conflict,
    UnprocessableEntity,
}

impl ExceptionKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::UnprocessableEntity => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::Conflict => "Conflict",
            Self::UnprocessableEntity => "Unprocessable Entity",
        }
    }
}

/// A terminal, user-facing HTTP fault. Immutable once constructed; thrown by
/// guards and business middleware, consumed exactly once by the composer.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct HttpException {
    kind: ExceptionKind,
    message: String,
}

impl HttpException {
    /// Construct with the kind's default message (its label).
    pub fn new(kind: ExceptionKind) -> Self {
        Self {
            kind,
            message: kind.label().to_string(),
        }
    }

    /// Override the message. The status and label stay fixed by the kind.
    pub fn with_message(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(ExceptionKind::BadRequest)
    }

    pub fn unauthorized() -> Self {
        Self::new(ExceptionKind::Unauthorized)
    }

    pub fn forbidden() -> Self {
        Self::new(ExceptionKind::Forbidden)
    }

    pub fn not_found() -> Self {
        Self::new(ExceptionKind::NotFound)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(ExceptionKind::MethodNotAllowed)
    }

    pub fn conflict() -> Self {
        Self::new(ExceptionKind::Conflict)
    }

    pub fn unprocessable_entity() -> Self {
        Self::new(ExceptionKind::UnprocessableEntity)
    }

    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One schema-validation complaint, pointing at the offending location.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

/// A request whose data failed schema validation. Rendered as a 400 with the
/// full issue list so clients can see every complaint at once.
#[derive(Debug, Clone, Error)]
#[error("request data type check failed")]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

/// Everything a middleware can fail with. The composer matches on the
/// variant; no runtime type inspection anywhere.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Http(#[from] HttpException),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An unexpected server-side fault. The cause is logged; only its
    /// display message reaches the client.
    #[error("{0}")]
    Internal(#[from] anyhow::Error),

    /// A fault with no usable message at all.
    #[error("internal server error")]
    Unexpected,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<&'a [ValidationIssue]>,
    status: u16,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Http(e) => {
                let status = e.kind.status();
                let body = ErrorBody {
                    error: e.kind.label(),
                    message: Some(e.message),
                    issues: None,
                    status: status.as_u16(),
                };
                (status, Json(body)).into_response()
            }
            ApiError::Validation(e) => {
                let body = ErrorBody {
                    error: "BadRequest",
                    message: Some("Request data type check failed".to_string()),
                    issues: Some(e.issues()),
                    status: StatusCode::BAD_REQUEST.as_u16(),
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "handler failed");
                let body = ErrorBody {
                    error: "Internal Server Error",
                    message: Some(err.to_string()),
                    issues: None,
                    status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            ApiError::Unexpected => {
                tracing::error!("handler failed with no message");
                let body = ErrorBody {
                    error: "Internal Server Error",
                    message: None,
                    issues: None,
                    status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
