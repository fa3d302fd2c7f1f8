//! JSON error responses.
//!
//! Every failure leaves the API as a JSON body with at least a `message`.

use crate::achievements::EngineError;
use crate::store::{ConflictKind, StoreError};
use actix_web::http::StatusCode;
use actix_web::{error::JsonPayloadError, HttpRequest, HttpResponse, ResponseError};
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

pub const ALREADY_CLAIMED: &str = "Token already claimed by this wallet";
pub const CAPACITY_REACHED: &str = "Maximum number of attendees reached";

/// One offending field.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// Malformed body or field-level failures (400)
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// Logged; the client only sees a generic message (500)
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation { message, errors } => {
                write!(f, "{} ({} field errors)", message, errors.len())
            }
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                f.write_str(msg)
            }
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation { message, errors } => ErrorBody {
                message,
                errors: Some(errors.as_slice()),
            },
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Conflict(msg) => {
                ErrorBody {
                    message: msg,
                    errors: None,
                }
            }
            ApiError::Internal(msg) => {
                log::error!("{}", msg);
                ErrorBody {
                    message: "Internal server error",
                    errors: None,
                }
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Conflict(ConflictKind::AlreadyClaimed) => {
                ApiError::Conflict(ALREADY_CLAIMED.to_string())
            }
            StoreError::Conflict(ConflictKind::CapacityReached) => {
                ApiError::Conflict(CAPACITY_REACHED.to_string())
            }
            StoreError::Database(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Store(e) => e.into(),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        let mut errors = Vec::new();
        collect_field_errors("", &e, &mut errors);
        errors.sort_by(|a, b| a.path.cmp(&b.path));
        ApiError::Validation {
            message: "Validation failed".to_string(),
            errors,
        }
    }
}

fn collect_field_errors(prefix: &str, e: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in e.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    out.push(FieldError {
                        path: path.clone(),
                        message: failure
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", failure.code)),
                    });
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_field_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_field_errors(&format!("{}.{}", path, index), nested, out);
                }
            }
        }
    }
}

/// Turns extractor failures into the same shape as field validation.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation {
        message: "Validation failed".to_string(),
        errors: vec![FieldError {
            path: "body".to_string(),
            message: err.to_string(),
        }],
    }
    .into()
}
