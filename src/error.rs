//! Application error taxonomy and its HTTP mapping.
//!
//! Every layer below `http` returns its own error type (`DbError`,
//! `DiceError`, `GeneratorError`); they all funnel into [`AppError`],
//! which renders as `{ "error": ..., "code": ..., "details"?: ... }`.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use serde_with::skip_serializing_none;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::db::DbError;
use crate::game::dice::DiceError;
use crate::generator::GeneratorError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    BadRequest {
        message: String,
        details: Option<Value>,
    },
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },
    #[error("{0}")]
    Conflict(String),
    /// Cause is logged, never shown to the client.
    #[error("service temporarily unavailable")]
    Transient(String),
    #[error("internal server error")]
    Internal(String),
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub details: Option<Value>,
}

impl AppError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest {
            message: msg.into(),
            details: None,
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::Validation {
            message: msg.into(),
            details: None,
        }
    }

    /// Validation failure pinned to a single request field.
    pub fn invalid_field(field: &str, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        AppError::Validation {
            details: Some(json!({ field: [msg.clone()] })),
            message: msg,
        }
    }

    /// Stable, machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest { .. } => "bad_request",
            AppError::Validation { .. } => "validation_failed",
            AppError::Conflict(_) => "conflict",
            AppError::Transient(_) => "unavailable",
            AppError::Internal(_) => "internal",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::BadRequest { details, .. } | AppError::Validation { details, .. } => {
                details.clone()
            }
            _ => None,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Transient(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Transient(cause) => log::error!("transient failure: {cause}"),
            AppError::Internal(cause) => log::error!("internal error: {cause}"),
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
            code: self.code(),
            details: self.details(),
        })
    }
}

impl From<DbError> for AppError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound => AppError::not_found("resource not found"),
            DbError::Conflict { constraint } => {
                AppError::Conflict(format!("resource already exists ({constraint})"))
            }
            DbError::ForeignKey { .. } => {
                AppError::bad_request("request references a resource that does not exist")
            }
            DbError::Transient(e) => AppError::Transient(e.to_string()),
            DbError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<DiceError> for AppError {
    fn from(err: DiceError) -> Self {
        let details = match &err {
            DiceError::InvalidNotation {
                notation, field, ..
            } => Some(json!({ "field": field.as_str(), "notation": notation })),
            DiceError::BatchSize(n) => Some(json!({ "count": n })),
            DiceError::ContradictoryModifiers { notation } => Some(json!({ "notation": notation })),
        };
        AppError::BadRequest {
            message: err.to_string(),
            details,
        }
    }
}

impl From<GeneratorError> for AppError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Invalid { .. } => AppError::bad_request(err.to_string()),
            GeneratorError::Transient(_) | GeneratorError::Config(_) => {
                AppError::Transient(err.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errs: ValidationErrors) -> Self {
        let mut details = Map::new();
        collect_field_errors(&errs, &mut details);
        AppError::Validation {
            message: "request validation failed".into(),
            details: Some(Value::Object(details)),
        }
    }
}

/// Flattened request bodies report nested struct errors under the same keys.
fn collect_field_errors(errs: &ValidationErrors, out: &mut Map<String, Value>) {
    for (field, kind) in errs.errors() {
        match kind {
            ValidationErrorsKind::Field(field_errs) => {
                let messages = field_errs
                    .iter()
                    .map(|e| {
                        let msg = e
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string());
                        Value::String(msg)
                    })
                    .collect();
                out.insert(field.to_string(), Value::Array(messages));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, out),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_field_errors(inner, out);
                }
            }
        }
    }
}
