use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// One failed rule on one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    #[schema(example = "status")]
    pub field: String,
    #[schema(example = "must be one of: present, absent, late")]
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Uniform error body: `{ "message", "status" }`, plus `errors` for validation failures.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Validation failed")]
    pub message: String,
    #[schema(example = 400)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "Validation failed")]
    Validation(Vec<FieldError>),
    #[display(fmt = "{}", _0)]
    BadRequest(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Conflict(String),
    #[display(fmt = "Internal Server Error")]
    Database(sqlx::Error),
    #[display(fmt = "Internal Server Error")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return AppError::Conflict("Resource already exists".to_string());
            }
            if db_err.is_foreign_key_violation() {
                return AppError::BadRequest("Referenced resource does not exist".to_string());
            }
        }
        AppError::Database(e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Database(e) => error!(error = %e, "Database error"),
            AppError::Internal(detail) => error!(detail = %detail, "Internal error"),
            _ => {}
        }

        let status = self.status_code();
        let errors = match self {
            AppError::Validation(errors) => errors.clone(),
            _ => Vec::new(),
        };

        HttpResponse::build(status).json(ErrorBody {
            message: self.to_string(),
            status: status.as_u16(),
            errors,
        })
    }
}
