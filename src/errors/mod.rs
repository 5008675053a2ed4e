use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use validator::ValidationErrors;

/// Per-field validation messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Validation(FieldErrors),
    Conflict(String),
    ConcurrencyConflict(String),
    ReferentialIntegrity(String),
    ExternalPrincipal(String),
    InternalServerError(String),
    DatabaseError(String),
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a FieldErrors>,
}

impl AppError {
    /// Single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(fields)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Validation(fields) => {
                let details = fields
                    .iter()
                    .map(|(field, msgs)| format!("{}: [{}]", field, msgs.join(", ")))
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "Validation failed: {}", details)
            }
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ConcurrencyConflict(msg) => write!(f, "Concurrency Conflict: {}", msg),
            AppError::ReferentialIntegrity(msg) => write!(f, "Referential Integrity: {}", msg),
            AppError::ExternalPrincipal(msg) => write!(f, "Identity Provider Error: {}", msg),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_)
            | AppError::ConcurrencyConflict(_)
            | AppError::ReferentialIntegrity(_) => StatusCode::CONFLICT,
            AppError::ExternalPrincipal(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Validation(fields) => ErrorResponse {
                error: "Validation failed".to_string(),
                fields: Some(fields),
            },
            // Store internals stay in the log, not in the response.
            AppError::DatabaseError(_) => ErrorResponse {
                error: "Database error".to_string(),
                fields: None,
            },
            AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg)
            | AppError::ConcurrencyConflict(msg)
            | AppError::ReferentialIntegrity(msg)
            | AppError::ExternalPrincipal(msg)
            | AppError::InternalServerError(msg) => ErrorResponse {
                error: msg.clone(),
                fields: None,
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        let fields = err
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect::<Vec<_>>();
                (field.to_string(), messages)
            })
            .collect();
        AppError::Validation(fields)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some("23503") => AppError::ReferentialIntegrity(
                    "Record is still referenced by other records".to_string(),
                ),
                Some("23505") => AppError::Conflict("Record already exists".to_string()),
                _ => {
                    log::error!("Database error: {:?}", err);
                    AppError::DatabaseError(err.to_string())
                }
            },
            _ => {
                log::error!("Database error: {:?}", err);
                AppError::DatabaseError(err.to_string())
            }
        }
    }
}
