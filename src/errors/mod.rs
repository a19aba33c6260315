use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

use crate::coordinator::AssignmentError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    ServiceUnavailable(String),
    DatabaseError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(ErrorResponse { error: msg.clone() }),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse { error: msg.clone() }),
            AppError::Unauthorized(msg) => HttpResponse::Unauthorized().json(ErrorResponse { error: msg.clone() }),
            AppError::Forbidden(msg) => HttpResponse::Forbidden().json(ErrorResponse { error: msg.clone() }),
            AppError::Conflict(msg) => HttpResponse::Conflict().json(ErrorResponse { error: msg.clone() }),
            AppError::ServiceUnavailable(msg) => HttpResponse::ServiceUnavailable().json(ErrorResponse { error: msg.clone() }),
            // Storage details stay in the log.
            AppError::DatabaseError(_) => HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Database error".to_string(),
            }),
        }
    }
}

impl From<AssignmentError> for AppError {
    fn from(err: AssignmentError) -> Self {
        match err {
            AssignmentError::DuplicateManager { .. }
            | AssignmentError::ConcurrencyConflict { .. }
            | AssignmentError::EditSessionExpired => AppError::Conflict(err.to_string()),
            AssignmentError::IneligibleManager(_) => AppError::BadRequest(err.to_string()),
            AssignmentError::NotFound { .. } => AppError::NotFound(err.to_string()),
            AssignmentError::StoreUnavailable(msg) => {
                log::error!("Record store unavailable: {}", msg);
                AppError::ServiceUnavailable("Storage temporarily unavailable, retry later".to_string())
            }
            AssignmentError::Store(msg) => {
                log::error!("Record store failure: {}", msg);
                AppError::DatabaseError(msg)
            }
        }
    }
}
