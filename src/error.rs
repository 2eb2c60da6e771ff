use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No remaining draws")]
    QuotaExhausted,

    #[error("No available gifts")]
    NoGiftsAvailable,

    #[error("Claim contention: all retries lost the race")]
    Contention,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status_code, error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                (
                    actix_web::http::StatusCode::BAD_REQUEST,
                    "VALIDATION_ERROR",
                    msg.clone(),
                )
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                (
                    actix_web::http::StatusCode::UNAUTHORIZED,
                    "AUTH_ERROR",
                    msg.clone(),
                )
            }
            AppError::NotFound(msg) => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg.clone(),
            ),
            AppError::QuotaExhausted => (
                actix_web::http::StatusCode::FORBIDDEN,
                "QUOTA_EXHAUSTED",
                "No remaining draws".to_string(),
            ),
            AppError::NoGiftsAvailable => (
                actix_web::http::StatusCode::NOT_FOUND,
                "NO_GIFTS_AVAILABLE",
                "No available gifts".to_string(),
            ),
            AppError::Contention => {
                log::warn!("Gift claim contention after retries");
                (
                    actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
                    "CONTENTION",
                    "Draw lost the race, please retry".to_string(),
                )
            }
            AppError::UpstreamUnavailable(msg) => {
                log::error!("Upstream unavailable: {msg}");
                (
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "UPSTREAM_UNAVAILABLE",
                    "Image host unavailable".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error".to_string(),
                )
            }
            _ => {
                log::error!("Internal error: {self}");
                (
                    actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        HttpResponse::build(status_code).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
