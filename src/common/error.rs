// src/common/error.rs

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::storage::StorageError;

// O tipo de erro único de serviços e repositórios.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error")]
    ValidationError(#[from] validator::ValidationErrors),

    // Validação sem campo específico (ex: arquivo ausente)
    #[error("{0}")]
    Invalid(String),

    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("User not found")]
    UnknownUser,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // Compare-and-swap da versão do lote falhou
    #[error("Batch was modified by another request; reload and retry")]
    StaleWrite,

    #[error("File storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Bcrypt error: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

// Rejeições dos extratores viram erro de validação
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Invalid(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Invalid(rejection.body_text())
    }
}

impl AppError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        AppError::Conflict(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Invalid(message.into())
    }

    /// Tipo legível por máquina enviado no campo `error` da resposta.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) | AppError::Invalid(_) => "validation_error",
            AppError::MissingToken | AppError::InvalidToken | AppError::InvalidCredentials => {
                "unauthenticated"
            }
            AppError::UnknownUser | AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::UsernameTaken | AppError::Conflict(_) | AppError::StaleWrite => "conflict",
            AppError::Storage(_) => "storage_error",
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::Invalid(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::InvalidToken | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            // Login e registro mantêm 400, como o frontend espera
            AppError::UnknownUser | AppError::UsernameTaken => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::StaleWrite => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_)
            | AppError::InternalServerError(_)
            | AppError::BcryptError(_)
            | AppError::JwtError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        let body = match &self {
            AppError::ValidationError(errors) => {
                let mut details = std::collections::BTreeMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": kind,
                    "message": "One or more fields are invalid.",
                    "details": details,
                })
            }
            AppError::Storage(e) => {
                tracing::error!("Falha no object storage: {}", e);
                json!({ "error": kind, "message": "File storage is unavailable." })
            }
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                // O detalhe fica só no log, nunca na resposta
                tracing::error!("Erro interno do servidor: {}", e);
                json!({ "error": kind, "message": "An unexpected error occurred." })
            }
            e => json!({ "error": kind, "message": e.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
