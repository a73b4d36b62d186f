// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::middleware::i18n::Locale;

// Erros de domínio. Todos são recuperáveis: o handler decide o status HTTP.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário sem acesso a esta empresa")]
    TenantAccessDenied,

    #[error("Unidade não encontrada")]
    UnitNotFound,

    #[error("Proposta não encontrada")]
    ProposalNotFound,

    #[error("Unidade indisponível para proposta")]
    UnitUnavailable,

    #[error("Escopo não encontrado")]
    ScopeNotFound,

    #[error("Escopo pai não encontrado")]
    ParentScopeNotFound,

    #[error("Um escopo não pode ser movido para dentro de si mesmo ou de um descendente")]
    ScopeCycle,

    #[error("Escopo possui sub-escopos")]
    ScopeHasChildren,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// O erro que de fato sai na resposta HTTP.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::TenantAccessDenied => StatusCode::FORBIDDEN,
            AppError::UnitNotFound
            | AppError::ProposalNotFound
            | AppError::ScopeNotFound
            | AppError::ParentScopeNotFound => StatusCode::NOT_FOUND,
            AppError::UnitUnavailable | AppError::ScopeCycle | AppError::ScopeHasChildren => {
                StatusCode::CONFLICT
            }
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte para a resposta HTTP no idioma pedido (pt ou en).
    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let english = locale.is_english();
        let status = self.status();

        let message = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
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
                    details.insert(field.to_string(), json!(messages));
                }
                let error = if english {
                    "One or more fields are invalid."
                } else {
                    "Um ou mais campos são inválidos."
                };
                return ApiError {
                    status,
                    error: error.to_string(),
                    details: Some(Value::Object(details)),
                };
            }
            AppError::InvalidInput(reason) => {
                return ApiError { status, error: reason.clone(), details: None };
            }
            AppError::InvalidToken | AppError::JwtError(_) => pick(
                english,
                "Invalid or missing authentication token.",
                "Token de autenticação inválido ou ausente.",
            ),
            AppError::TenantAccessDenied => pick(
                english,
                "You do not have access to this company.",
                "Você não tem acesso a esta empresa.",
            ),
            AppError::UnitNotFound => pick(english, "Unit not found.", "Unidade não encontrada."),
            AppError::ProposalNotFound => {
                pick(english, "Proposal not found.", "Proposta não encontrada.")
            }
            AppError::UnitUnavailable => pick(
                english,
                "This unit is not available for a new proposal.",
                "Esta unidade não está disponível para uma nova proposta.",
            ),
            AppError::ScopeNotFound => pick(english, "Scope not found.", "Escopo não encontrado."),
            AppError::ParentScopeNotFound => {
                pick(english, "Parent scope not found.", "Escopo pai não encontrado.")
            }
            AppError::ScopeCycle => pick(
                english,
                "A scope cannot be moved under itself or one of its descendants.",
                "Um escopo não pode ser movido para dentro de si mesmo ou de um de seus descendentes.",
            ),
            AppError::ScopeHasChildren => pick(
                english,
                "This scope has sub-scopes and cannot be deleted.",
                "Este escopo possui sub-escopos e não pode ser excluído.",
            ),
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                // Detalhe só no log; o cliente recebe a mensagem genérica.
                tracing::error!("Erro Interno do Servidor: {:?}", self);
                pick(
                    english,
                    "An unexpected error occurred.",
                    "Ocorreu um erro inesperado.",
                )
            }
        };

        ApiError { status, error: message.to_string(), details: None }
    }
}

fn pick(english: bool, en: &'static str, pt: &'static str) -> &'static str {
    if english { en } else { pt }
}

// Usado pelos middlewares, que não têm o Locale em mãos.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}
