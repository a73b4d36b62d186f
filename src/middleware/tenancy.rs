// src/middleware/tenancy.rs

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use uuid::Uuid;
use crate::common::error::ApiError; // Usamos o nosso ApiError para rejeição

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// Armazena o UUID do tenant (construtora) que o usuário quer acessar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub Uuid);

impl TenantContext {
    pub fn from_header_value(value: Option<&str>) -> Result<Self, ApiError> {
        let value_str = value.ok_or_else(|| ApiError {
            status: StatusCode::BAD_REQUEST,
            error: "O cabeçalho X-Tenant-ID é obrigatório.".to_string(),
            details: None,
        })?;

        let tenant_id = Uuid::parse_str(value_str.trim()).map_err(|_| ApiError {
            status: StatusCode::BAD_REQUEST,
            error: "Cabeçalho X-Tenant-ID inválido (não é um UUID).".to_string(),
            details: None,
        })?;

        Ok(TenantContext(tenant_id))
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {

        // Depois do tenant_guard o contexto já está validado nos extensions.
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(*ctx);
        }

        let header_value = match parts.headers.get(TENANT_ID_HEADER) {
            Some(value) => Some(value.to_str().map_err(|_| ApiError {
                status: StatusCode::BAD_REQUEST,
                error: "Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string(),
                details: None,
            })?),
            None => None,
        };

        TenantContext::from_header_value(header_value)
    }
}
