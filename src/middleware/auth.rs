// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::auth::CurrentUser,
};

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub CurrentUser);

fn bearer_token(parts_headers: &axum::http::HeaderMap) -> Option<&str> {
    parts_headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

// Guardião das rotas por empresa: autentica, lê o X-Tenant-ID e confere o vínculo.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let token = bearer_token(&parts.headers).ok_or(AppError::InvalidToken)?;
    let user = app_state.auth_service.validate_token(token)?;

    let tenant = TenantContext::from_request_parts(&mut parts, &app_state)
        .await
        .map_err(|e| AppError::InvalidInput(e.error))?;

    let is_member = app_state
        .tenant_repo
        .check_user_tenancy(user.id, tenant.0)
        .await?;

    if !is_member {
        tracing::warn!("Usuário {} tentou acessar a empresa {}", user.id, tenant.0);
        return Err(AppError::TenantAccessDenied);
    }

    let mut request = Request::from_parts(parts, body);
    request.extensions_mut().insert(AuthenticatedUser(user));
    request.extensions_mut().insert(tenant);
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
