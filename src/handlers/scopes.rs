// src/handlers/scopes.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use sqlx::Connection;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_rls_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    db::PgScopeStore,
    middleware::{auth::AuthenticatedUser, i18n::Locale, tenancy::TenantContext},
    models::scope::{ScopeMoveOutcome, ScopeNode, ScopeTreeNode, ScopeType},
    services::scope_service::{build_tree, ScopeChanges},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateScopePayload {
    #[validate(length(min = 1, message = "O nome do escopo é obrigatório."))]
    #[schema(example = "Obra Residencial Jardins")]
    pub name: String,

    #[validate(length(min = 1, message = "O tipo do escopo é obrigatório."))]
    #[schema(example = "SITE")]
    pub scope_type: String,

    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScopePayload {
    #[validate(length(min = 1, message = "O nome do escopo é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "O tipo do escopo é obrigatório."))]
    pub scope_type: String,

    /// Ausente/nulo = raiz.
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveScopePayload {
    pub parent_id: Option<Uuid>,
}

#[utoipa::path(
    get,
    path = "/api/scopes",
    tag = "Escopos",
    responses(
        (status = 200, description = "Escopos ativos em pré-ordem (por caminho)", body = Vec<ScopeNode>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_scopes(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let mut store = PgScopeStore::new(&mut rls_conn);
    let scopes = app_state
        .scope_service
        .list_scopes(&mut store, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(scopes))
}

#[utoipa::path(
    get,
    path = "/api/scopes/tree",
    tag = "Escopos",
    responses(
        (status = 200, description = "Escopos ativos aninhados", body = Vec<ScopeTreeNode>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_scope_tree(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let mut store = PgScopeStore::new(&mut rls_conn);
    let scopes = app_state
        .scope_service
        .list_scopes(&mut store, tenant.0)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(Json(build_tree(&scopes)))
}

#[utoipa::path(
    post,
    path = "/api/scopes",
    tag = "Escopos",
    request_body = CreateScopePayload,
    responses(
        (status = 201, description = "Escopo criado", body = ScopeNode),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Escopo pai não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_scope(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateScopePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    // Insert + finalização do caminho numa só transação.
    let mut tx = rls_conn
        .begin()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let node = app_state
        .scope_service
        .create_scope(
            &mut PgScopeStore::new(&mut tx),
            tenant.0,
            &payload.name,
            ScopeType::from_label(&payload.scope_type),
            payload.parent_id,
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(node)))
}

#[utoipa::path(
    put,
    path = "/api/scopes/{id}",
    tag = "Escopos",
    request_body = UpdateScopePayload,
    responses(
        (status = 200, description = "Escopo atualizado (e movido, se o pai mudou)", body = ScopeMoveOutcome),
        (status = 404, description = "Escopo ou pai não encontrado"),
        (status = 409, description = "Movimento criaria um ciclo")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora"),
        ("id" = Uuid, Path, description = "ID do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_scope(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(scope_id): Path<Uuid>,
    Json(payload): Json<UpdateScopePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let mut tx = rls_conn
        .begin()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let outcome = app_state
        .scope_service
        .update_scope(
            &mut PgScopeStore::new(&mut tx),
            tenant.0,
            scope_id,
            ScopeChanges {
                name: payload.name,
                scope_type: ScopeType::from_label(&payload.scope_type),
                parent_id: payload.parent_id,
            },
        )
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok(Json(outcome))
}

#[utoipa::path(
    put,
    path = "/api/scopes/{id}/parent",
    tag = "Escopos",
    request_body = MoveScopePayload,
    responses(
        (status = 200, description = "Escopo movido; caminhos da subárvore reescritos", body = ScopeMoveOutcome),
        (status = 404, description = "Escopo ou pai não encontrado"),
        (status = 409, description = "Movimento criaria um ciclo")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora"),
        ("id" = Uuid, Path, description = "ID do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn move_scope(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(scope_id): Path<Uuid>,
    Json(payload): Json<MoveScopePayload>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    // Nó e descendentes mudam juntos ou nenhum muda.
    let mut tx = rls_conn
        .begin()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    let outcome = app_state
        .scope_service
        .move_scope(&mut PgScopeStore::new(&mut tx), tenant.0, scope_id, payload.parent_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/scopes/{id}",
    tag = "Escopos",
    responses(
        (status = 204, description = "Escopo removido"),
        (status = 404, description = "Escopo não encontrado"),
        (status = 409, description = "Escopo possui sub-escopos")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Construtora"),
        ("id" = Uuid, Path, description = "ID do escopo")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_scope(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(scope_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let mut rls_conn = get_rls_connection(&app_state, &tenant, &user)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let mut tx = rls_conn
        .begin()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    app_state
        .scope_service
        .delete_scope(&mut PgScopeStore::new(&mut tx), tenant.0, scope_id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    tx.commit()
        .await
        .map_err(|e| AppError::from(e).to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
