use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::auth::AuthenticatedUser;
use crate::middleware::tenancy::TenantContext;

// ---
// Helper RLS: A "Chave" para o Banco de Dados
// ---
/// Adquire uma conexão da pool e define as variáveis RLS (a "chave").
pub(crate) async fn get_rls_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
    user: &AuthenticatedUser,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {

    // 1. Adquire conexão
    let mut conn = app_state.db_pool.acquire().await?;

    // 2. Define Tenant ID (nível de sessão: a conexão volta para a pool
    // e é redefinida na próxima aquisição)
    sqlx::query("SELECT set_config('app.tenant_id', $1, false)")
        .bind(tenant_ctx.0.to_string())
        .execute(&mut *conn)
        .await?;

    // 3. Define User ID
    sqlx::query("SELECT set_config('app.user_id', $1, false)")
        .bind(user.0.id.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}
