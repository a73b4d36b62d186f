//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::auth::tenant_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .context("Falha ao inicializar o estado da aplicação.")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let pricing_routes = Router::new()
        .route("/price", post(handlers::pricing::derive_unit_price))
        .route("/flows", post(handlers::pricing::generate_payment_flow))
        .route("/flows/compare", post(handlers::pricing::compare_payment_flows))
        .route(
            "/tables/{table_id}/units/{unit_id}/price",
            get(handlers::pricing::get_unit_price),
        )
        .route(
            "/tables/{table_id}/units/{unit_id}/flow",
            get(handlers::pricing::get_unit_standard_flow),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let proposal_routes = Router::new()
        .route("/", post(handlers::proposals::create_proposal))
        .route("/preview", post(handlers::proposals::preview_parcels))
        .route("/compare", post(handlers::proposals::compare_with_standard))
        .route("/{id}", get(handlers::proposals::get_proposal))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let scope_routes = Router::new()
        .route("/"
               ,get(handlers::scopes::list_scopes)
               .post(handlers::scopes::create_scope)
        )
        .route("/tree", get(handlers::scopes::get_scope_tree))
        .route("/{id}"
               ,put(handlers::scopes::update_scope)
               .delete(handlers::scopes::delete_scope)
        )
        .route("/{id}/parent", put(handlers::scopes::move_scope))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            tenant_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/pricing", pricing_routes)
        .nest("/api/proposals", proposal_routes)
        .nest("/api/scopes", scope_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    axum::serve(listener, app)
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}
