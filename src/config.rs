// src/config.rs

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    common::money::parse_optional_decimal,
    db::{PricingRepository, ProposalRepository, TenantRepository},
    services::{
        auth::AuthService, present_value::DEFAULT_MONTHLY_RATE, pricing_service::PricingService,
        proposal_service::ProposalService, scope_service::ScopeService,
    },
};

/// Parâmetros comerciais lidos do ambiente.
#[derive(Debug, Clone, Copy)]
pub struct PricingConfig {
    /// Taxa mensal usada para trazer fluxos a valor presente.
    pub monthly_discount_rate: Decimal,
}

impl PricingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_raw(env::var("MONTHLY_DISCOUNT_RATE").ok().as_deref())
    }

    fn from_raw(raw: Option<&str>) -> anyhow::Result<Self> {
        let monthly_discount_rate = match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => parse_optional_decimal(text)
                .filter(|rate| !rate.is_sign_negative())
                .with_context(|| format!("MONTHLY_DISCOUNT_RATE inválida: '{}'", text))?,
            None => DEFAULT_MONTHLY_RATE,
        };

        Ok(Self { monthly_discount_rate })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub tenant_repo: TenantRepository,
    pub pricing_service: PricingService,
    pub proposal_service: ProposalService,
    pub scope_service: ScopeService,
    pub pricing: PricingConfig,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("DB_MAX_CONNECTIONS inválido: '{}'", raw))?,
            Err(_) => 5,
        };
        let pricing = PricingConfig::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
        tracing::info!("Taxa mensal de desconto: {}", pricing.monthly_discount_rate);

        // --- Monta o gráfico de dependências ---
        let pricing_repo = PricingRepository::new();
        let pricing_service = PricingService::new(pricing_repo.clone());
        let proposal_service = ProposalService::new(
            ProposalRepository::new(),
            pricing_repo,
            pricing_service.clone(),
        );

        Ok(Self {
            tenant_repo: TenantRepository::new(db_pool.clone()),
            auth_service: AuthService::new(jwt_secret),
            pricing_service,
            proposal_service,
            scope_service: ScopeService::new(),
            pricing,
            db_pool,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_rate_defaults_to_half_percent() {
        let config = PricingConfig::from_raw(None).unwrap();
        assert_eq!(config.monthly_discount_rate, "0.005".parse::<Decimal>().unwrap());
        assert_eq!(PricingConfig::from_raw(Some(" ")).unwrap().monthly_discount_rate, DEFAULT_MONTHLY_RATE);
    }

    #[test]
    fn discount_rate_accepts_comma_and_rejects_garbage() {
        let config = PricingConfig::from_raw(Some("0,01")).unwrap();
        assert_eq!(config.monthly_discount_rate, "0.01".parse::<Decimal>().unwrap());

        assert!(PricingConfig::from_raw(Some("abc")).is_err());
        assert!(PricingConfig::from_raw(Some("-0.01")).is_err());
    }
}
