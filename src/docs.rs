// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Precificação ---
        handlers::pricing::derive_unit_price,
        handlers::pricing::get_unit_price,
        handlers::pricing::generate_payment_flow,
        handlers::pricing::get_unit_standard_flow,
        handlers::pricing::compare_payment_flows,

        // --- Propostas ---
        handlers::proposals::preview_parcels,
        handlers::proposals::create_proposal,
        handlers::proposals::get_proposal,
        handlers::proposals::compare_with_standard,

        // --- Escopos ---
        handlers::scopes::list_scopes,
        handlers::scopes::get_scope_tree,
        handlers::scopes::create_scope,
        handlers::scopes::update_scope,
        handlers::scopes::move_scope,
        handlers::scopes::delete_scope,
    ),
    components(
        schemas(
            // --- Pricing ---
            models::pricing::UnitStatus,
            models::pricing::Unit,
            models::pricing::PriceFactor,
            models::pricing::FlowTemplateLine,
            models::pricing::PriceOutcome,
            models::pricing::GeneratedFlowLine,
            models::pricing::FlowGeneration,
            models::pricing::GeneratedInstallment,
            models::pricing::UnitStandardFlow,
            models::pricing::FlowLeg,
            models::pricing::FlowTotals,
            models::pricing::FlowComparisonResult,
            models::pricing::FlowComparisonReport,

            // --- Proposals ---
            models::proposal::ProposalStatus,
            models::proposal::ProposalCondition,
            models::proposal::CorrectedCondition,
            models::proposal::ProposalInstallment,
            models::proposal::ParcelLedger,
            models::proposal::Proposal,
            models::proposal::ProposalParcel,
            models::proposal::ProposalDetail,

            // --- Scopes ---
            models::scope::ScopeNode,
            models::scope::ScopeMoveOutcome,
            models::scope::ScopeTreeNode,

            // --- Payloads ---
            handlers::pricing::DerivePricePayload,
            handlers::pricing::DerivedPrice,
            handlers::pricing::UnitTablePrice,
            handlers::pricing::GenerateFlowPayload,
            handlers::pricing::GeneratedFlow,
            handlers::pricing::CompareFlowsPayload,
            handlers::proposals::PreviewParcelsPayload,
            handlers::proposals::CreateProposalPayload,
            handlers::proposals::CompareProposalPayload,
            handlers::scopes::CreateScopePayload,
            handlers::scopes::UpdateScopePayload,
            handlers::scopes::MoveScopePayload,
        )
    ),
    tags(
        (name = "Precificação", description = "Preço de tabela, fluxo padrão e valor presente"),
        (name = "Propostas", description = "Condições de pagamento, parcelas e reserva de unidade"),
        (name = "Escopos", description = "Árvore organizacional (holding, matriz, filial, obra)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
