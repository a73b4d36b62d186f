// src/services/proposal_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Acquire, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        dates::{nth_due_date, parse_date_only, periodicity_label_to_months, Periodicity, MAX_INSTALLMENTS},
        error::AppError,
    },
    db::{PricingRepository, ProposalRepository},
    models::{
        pricing::{FlowComparisonReport, FlowLeg, UnitStatus},
        proposal::{CorrectedCondition, ParcelLedger, Proposal, ProposalCondition, ProposalDetail, ProposalInstallment},
    },
    services::{
        present_value::compare_flows,
        pricing_service::{flow_legs, PricingService},
    },
};

// Diferença abaixo disso já é considerada fechada.
const DRIFT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

// =============================================================================
//  1. MONTADOR DE PARCELAS
// =============================================================================

/// Monta o livro de parcelas de uma proposta.
///
/// A ordem dos passos importa: a diferença de centavos é aplicada antes da
/// ordenação global (para acompanhar a parcela certa) e a numeração é feita
/// depois dela (número = ordem cronológica).
pub fn build_parcels(
    target_total: Decimal,
    conditions: &[ProposalCondition],
) -> Result<ParcelLedger, AppError> {
    if conditions.is_empty() {
        return Err(AppError::InvalidInput(
            "A proposta precisa de pelo menos uma condição de pagamento.".to_string(),
        ));
    }

    // 1. Expande cada condição em parcelas, guardando a condição de origem.
    let mut first_due_dates: Vec<NaiveDate> = Vec::with_capacity(conditions.len());
    let mut installments: Vec<ProposalInstallment> = Vec::new();

    for (index, condition) in conditions.iter().enumerate() {
        if !(1..=MAX_INSTALLMENTS).contains(&condition.installment_count) {
            return Err(AppError::InvalidInput(format!(
                "A condição {} tem quantidade de parcelas inválida ({}).",
                index + 1,
                condition.installment_count
            )));
        }

        let first_due_date = parse_date_only(&condition.first_due_date).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "A condição {} tem data de primeiro vencimento inválida: '{}'.",
                index + 1,
                condition.first_due_date
            ))
        })?;
        first_due_dates.push(first_due_date);

        let months = periodicity_label_to_months(&condition.periodicity);
        let code = condition.kind.code();

        for i in 0..condition.installment_count as u32 {
            installments.push(ProposalInstallment {
                code,
                sequence_number: 0,
                due_date: nth_due_date(first_due_date, i, months)?,
                amount: condition.installment_amount,
                condition_index: index,
            });
        }
    }

    // 2 e 3. Fecha a diferença na primeira entrada (ou na primeira parcela).
    let sum_expanded: Decimal = installments.iter().map(|p| p.amount).sum();
    let drift = target_total - sum_expanded;
    let mut drift_applied = Decimal::ZERO;

    if drift.abs() > DRIFT_TOLERANCE {
        let target = installments
            .iter()
            .position(|p| p.code == 'E')
            .unwrap_or(0);
        installments[target].amount += drift;
        drift_applied = drift;
        tracing::debug!(
            "Diferença de {} aplicada na parcela {} da condição {}",
            drift,
            installments[target].code,
            installments[target].condition_index + 1
        );
    }

    // 4. Resumo de cada condição coerente com as parcelas corrigidas.
    let corrected_conditions = conditions
        .iter()
        .enumerate()
        .map(|(index, condition)| {
            let total_amount: Decimal = installments
                .iter()
                .filter(|p| p.condition_index == index)
                .map(|p| p.amount)
                .sum();
            let installment_amount = if condition.installment_count == 1 {
                total_amount
            } else {
                condition.installment_amount
            };
            let periodicity = Periodicity::from_label(&condition.periodicity);

            CorrectedCondition {
                kind: condition.kind.clone(),
                periodicity: periodicity.label(),
                periodicity_months: periodicity.months() as i32,
                installment_count: condition.installment_count,
                installment_amount,
                total_amount,
                first_due_date: first_due_dates[index],
            }
        })
        .collect();

    // 5. Ordem cronológica; empate pelo código do tipo (sort estável).
    installments.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.code.cmp(&b.code)));

    // 6. Numeração final 1..N.
    for (position, installment) in installments.iter_mut().enumerate() {
        installment.sequence_number = position as i32 + 1;
    }

    Ok(ParcelLedger {
        target_total,
        corrected_conditions,
        installments,
        drift_applied,
    })
}

/// Pernas de valor presente a partir das condições negociadas.
pub fn condition_legs(ledger: &ParcelLedger) -> Vec<FlowLeg> {
    // Uma perna por parcela, para o ajuste de centavos entrar no cálculo.
    ledger
        .installments
        .iter()
        .map(|installment| FlowLeg {
            installment_count: 1,
            installment_amount: installment.amount,
            start_date: installment.due_date,
            periodicity_months: 0,
        })
        .collect()
}

// =============================================================================
//  2. SERVIÇO (persistência)
// =============================================================================

pub struct NewProposal<'a> {
    pub unit_id: Uuid,
    pub table_price_id: Option<Uuid>,
    pub customer_name: &'a str,
    pub total_value: Decimal,
    pub conditions: &'a [ProposalCondition],
}

#[derive(Clone)]
pub struct ProposalService {
    repo: ProposalRepository,
    pricing_repo: PricingRepository,
    pricing_service: PricingService,
}

impl ProposalService {
    pub fn new(
        repo: ProposalRepository,
        pricing_repo: PricingRepository,
        pricing_service: PricingService,
    ) -> Self {
        Self { repo, pricing_repo, pricing_service }
    }

    /// Grava proposta, condições e parcelas e reserva a unidade, tudo numa transação.
    pub async fn create_proposal<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Uuid,
        input: NewProposal<'_>,
    ) -> Result<ProposalDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        // Valida e monta antes de abrir a transação.
        let ledger = build_parcels(input.total_value, input.conditions)?;

        let mut tx = executor.begin().await?;

        self.pricing_repo
            .find_unit(&mut *tx, tenant_id, input.unit_id)
            .await?
            .ok_or(AppError::UnitNotFound)?;

        let reserved = self
            .pricing_repo
            .transition_unit_status(
                &mut *tx,
                tenant_id,
                input.unit_id,
                UnitStatus::Available,
                UnitStatus::Reserved,
            )
            .await?;

        if !reserved {
            return Err(AppError::UnitUnavailable);
        }

        let proposal: Proposal = self
            .repo
            .create_proposal(
                &mut *tx,
                tenant_id,
                input.unit_id,
                input.table_price_id,
                input.customer_name,
                input.total_value,
                user_id,
            )
            .await?;

        for (position, condition) in ledger.corrected_conditions.iter().enumerate() {
            self.repo
                .add_condition(&mut *tx, proposal.id, position as i32, condition)
                .await?;
        }

        let parcels = self
            .repo
            .add_parcels(&mut *tx, proposal.id, &ledger.installments)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Proposta {} criada para a unidade {} com {} parcelas",
            proposal.id,
            proposal.unit_id,
            parcels.len()
        );

        Ok(ProposalDetail {
            header: proposal,
            conditions: ledger.corrected_conditions,
            parcels,
        })
    }

    pub async fn get_proposal(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        proposal_id: Uuid,
    ) -> Result<ProposalDetail, AppError> {
        let header = self
            .repo
            .find_proposal(&mut *conn, tenant_id, proposal_id)
            .await?
            .ok_or(AppError::ProposalNotFound)?;

        let conditions = self.repo.list_conditions(&mut *conn, proposal_id).await?;
        let parcels = self.repo.list_parcels(&mut *conn, proposal_id).await?;

        Ok(ProposalDetail { header, conditions, parcels })
    }

    /// Fluxo padrão da unidade na tabela contra as condições negociadas.
    pub async fn compare_with_standard(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        table_price_id: Uuid,
        unit_id: Uuid,
        total_value: Decimal,
        conditions: &[ProposalCondition],
        today: NaiveDate,
        monthly_rate: Decimal,
    ) -> Result<FlowComparisonReport, AppError> {
        let standard = self
            .pricing_service
            .standard_flow(&mut *conn, tenant_id, table_price_id, unit_id)
            .await?;

        let flow = standard.flow.ok_or_else(|| {
            AppError::InvalidInput(
                "A unidade não tem preço nesta tabela; não há fluxo padrão para comparar."
                    .to_string(),
            )
        })?;

        let ledger = build_parcels(total_value, conditions)?;

        compare_flows(
            &flow_legs(&flow),
            &condition_legs(&ledger),
            today,
            monthly_rate,
            standard.area,
        )
    }
}
