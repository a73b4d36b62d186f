// src/services/pricing_service.rs

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::{
        dates::{nth_due_date, Periodicity, MAX_INSTALLMENTS},
        error::AppError,
        money::round_cents,
    },
    db::PricingRepository,
    models::pricing::{
        ConditionType, FlowGeneration, FlowLeg, FlowTemplateLine, GeneratedFlowLine,
        GeneratedInstallment, PriceFactor, PriceOutcome, UnitStandardFlow,
    },
};

// =============================================================================
//  1. PREÇO DE TABELA
// =============================================================================

/// preço = área × valor do m² × correção × andar × gestão.
/// Fatores ausentes valem 1.
pub fn derive_price(
    unit_area: Decimal,
    price_per_area: Decimal,
    correction_factor: Option<Decimal>,
    floor_factor: Option<Decimal>,
    management_factor: Option<Decimal>,
) -> Result<Decimal, AppError> {
    if unit_area <= Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "A área da unidade deve ser maior que zero.".to_string(),
        ));
    }
    if price_per_area < Decimal::ZERO {
        return Err(AppError::InvalidInput(
            "O valor do m² não pode ser negativo.".to_string(),
        ));
    }

    Ok(unit_area
        * price_per_area
        * correction_factor.unwrap_or(Decimal::ONE)
        * floor_factor.unwrap_or(Decimal::ONE)
        * management_factor.unwrap_or(Decimal::ONE))
}

/// Preço de uma unidade a partir da (possível) linha ativa da tabela.
pub fn price_from_factor(
    unit_area: Decimal,
    factor: Option<&PriceFactor>,
) -> Result<PriceOutcome, AppError> {
    let Some(factor) = factor else {
        return Ok(PriceOutcome::unpriced());
    };

    let price = derive_price(
        unit_area,
        factor.price_per_area,
        factor.correction_factor,
        factor.floor_factor,
        factor.management_factor,
    )?;

    Ok(PriceOutcome::Priced { price })
}

// =============================================================================
//  2. GERADOR DE FLUXO
// =============================================================================

/// Expande um modelo percentual em linhas de parcelas para o valor alvo.
///
/// Cada linha é arredondada por parcela, o que deixa alguns centavos de
/// diferença no total. Esses centavos vão para a primeira ENTRADA de parcela
/// única (ou, na falta dela, para a primeira linha de parcela única). Se não
/// houver nenhuma, a diferença volta em `unabsorbed_drift`.
pub fn generate_flow(
    target_total: Decimal,
    template: &[FlowTemplateLine],
) -> Result<FlowGeneration, AppError> {
    if let Some(line) = template
        .iter()
        .find(|line| !(1..=MAX_INSTALLMENTS).contains(&line.installment_count))
    {
        return Err(AppError::InvalidInput(format!(
            "A linha {} do fluxo tem quantidade de parcelas inválida ({}).",
            line.kind.label(),
            line.installment_count
        )));
    }

    let mut lines: Vec<GeneratedFlowLine> = template
        .iter()
        .map(|line| {
            let line_total = target_total * line.percentage_of_total / Decimal::ONE_HUNDRED;
            let count = Decimal::from(line.installment_count);
            let installment_amount = round_cents(line_total / count);
            let months = line.periodicity_months.max(0) as u32;

            GeneratedFlowLine {
                kind: line.kind.clone(),
                periodicity_label: Periodicity::from_months(months).label(),
                periodicity_months: months as i32,
                installment_count: line.installment_count,
                installment_amount,
                line_total: installment_amount * count,
                percentage_of_total: line.percentage_of_total,
                first_due_date: line.first_due_date,
            }
        })
        .collect();

    let sum_real: Decimal = lines.iter().map(|line| line.line_total).sum();
    let drift = round_cents(target_total - sum_real);

    let mut unabsorbed_drift = None;
    if !drift.is_zero() {
        match drift_target(&lines) {
            Some(index) if lines[index].installment_count == 1 => {
                let line = &mut lines[index];
                line.installment_amount += drift;
                line.line_total += drift;
            }
            _ => {
                tracing::warn!(
                    "Fluxo sem parcela única para absorver {} de arredondamento (alvo {})",
                    drift,
                    target_total
                );
                unabsorbed_drift = Some(drift);
            }
        }
    }

    Ok(FlowGeneration {
        target_total,
        lines,
        unabsorbed_drift,
    })
}

// Primeira ENTRADA única > primeira linha única > primeira linha.
fn drift_target(lines: &[GeneratedFlowLine]) -> Option<usize> {
    lines
        .iter()
        .position(|line| line.kind == ConditionType::Entry && line.installment_count == 1)
        .or_else(|| lines.iter().position(|line| line.installment_count == 1))
        .or(if lines.is_empty() { None } else { Some(0) })
}

/// Parcelas datadas de um fluxo gerado, na ordem das linhas do modelo.
pub fn expand_flow(flow: &FlowGeneration) -> Result<Vec<GeneratedInstallment>, AppError> {
    let mut installments = Vec::new();
    for line in &flow.lines {
        let months = line.periodicity_months.max(0) as u32;
        for i in 0..line.installment_count.max(0) {
            installments.push(GeneratedInstallment {
                kind: line.kind.clone(),
                sequence_number: i + 1,
                due_date: nth_due_date(line.first_due_date, i as u32, months)?,
                amount: line.installment_amount,
            });
        }
    }
    Ok(installments)
}

/// Pernas para o cálculo de valor presente.
pub fn flow_legs(flow: &FlowGeneration) -> Vec<FlowLeg> {
    flow.lines
        .iter()
        .map(|line| FlowLeg {
            installment_count: line.installment_count,
            installment_amount: line.installment_amount,
            start_date: line.first_due_date,
            periodicity_months: line.periodicity_months,
        })
        .collect()
}

// =============================================================================
//  3. SERVIÇO (com banco)
// =============================================================================

#[derive(Clone)]
pub struct PricingService {
    repo: PricingRepository,
}

impl PricingService {
    pub fn new(repo: PricingRepository) -> Self {
        Self { repo }
    }

    pub async fn unit_table_price(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        table_price_id: Uuid,
        unit_id: Uuid,
    ) -> Result<(Decimal, PriceOutcome), AppError> {
        let unit = self
            .repo
            .find_unit(&mut *conn, tenant_id, unit_id)
            .await?
            .ok_or(AppError::UnitNotFound)?;

        let factor = self
            .repo
            .find_active_price_factor(&mut *conn, tenant_id, table_price_id, unit_id)
            .await?;

        if factor.is_none() {
            tracing::info!(
                "Unidade {} sem linha ativa na tabela {}: sem preço",
                unit_id,
                table_price_id
            );
        }

        let outcome = price_from_factor(unit.area, factor.as_ref())?;
        Ok((unit.area, outcome))
    }

    /// Preço de tabela + fluxo padrão do modelo da tabela para a unidade.
    pub async fn standard_flow(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        table_price_id: Uuid,
        unit_id: Uuid,
    ) -> Result<UnitStandardFlow, AppError> {
        let (area, table_price) = self
            .unit_table_price(&mut *conn, tenant_id, table_price_id, unit_id)
            .await?;

        let flow = match table_price.price() {
            Some(price) => {
                let template = self
                    .repo
                    .list_template_lines(&mut *conn, tenant_id, table_price_id)
                    .await?;
                Some(generate_flow(price, &template)?)
            }
            None => None,
        };

        Ok(UnitStandardFlow {
            unit_id,
            table_price_id,
            area,
            table_price,
            flow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn d(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn day(y: i32, m: u32, dd: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, dd).unwrap()
    }

    fn line(kind: ConditionType, pct: &str, count: i32, months: i32, first: NaiveDate) -> FlowTemplateLine {
        FlowTemplateLine {
            kind,
            percentage_of_total: d(pct),
            installment_count: count,
            periodicity_months: months,
            first_due_date: first,
        }
    }

    fn flow_total(flow: &FlowGeneration) -> Decimal {
        flow.lines.iter().map(|l| l.line_total).sum()
    }

    // --- Preço ---

    #[test]
    fn price_is_the_product_of_all_factors() {
        let price = derive_price(d("72.5"), d("8000"), Some(d("1.1")), Some(d("1.02")), Some(d("0.95"))).unwrap();
        assert_eq!(price, d("72.5") * d("8000") * d("1.1") * d("1.02") * d("0.95"));
    }

    #[test]
    fn omitted_factors_are_neutral() {
        assert_eq!(derive_price(d("50"), d("7000"), None, None, None).unwrap(), d("350000"));
    }

    #[test]
    fn non_positive_area_is_rejected() {
        assert!(matches!(
            derive_price(Decimal::ZERO, d("7000"), None, None, None),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn missing_factor_row_means_unpriced() {
        let outcome = price_from_factor(d("50"), None).unwrap();
        assert_eq!(outcome, PriceOutcome::unpriced());

        let factor = PriceFactor {
            unit_id: Uuid::new_v4(),
            table_price_id: Uuid::new_v4(),
            price_per_area: d("7000"),
            floor_factor: Some(d("1.1")),
            management_factor: None,
            correction_factor: None,
        };
        assert_eq!(price_from_factor(d("50"), Some(&factor)).unwrap().price(), Some(d("385000")));
    }

    // --- Fluxo ---

    #[test]
    fn entry_plus_ten_monthly_closes_exactly() {
        let template = vec![
            line(ConditionType::Entry, "20", 1, 0, day(2025, 1, 10)),
            line(ConditionType::Monthly, "80", 10, 1, day(2025, 2, 10)),
        ];
        let flow = generate_flow(d("100000"), &template).unwrap();

        assert_eq!(flow.lines[0].installment_amount, d("20000.00"));
        assert_eq!(flow.lines[1].installment_amount, d("8000.00"));
        assert_eq!(flow.lines[1].line_total, d("80000.00"));
        assert_eq!(flow_total(&flow), d("100000.00"));
        assert_eq!(flow.unabsorbed_drift, None);
        assert_eq!(flow.lines[1].periodicity_label, "MENSAL");

        let installments = expand_flow(&flow).unwrap();
        assert_eq!(installments.len(), 11);
        assert_eq!(installments[10].due_date, day(2025, 11, 10));
    }

    #[test]
    fn rounding_cents_go_to_the_single_entry() {
        let template = vec![
            line(ConditionType::Monthly, "70", 3, 1, day(2025, 2, 1)),
            line(ConditionType::Keys, "10", 1, 0, day(2026, 6, 1)),
            line(ConditionType::Entry, "20", 1, 0, day(2025, 1, 1)),
        ];
        // 70% de 1000 = 700 / 3 = 233.33 -> sobra 0.01
        let flow = generate_flow(d("1000"), &template).unwrap();

        assert_eq!(flow.lines[0].line_total, d("699.99"));
        assert_eq!(flow.lines[1].installment_amount, d("100.00"));
        assert_eq!(flow.lines[2].installment_amount, d("200.01"));
        assert_eq!(flow_total(&flow), d("1000"));
    }

    #[test]
    fn without_entry_the_first_single_line_absorbs() {
        let template = vec![
            line(ConditionType::Monthly, "70", 3, 1, day(2025, 2, 1)),
            line(ConditionType::Keys, "30", 1, 0, day(2026, 6, 1)),
        ];
        let flow = generate_flow(d("1000"), &template).unwrap();
        assert_eq!(flow.lines[1].installment_amount, d("300.01"));
        assert_eq!(flow.unabsorbed_drift, None);
    }

    #[test]
    fn drift_without_single_line_is_reported() {
        let template = vec![line(ConditionType::Monthly, "100", 3, 1, day(2025, 2, 1))];
        let flow = generate_flow(d("1000"), &template).unwrap();

        assert_eq!(flow.lines[0].installment_amount, d("333.33"));
        assert_eq!(flow.unabsorbed_drift, Some(d("0.01")));
    }

    #[test]
    fn zero_installments_are_rejected() {
        let template = vec![line(ConditionType::Entry, "100", 0, 0, day(2025, 1, 1))];
        assert!(matches!(generate_flow(d("1000"), &template), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn installment_count_is_capped() {
        let template = vec![line(ConditionType::Monthly, "100", MAX_INSTALLMENTS + 1, 1, day(2025, 1, 1))];
        assert!(matches!(generate_flow(d("1000"), &template), Err(AppError::InvalidInput(_))));

        let template = vec![line(ConditionType::Monthly, "100", MAX_INSTALLMENTS, 1, day(2025, 1, 1))];
        let flow = generate_flow(d("1000"), &template).unwrap();
        assert_eq!(expand_flow(&flow).unwrap().len(), MAX_INSTALLMENTS as usize);
    }

    #[test]
    fn huge_periodicity_fails_instead_of_overflowing() {
        let template = vec![line(ConditionType::Annual, "100", 3, i32::MAX, day(2025, 1, 1))];
        let flow = generate_flow(d("1000"), &template).unwrap();
        assert!(matches!(expand_flow(&flow), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn legs_follow_corrected_amounts() {
        let template = vec![
            line(ConditionType::Entry, "10", 1, 0, day(2025, 1, 1)),
            line(ConditionType::Annual, "90", 7, 12, day(2026, 1, 1)),
        ];
        let flow = generate_flow(d("1000"), &template).unwrap();
        let legs = flow_legs(&flow);
        let nominal: Decimal = legs
            .iter()
            .map(|leg| leg.installment_amount * Decimal::from(leg.installment_count))
            .sum();
        assert_eq!(nominal, d("1000"));
        assert_eq!(legs[1].periodicity_months, 12);
    }

    proptest! {
        #[test]
        fn flow_conserves_total_when_a_single_line_exists(
            cents in 1_00i64..50_000_000_00i64,
            entry_pct in 1u32..60,
            monthly_count in 1i32..240,
            keys_pct in 0u32..20,
        ) {
            let target = Decimal::new(cents, 2);
            let monthly_pct = 100 - entry_pct - keys_pct;
            let template = vec![
                line(ConditionType::Entry, &entry_pct.to_string(), 1, 0, day(2025, 1, 1)),
                line(ConditionType::Monthly, &monthly_pct.to_string(), monthly_count, 1, day(2025, 2, 1)),
                line(ConditionType::Keys, &keys_pct.to_string(), 1, 0, day(2028, 1, 1)),
            ];

            let first = generate_flow(target, &template).unwrap();
            prop_assert_eq!(flow_total(&first), target);
            prop_assert_eq!(first.unabsorbed_drift, None);

            let second = generate_flow(target, &template).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
