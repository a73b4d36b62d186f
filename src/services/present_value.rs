// src/services/present_value.rs

use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};

use crate::{
    common::{
        dates::{days_between, nth_due_date, MAX_INSTALLMENTS},
        error::AppError,
    },
    models::pricing::{FlowComparisonReport, FlowComparisonResult, FlowLeg, FlowTotals},
};

/// Taxa padrão de desconto: 0,5% ao mês.
pub const DEFAULT_MONTHLY_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 3);

// Abaixo disso a parcela é considerada "vencendo hoje" (folga para erro de ponto flutuante).
const DUE_NOW_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 3);

// Diferenças de valor presente menores que um centavo são ruído visual.
const PRESENT_DELTA_SNAP: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

const DAYS_PER_MONTH: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Traz um valor nominal para hoje. `months_ahead` é dias/30 (convenção bancária).
/// Vencido ou vencendo hoje: sem desconto e sem correção.
pub fn present_value(
    nominal: Decimal,
    months_ahead: Decimal,
    monthly_rate: Decimal,
) -> Result<Decimal, AppError> {
    if months_ahead <= DUE_NOW_TOLERANCE {
        return Ok(nominal);
    }

    let base = Decimal::ONE + monthly_rate;
    let factor = base
        .checked_powd(months_ahead)
        .or_else(|| {
            let approx = base.to_f64()?.powf(months_ahead.to_f64()?);
            Decimal::from_f64(approx)
        })
        .filter(|factor| !factor.is_zero())
        .ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Não foi possível descontar {} meses à taxa {}.",
                months_ahead, monthly_rate
            ))
        })?;

    Ok(nominal / factor)
}

/// Totais nominal e presente de um conjunto de pernas de fluxo.
pub fn flow_totals(
    legs: &[FlowLeg],
    today: NaiveDate,
    monthly_rate: Decimal,
) -> Result<FlowTotals, AppError> {
    let mut totals = FlowTotals::default();

    for leg in legs {
        if leg.installment_count > MAX_INSTALLMENTS {
            return Err(AppError::InvalidInput(format!(
                "Perna de fluxo com parcelas demais ({}).",
                leg.installment_count
            )));
        }
        let months = leg.periodicity_months.max(0) as u32;
        for i in 0..leg.installment_count.max(0) as u32 {
            let due_date = nth_due_date(leg.start_date, i, months)?;
            let months_ahead = Decimal::from(days_between(today, due_date)) / DAYS_PER_MONTH;

            totals.total_nominal += leg.installment_amount;
            totals.total_present_value +=
                present_value(leg.installment_amount, months_ahead, monthly_rate)?;
        }
    }

    Ok(totals)
}

fn variance_percent(delta: Decimal, standard_total: Decimal) -> Decimal {
    if standard_total.is_zero() {
        return Decimal::ZERO;
    }
    delta / standard_total * Decimal::ONE_HUNDRED
}

/// Proposta menos padrão, em valores nominais e presentes.
pub fn compare_totals(standard: FlowTotals, proposed: FlowTotals) -> FlowComparisonResult {
    let delta_nominal = proposed.total_nominal - standard.total_nominal;

    let mut delta_present = proposed.total_present_value - standard.total_present_value;
    if delta_present.abs() < PRESENT_DELTA_SNAP {
        delta_present = Decimal::ZERO;
    }

    FlowComparisonResult {
        standard,
        proposed,
        delta_nominal,
        delta_present,
        variance_percent_nominal: variance_percent(delta_nominal, standard.total_nominal),
        variance_percent_present: variance_percent(delta_present, standard.total_present_value),
    }
}

/// Mesmos números divididos pela área (área <= 0 divide por 1).
/// Os percentuais não mudam com a normalização.
pub fn per_area(result: &FlowComparisonResult, area: Decimal) -> FlowComparisonResult {
    let divisor = if area > Decimal::ZERO { area } else { Decimal::ONE };
    let scale = |totals: FlowTotals| FlowTotals {
        total_nominal: totals.total_nominal / divisor,
        total_present_value: totals.total_present_value / divisor,
    };

    FlowComparisonResult {
        standard: scale(result.standard),
        proposed: scale(result.proposed),
        delta_nominal: result.delta_nominal / divisor,
        delta_present: result.delta_present / divisor,
        variance_percent_nominal: result.variance_percent_nominal,
        variance_percent_present: result.variance_percent_present,
    }
}

pub fn compare_flows(
    standard: &[FlowLeg],
    proposed: &[FlowLeg],
    today: NaiveDate,
    monthly_rate: Decimal,
    unit_area: Decimal,
) -> Result<FlowComparisonReport, AppError> {
    if monthly_rate < Decimal::ZERO {
        return Err(AppError::InvalidInput("A taxa mensal não pode ser negativa.".into()));
    }

    let total = compare_totals(
        flow_totals(standard, today, monthly_rate)?,
        flow_totals(proposed, today, monthly_rate)?,
    );

    Ok(FlowComparisonReport {
        monthly_rate,
        per_area: per_area(&total, unit_area),
        total,
    })
}
