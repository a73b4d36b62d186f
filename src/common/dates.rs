// src/common/dates.rs

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::common::error::AppError;

fn noon() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Fixa um dia do calendário ao meio-dia.
pub fn at_noon(date: NaiveDate) -> NaiveDateTime {
    date.and_time(noon())
}

/// Extrai o `YYYY-MM-DD` de um texto ("2024-03-10", "2024-03-10T23:30:00-03:00"...)
/// descartando hora e fuso. Vencimentos só se importam com o dia.
pub fn parse_date_only(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Normaliza texto de data para o meio-dia local daquele dia.
pub fn normalize_to_noon(raw: &str) -> Option<NaiveDateTime> {
    parse_date_only(raw).map(at_noon)
}

/// Mesma normalização para um instante com fuso: vale o dia no fuso de origem.
pub fn normalize_datetime_to_noon<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDateTime {
    at_noon(instant.date_naive())
}

/// Soma meses de calendário. Dias que não existem no mês de destino
/// (31/01 + 1 mês) caem no último dia daquele mês.
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate, AppError> {
    date.checked_add_months(Months::new(months)).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Vencimento fora do calendário: {} + {} meses.",
            date, months
        ))
    })
}

/// Teto de parcelas por linha/condição (50 anos de mensais).
pub const MAX_INSTALLMENTS: i32 = 600;

/// Vencimento da parcela `index` (0 = primeira) de uma série a cada `period_months`.
pub fn nth_due_date(first_due_date: NaiveDate, index: u32, period_months: u32) -> Result<NaiveDate, AppError> {
    let offset = index.checked_mul(period_months).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Periodicidade de {} meses gera vencimentos fora do calendário.",
            period_months
        ))
    })?;
    add_months(first_due_date, offset)
}

/// Diferença em dias inteiros entre dois dias, ambos fixados ao meio-dia.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let seconds = (at_noon(to) - at_noon(from)).num_seconds();
    (seconds as f64 / 86_400.0).round() as i64
}

/// Periodicidade de uma condição de pagamento.
///
/// Os rótulos aceitos vêm tanto da tabela comercial em português quanto do
/// front-end em inglês. Qualquer coisa desconhecida é tratada como parcela única.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Periodicity {
    Single,
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
    EveryMonths(u32),
}

impl Periodicity {
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_uppercase();
        match normalized.as_str() {
            "MONTHLY" | "MENSAL" => Self::Monthly,
            "BIMONTHLY" | "BIMESTRAL" => Self::Bimonthly,
            "QUARTERLY" | "TRIMESTRAL" => Self::Quarterly,
            "SEMIANNUAL" | "SEMESTRAL" | "INTERMEDIATE" | "INTERMEDIARIA" | "INTERMEDIÁRIA" => {
                Self::Semiannual
            }
            "ANNUAL" | "ANUAL" => Self::Annual,
            other => other
                .parse::<u32>()
                .map(Self::from_months)
                .unwrap_or(Self::Single),
        }
    }

    pub fn from_months(months: u32) -> Self {
        match months {
            0 => Self::Single,
            1 => Self::Monthly,
            2 => Self::Bimonthly,
            3 => Self::Quarterly,
            6 => Self::Semiannual,
            12 => Self::Annual,
            n => Self::EveryMonths(n),
        }
    }

    pub fn months(self) -> u32 {
        match self {
            Self::Single => 0,
            Self::Monthly => 1,
            Self::Bimonthly => 2,
            Self::Quarterly => 3,
            Self::Semiannual => 6,
            Self::Annual => 12,
            Self::EveryMonths(n) => n,
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::Single => "UNICA".to_string(),
            Self::Monthly => "MENSAL".to_string(),
            Self::Bimonthly => "BIMESTRAL".to_string(),
            Self::Quarterly => "TRIMESTRAL".to_string(),
            Self::Semiannual => "SEMESTRAL".to_string(),
            Self::Annual => "ANUAL".to_string(),
            Self::EveryMonths(n) => format!("A CADA {} MESES", n),
        }
    }
}

/// Atalho: rótulo ou código numérico direto para quantidade de meses.
pub fn periodicity_label_to_months(label: &str) -> u32 {
    Periodicity::from_label(label).months()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, Utc};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn strips_time_and_offset() {
        let noon = normalize_to_noon("2024-03-10T23:59:00-03:00").unwrap();
        assert_eq!(noon.date(), day(2024, 3, 10));
        assert_eq!(noon.time(), super::noon());
        assert!(normalize_to_noon("10/03/2024").is_none());
        assert!(normalize_to_noon("").is_none());
    }

    #[test]
    fn datetime_keeps_its_own_calendar_day() {
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        let late_evening = offset.with_ymd_and_hms(2024, 3, 10, 22, 0, 0).unwrap();
        assert_eq!(normalize_datetime_to_noon(&late_evening).date(), day(2024, 3, 10));

        let utc = Utc.with_ymd_and_hms(2024, 3, 11, 1, 0, 0).unwrap();
        assert_eq!(normalize_datetime_to_noon(&utc).date(), day(2024, 3, 11));
    }

    #[test]
    fn month_arithmetic_is_calendar_based() {
        assert_eq!(add_months(day(2024, 1, 15), 1).unwrap(), day(2024, 2, 15));
        assert_eq!(add_months(day(2024, 1, 31), 1).unwrap(), day(2024, 2, 29));
        assert_eq!(add_months(day(2024, 11, 10), 12).unwrap(), day(2025, 11, 10));
        assert_eq!(nth_due_date(day(2024, 1, 31), 3, 1).unwrap(), day(2024, 4, 30));
        assert_eq!(days_between(day(2024, 1, 1), day(2024, 3, 1)), 60);
        assert_eq!(days_between(day(2024, 3, 1), day(2024, 1, 1)), -60);
    }

    #[test]
    fn out_of_range_offsets_are_errors() {
        assert!(matches!(add_months(day(2024, 1, 1), u32::MAX), Err(AppError::InvalidInput(_))));
        assert!(matches!(nth_due_date(day(2024, 1, 1), 2, 2_147_483_648), Err(AppError::InvalidInput(_))));
        assert!(matches!(nth_due_date(day(2024, 1, 1), 1, 2_147_483_648), Err(AppError::InvalidInput(_))));
        assert_eq!(nth_due_date(day(2024, 1, 1), 0, 2_147_483_648).unwrap(), day(2024, 1, 1));
    }

    #[test]
    fn periodicity_labels_map_to_months() {
        assert_eq!(periodicity_label_to_months("MENSAL"), 1);
        assert_eq!(periodicity_label_to_months("monthly"), 1);
        assert_eq!(periodicity_label_to_months("BIMESTRAL"), 2);
        assert_eq!(periodicity_label_to_months("TRIMESTRAL"), 3);
        assert_eq!(periodicity_label_to_months("INTERMEDIATE"), 6);
        assert_eq!(periodicity_label_to_months("SEMIANNUAL"), 6);
        assert_eq!(periodicity_label_to_months("ANUAL"), 12);
        assert_eq!(periodicity_label_to_months("4"), 4);
        assert_eq!(periodicity_label_to_months("QUINZENAL"), 0);
        assert_eq!(periodicity_label_to_months(""), 0);
    }

    #[test]
    fn month_counts_round_trip_to_named_variants() {
        assert_eq!(Periodicity::from_months(12), Periodicity::Annual);
        assert_eq!(Periodicity::from_months(5), Periodicity::EveryMonths(5));
        assert_eq!(Periodicity::from_months(0).label(), "UNICA");
    }
}
