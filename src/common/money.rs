// src/common/money.rs

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer};

/// Arredonda para centavos (meio para longe do zero, como nas planilhas comerciais).
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Lê um valor decimal digitado livremente.
///
/// Se houver vírgula, trata como formato brasileiro ("1.234,56"): os pontos são
/// separadores de milhar e a vírgula é o separador decimal. Sem vírgula, o texto
/// é lido como um número simples. Vazio ou ilegível vira `None`.
pub fn parse_optional_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };

    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .ok()
}

/// Versão tolerante: qualquer coisa ilegível vira zero.
pub fn parse_decimal(raw: &str) -> Decimal {
    parse_optional_decimal(raw).unwrap_or(Decimal::ZERO)
}

// O formulário pode mandar número ou texto ("1.234,50"); aceitamos os dois.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDecimal {
    Number(Decimal),
    Text(String),
}

/// `deserialize_with` para campos obrigatórios: texto ilegível vira 0.
pub fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawDecimal::deserialize(deserializer)? {
        RawDecimal::Number(value) => value,
        RawDecimal::Text(text) => parse_decimal(&text),
    })
}

/// `deserialize_with` para fatores opcionais: ausente, `null` ou ilegível vira `None`.
pub fn lenient_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawDecimal>::deserialize(deserializer)? {
        Some(RawDecimal::Number(value)) => Some(value),
        Some(RawDecimal::Text(text)) => parse_optional_decimal(&text),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn d(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    #[test]
    fn parses_brazilian_format_with_thousands() {
        assert_eq!(parse_decimal("1.234.567,89"), d("1234567.89"));
        assert_eq!(parse_decimal("0,5"), d("0.5"));
    }

    #[test]
    fn parses_plain_format() {
        assert_eq!(parse_decimal("1234.5"), d("1234.5"));
        assert_eq!(parse_decimal("  42 "), d("42"));
    }

    #[test]
    fn garbage_degrades_to_zero_or_none() {
        assert_eq!(parse_decimal(""), Decimal::ZERO);
        assert_eq!(parse_decimal("abc"), Decimal::ZERO);
        assert_eq!(parse_optional_decimal("   "), None);
        assert_eq!(parse_optional_decimal("R$ 10"), None);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_cents(d("2.345")), d("2.35"));
        assert_eq!(round_cents(d("-2.345")), d("-2.35"));
        assert_eq!(round_cents(d("2.344")), d("2.34"));
    }

    #[derive(Deserialize)]
    struct Form {
        #[serde(deserialize_with = "lenient_decimal")]
        value: Decimal,
        #[serde(default, deserialize_with = "lenient_optional_decimal")]
        factor: Option<Decimal>,
    }

    #[test]
    fn payload_accepts_numbers_and_locale_strings() {
        let form: Form = serde_json::from_str(r#"{"value": "1.500,25", "factor": 1.1}"#).unwrap();
        assert_eq!(form.value, d("1500.25"));
        assert_eq!(form.factor, Some(d("1.1")));

        let form: Form = serde_json::from_str(r#"{"value": 10, "factor": ""}"#).unwrap();
        assert_eq!(form.value, d("10"));
        assert_eq!(form.factor, None);

        let form: Form = serde_json::from_str(r#"{"value": "xyz"}"#).unwrap();
        assert_eq!(form.value, Decimal::ZERO);
        assert_eq!(form.factor, None);
    }
}
