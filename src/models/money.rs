use bigdecimal::BigDecimal;
use serde::Serializer;

/// Formats an amount with exactly two fractional digits, rounding half up.
pub fn usd(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

pub fn serialize_usd<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&usd(value))
}
