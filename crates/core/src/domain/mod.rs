use std::str::FromStr;

use rust_decimal::Decimal;

pub mod approval;
pub mod claim;
pub mod escalation;
pub mod intervention;
pub mod settlement;

/// Converts a JSON/TOML float into a `Decimal` via its shortest decimal
/// rendering, so `0.1` becomes exactly `0.1` rather than the binary
/// approximation. Non-finite inputs collapse to zero.
pub fn decimal_from_f64(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_str(&value.to_string()).unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::decimal_from_f64;

    #[test]
    fn float_conversion_uses_shortest_decimal_rendering() {
        assert_eq!(decimal_from_f64(0.1), Decimal::new(1, 1));
        assert_eq!(decimal_from_f64(15750.0), Decimal::new(15_750, 0));
        assert_eq!(decimal_from_f64(f64::NAN), Decimal::ZERO);
    }
}
