use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};

/// Rounds to two decimal places, halves away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Converts a major-unit amount (naira) to minor units (kobo) after rounding.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    (round_money(amount) * Decimal::ONE_HUNDRED).to_i64()
}

/// Converts minor units back to a two-decimal major-unit amount.
pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Converts a provider price in US cents to the store currency.
pub fn convert_usd_cents(cents: i64, rate: Decimal) -> Decimal {
    round_money(Decimal::new(cents, 2) * rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(d("10.005")), d("10.01"));
        assert_eq!(round_money(d("10.004")), d("10.00"));
        assert_eq!(round_money(d("0.125")), d("0.13"));
    }

    #[test]
    fn minor_units() {
        assert_eq!(to_minor_units(d("100.00")), Some(10_000));
        assert_eq!(to_minor_units(d("19.995")), Some(2_000));
        assert_eq!(from_minor_units(10_000), d("100.00"));
    }

    #[test]
    fn converts_provider_cents() {
        assert_eq!(convert_usd_cents(2000, d("1607.00")), d("32140.00"));
        assert_eq!(convert_usd_cents(1999, d("1607.00")), d("32123.93"));
    }
}
