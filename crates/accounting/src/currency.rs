use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use acctparty_core::{CompanyId, ValueObject};

/// Currency precision settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    /// Number of decimal digits displayed for amounts in this currency.
    pub digits: u32,
    /// Smallest representable amount (e.g. `0.01`, `0.05`).
    pub rounding: Decimal,
}

impl ValueObject for Currency {}

impl Currency {
    pub fn new(code: impl Into<String>, digits: u32, rounding: Decimal) -> Self {
        Self {
            code: code.into(),
            digits,
            rounding,
        }
    }

    /// Two-digit currency with a `0.01` rounding factor.
    pub fn with_cents(code: impl Into<String>) -> Self {
        Self::new(code, 2, Decimal::new(1, 2))
    }

    /// Round `amount` to a multiple of the rounding factor (half to even).
    pub fn round(&self, amount: Decimal) -> Decimal {
        if self.rounding.is_zero() {
            return amount.round_dp_with_strategy(self.digits, RoundingStrategy::MidpointNearestEven);
        }
        let units = (amount / self.rounding)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        (units * self.rounding).round_dp(self.digits)
    }
}

/// Company the acting user works for, with its accounting currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub currency: Currency,
}

impl Company {
    pub fn new(id: CompanyId, currency: Currency) -> Self {
        Self { id, currency }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_float_noise_to_cents() {
        let eur = Currency::with_cents("EUR");
        assert_eq!(eur.round(dec("0.30000000000000004")), dec("0.30"));
        assert_eq!(eur.round(dec("-12.3449999")), dec("-12.34"));
    }

    #[test]
    fn rounds_half_to_even() {
        let eur = Currency::with_cents("EUR");
        assert_eq!(eur.round(dec("0.125")), dec("0.12"));
        assert_eq!(eur.round(dec("0.135")), dec("0.14"));
    }

    #[test]
    fn rounds_to_coarse_factor() {
        let chf = Currency::new("CHF", 2, dec("0.05"));
        assert_eq!(chf.round(dec("1.02")), dec("1.00"));
        assert_eq!(chf.round(dec("1.03")), dec("1.05"));
    }

    proptest! {
        /// Property: rounding an amount that is already on the grid is a no-op.
        #[test]
        fn rounding_is_idempotent(cents in -10_000_000i64..10_000_000i64) {
            let eur = Currency::with_cents("EUR");
            let amount = Decimal::new(cents, 2);
            prop_assert_eq!(eur.round(amount), amount);
            prop_assert_eq!(eur.round(eur.round(amount)), amount);
        }
    }
}
