//! Currency arithmetic on exact decimals.
//!
//! All amounts in the domain are `rust_decimal::Decimal`. Quantities may be
//! fractional (0.5 labor-hours); currency amounts are kept at two decimal
//! places, rounded half-up.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Round a currency amount to cents, half-up.
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Extended price of one line: `quantity * unit_price`, rounded to cents.
pub fn line_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round_cents(quantity * unit_price)
}

/// Sales tax rate expressed as a fraction (0.085 = 8.5%).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(Decimal);

impl TaxRate {
    pub fn new(rate: Decimal) -> DomainResult<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(DomainError::validation(
                "tax rate must be a fraction between 0 and 1",
            ));
        }
        Ok(Self(rate))
    }

    pub fn as_fraction(&self) -> Decimal {
        self.0
    }

    /// Tax owed on a subtotal, rounded to cents.
    pub fn tax_on(&self, subtotal: Decimal) -> Decimal {
        round_cents(subtotal * self.0)
    }

    /// Subtotal grossed up by this rate, rounded to cents.
    pub fn gross(&self, subtotal: Decimal) -> Decimal {
        round_cents(subtotal * (Decimal::ONE + self.0))
    }
}

impl Default for TaxRate {
    /// 8.5%, the shop default.
    fn default() -> Self {
        Self(Decimal::new(85, 3))
    }
}

impl core::fmt::Display for TaxRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl ValueObject for TaxRate {}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_up_to_cents() {
        assert_eq!(round_cents(dec!(6.5008)), dec!(6.50));
        assert_eq!(round_cents(dec!(2.005)), dec!(2.01));
        assert_eq!(round_cents(dec!(17.50)), dec!(17.50));
    }

    #[test]
    fn line_total_multiplies_then_rounds() {
        assert_eq!(line_total(dec!(5), dec!(3.50)), dec!(17.50));
        assert_eq!(line_total(dec!(0.5), dec!(90.00)), dec!(45.00));
        assert_eq!(line_total(dec!(3), dec!(0.333)), dec!(1.00));
    }

    #[test]
    fn tax_rate_validates_fraction_range() {
        assert!(TaxRate::new(dec!(0)).is_ok());
        assert!(TaxRate::new(dec!(0.085)).is_ok());
        assert!(TaxRate::new(dec!(1)).is_ok());
        assert!(TaxRate::new(dec!(-0.01)).is_err());
        assert!(TaxRate::new(dec!(1.5)).is_err());
    }

    #[test]
    fn default_rate_is_eight_and_a_half_percent() {
        assert_eq!(TaxRate::default().as_fraction(), dec!(0.085));
    }

    #[test]
    fn tax_and_gross_agree_with_the_shop_example() {
        let rate = TaxRate::new(dec!(0.085)).unwrap();
        assert_eq!(rate.tax_on(dec!(76.48)), dec!(6.50));
        assert_eq!(rate.gross(dec!(76.48)), dec!(82.98));
    }
}
