//! Billing configuration from the environment.
//!
//! Same shape as the rest of the process config: read the variable, fall
//! back to a sane shop default, warn on values we cannot parse.

use core::str::FromStr;

use rust_decimal::Decimal;
use tracing::warn;

use wrenchflow_core::TaxRate;

/// What to do when a part is requested beyond its on-hand quantity.
///
/// Shops routinely backorder, so the default is to warn and proceed;
/// `Block` turns the shortage into a hard `InsufficientStock` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StockPolicy {
    #[default]
    Warn,
    Block,
}

impl FromStr for StockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" => Ok(StockPolicy::Warn),
            "block" => Ok(StockPolicy::Block),
            other => Err(format!("unknown stock policy: {other}")),
        }
    }
}

/// Billing knobs shared by the work-order and invoicing services.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillingConfig {
    pub default_tax_rate: TaxRate,
    pub stock_policy: StockPolicy,
}

impl BillingConfig {
    /// Read `WRENCHFLOW_TAX_RATE` (fraction, e.g. "0.085") and
    /// `WRENCHFLOW_STOCK_POLICY` ("warn" | "block"), keeping defaults for
    /// anything absent or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("WRENCHFLOW_TAX_RATE") {
            match Decimal::from_str(&raw).map_err(|e| e.to_string()).and_then(|d| {
                TaxRate::new(d).map_err(|e| e.to_string())
            }) {
                Ok(rate) => config.default_tax_rate = rate,
                Err(err) => {
                    warn!(raw, error = %err, "ignoring invalid WRENCHFLOW_TAX_RATE");
                }
            }
        }

        if let Ok(raw) = std::env::var("WRENCHFLOW_STOCK_POLICY") {
            match raw.parse() {
                Ok(policy) => config.stock_policy = policy,
                Err(err) => {
                    warn!(raw, error = %err, "ignoring invalid WRENCHFLOW_STOCK_POLICY");
                }
            }
        }

        config
    }
}
