use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::ConfigError;

/// Finds station-trading candidates in a single EVE Online market region.
#[derive(Debug, Parser)]
#[command(name = "eve_flipper", version, about)]
pub struct Args {
    /// Region to scan (defaults to The Forge)
    #[arg(long, env = "EVE_REGION", default_value_t = 10000002)]
    pub region: u32,

    /// Broker fee on the buy side, as a fraction of price
    #[arg(long, env = "EVE_BUY_FEE_RATE", default_value_t = 0.01)]
    pub buy_fee_rate: f64,

    /// Broker fee on the sell side, as a fraction of price
    #[arg(long, env = "EVE_SELL_FEE_RATE", default_value_t = 0.024)]
    pub sell_fee_rate: f64,

    /// Sales tax, as a fraction of price
    #[arg(long, env = "EVE_TAX_RATE", default_value_t = 0.08)]
    pub tax_rate: f64,

    /// JSON object mapping type id to item name
    #[arg(long, env = "EVE_TYPE_NAMES", default_value = "type_ids.json")]
    pub names: PathBuf,

    /// Where to write the report (.xlsx, or .csv)
    #[arg(long, env = "EVE_REPORT", default_value = "recommendations.xlsx")]
    pub output: PathBuf,

    #[arg(long, env = "EVE_ESI_URL", default_value = "https://esi.evetech.net/latest")]
    pub esi_url: String,

    #[arg(long, env = "EVE_DATASOURCE", default_value = "tranquility")]
    pub datasource: String,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn fees(&self) -> Result<FeeSchedule, ConfigError> {
        FeeSchedule::new(self.buy_fee_rate, self.sell_fee_rate, self.tax_rate)
    }
}

/// Transaction cost rates, all fractions of price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub buy_fee_rate: f64,
    pub sell_fee_rate: f64,
    pub tax_rate: f64,
}

impl FeeSchedule {
    pub fn new(buy_fee_rate: f64, sell_fee_rate: f64, tax_rate: f64) -> Result<Self, ConfigError> {
        check_rate("buy_fee_rate", buy_fee_rate)?;
        check_rate("sell_fee_rate", sell_fee_rate)?;
        check_rate("tax_rate", tax_rate)?;

        Ok(FeeSchedule {
            buy_fee_rate,
            sell_fee_rate,
            tax_rate,
        })
    }

    pub fn cost(&self, buy_price: f64, sell_price: f64) -> f64 {
        buy_price * self.buy_fee_rate + sell_price * (self.sell_fee_rate + self.tax_rate)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            buy_fee_rate: 0.01,
            sell_fee_rate: 0.024,
            tax_rate: 0.08,
        }
    }
}

fn check_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { field, value })
    }
}

/// Logs go to stderr; stdout is reserved for the candidate list.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_market_rates() {
        let args = Args::parse_from(["eve_flipper"]);
        assert_eq!(args.region, 10000002);
        assert_eq!(args.fees().unwrap(), FeeSchedule::default());
        assert_eq!(args.output, PathBuf::from("recommendations.xlsx"));
    }

    #[test]
    fn rejects_negative_rate() {
        let args = Args::parse_from(["eve_flipper", "--tax-rate=-0.1"]);
        assert!(matches!(
            args.fees(),
            Err(ConfigError::InvalidRate { field: "tax_rate", .. })
        ));
    }

    #[test]
    fn cost_applies_each_rate_to_its_side() {
        let fees = FeeSchedule::default();
        let cost = fees.cost(100.0, 150.0);
        assert!((cost - 16.6).abs() < 1e-9);

        let no_tax = FeeSchedule::new(0.01, 0.024, 0.0).unwrap();
        assert!((no_tax.cost(100.0, 150.0) - 4.6).abs() < 1e-9);
    }
}
