use clap::Args;
use serde_json::{json, Value};
use tracing::debug;

use paytax_core::regime::{RegimeCatalog, RegimeConfigProvider, RegimeRules, TaxRegime, TaxYear};

use crate::input;

/// Arguments for listing regime tables
#[derive(Args)]
pub struct RegimesArgs {
    /// Show the full tables resolved for one fiscal year, e.g. 2024-25
    #[arg(long)]
    pub year: Option<String>,
}

/// Built-in tables, optionally overridden or replaced by a file.
pub fn load_catalog(path: Option<&str>, replace: bool) -> Result<RegimeCatalog, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(RegimeCatalog::builtin()?);
    };
    let raw: RegimeCatalog = input::file::read_document(path)?;
    let custom = RegimeCatalog::new(raw.tables().to_vec())?;
    debug!(path, tables = custom.tables().len(), replace, "loaded regime tables");
    if replace {
        Ok(custom)
    } else {
        Ok(RegimeCatalog::builtin()?.with_overrides(custom)?)
    }
}

pub fn run_regimes(args: RegimesArgs, catalog: &RegimeCatalog) -> Result<Value, Box<dyn std::error::Error>> {
    match args.year {
        Some(label) => {
            let year = TaxYear::parse_label(&label)?;
            let mut resolved = serde_json::Map::new();
            for regime in TaxRegime::ALL {
                let rules = catalog.rules_for(&year, regime)?;
                resolved.insert(regime.code().to_string(), serde_json::to_value(rules)?);
            }
            Ok(json!({ "tax_year": year.label(), "result": resolved }))
        }
        None => Ok(Value::Array(catalog.tables().iter().map(summary).collect())),
    }
}

fn summary(rules: &RegimeRules) -> Value {
    json!({
        "id": rules.id,
        "regime": rules.regime,
        "effective_from": rules.effective_from,
        "effective_to": rules.effective_to,
        "standard_deduction": rules.standard_deduction,
        "rebate_threshold": rules.rebate.as_ref().map(|r| r.threshold),
        "cess_rate": rules.cess_rate,
        "surcharge_tiers": rules.surcharge.len(),
    })
}
