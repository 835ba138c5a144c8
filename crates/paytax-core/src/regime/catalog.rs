use serde::{Deserialize, Serialize};

use crate::error::PayrollTaxError;
use crate::regime::{RegimeRules, TaxRegime, TaxYear};
use crate::PayrollTaxResult;

/// Built-in tables, parsed at runtime so that they stay plain data.
const BUILTIN_REGIMES: &str = include_str!("../../data/regimes.json");

/// Supplies the rule table in force for a fiscal year and regime.
pub trait RegimeConfigProvider {
    fn rules_for(&self, tax_year: &TaxYear, regime: TaxRegime) -> PayrollTaxResult<&RegimeRules>;
}

/// An in-memory set of validated regime tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeCatalog {
    tables: Vec<RegimeRules>,
}

impl RegimeCatalog {
    /// Validate every table and reject overlapping windows for one regime.
    pub fn new(tables: Vec<RegimeRules>) -> PayrollTaxResult<Self> {
        for table in &tables {
            table.validate()?;
        }
        for (i, a) in tables.iter().enumerate() {
            for b in tables.iter().skip(i + 1) {
                if a.id == b.id {
                    return Err(PayrollTaxError::Configuration(format!(
                        "duplicate regime table id {}",
                        a.id
                    )));
                }
                if a.regime == b.regime && windows_overlap(a, b) {
                    return Err(PayrollTaxError::Configuration(format!(
                        "regime tables {} and {} have overlapping effective windows",
                        a.id, b.id
                    )));
                }
            }
        }
        Ok(Self { tables })
    }

    /// Tables shipped with the crate.
    pub fn builtin() -> PayrollTaxResult<Self> {
        Self::from_json_str(BUILTIN_REGIMES)
    }

    /// Parse `{"tables": [...]}` and validate.
    pub fn from_json_str(json: &str) -> PayrollTaxResult<Self> {
        let raw: RegimeCatalog = serde_json::from_str(json)
            .map_err(|e| PayrollTaxError::Configuration(format!("regime tables: {}", e)))?;
        Self::new(raw.tables)
    }

    /// Replace tables sharing an id with `overrides` and append the rest.
    pub fn with_overrides(self, overrides: RegimeCatalog) -> PayrollTaxResult<Self> {
        let mut tables = self.tables;
        for table in overrides.tables {
            match tables.iter_mut().find(|t| t.id == table.id) {
                Some(existing) => *existing = table,
                None => tables.push(table),
            }
        }
        Self::new(tables)
    }

    pub fn tables(&self) -> &[RegimeRules] {
        &self.tables
    }

    /// Fiscal years with a table for both regimes.
    pub fn supported_years(&self, candidates: impl IntoIterator<Item = TaxYear>) -> Vec<TaxYear> {
        candidates
            .into_iter()
            .filter(|y| TaxRegime::ALL.iter().all(|r| self.rules_for(y, *r).is_ok()))
            .collect()
    }
}

impl RegimeConfigProvider for RegimeCatalog {
    fn rules_for(&self, tax_year: &TaxYear, regime: TaxRegime) -> PayrollTaxResult<&RegimeRules> {
        self.tables
            .iter()
            .filter(|t| t.regime == regime && t.covers(tax_year))
            .max_by_key(|t| t.effective_from)
            .ok_or_else(|| {
                PayrollTaxError::Configuration(format!(
                    "no {} regime table in force for {}",
                    regime, tax_year
                ))
            })
    }
}

fn windows_overlap(a: &RegimeRules, b: &RegimeRules) -> bool {
    let a_before_b = a.effective_to.map_or(false, |end| end < b.effective_from);
    let b_before_a = b.effective_to.map_or(false, |end| end < a.effective_from);
    !(a_before_b || b_before_a)
}
