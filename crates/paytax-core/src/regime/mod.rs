//! Fiscal years, regime rule tables and the provider that resolves them.

pub mod catalog;
pub mod rules;
pub mod tax_year;

pub use catalog::{RegimeCatalog, RegimeConfigProvider};
pub use rules::{ExemptionLimits, RegimeRules, Rebate, Slab, SlabTable, SurchargeTier, TaxRegime};
pub use tax_year::TaxYear;
