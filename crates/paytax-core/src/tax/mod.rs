//! Liability engine: slab tax, rebate, surcharge and cess for one regime,
//! and the two-regime comparison built on it.

pub mod calculation;
pub mod comparison;
pub mod slabs;

pub use calculation::{calculate_tax, TaxCalculationResult};
pub use comparison::{
    break_even_deductions, break_even_record, compare_record, compare_regimes, BreakEvenResult,
    RegimeComparisonResult,
};
pub use slabs::SlabTax;
