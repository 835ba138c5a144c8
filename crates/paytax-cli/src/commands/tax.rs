use clap::Args;
use serde_json::Value;

use paytax_core::record::{calculate_record, TaxationRecord};
use paytax_core::regime::RegimeCatalog;
use paytax_core::tax::{break_even_record, compare_record};

use crate::input;

/// Arguments for a single-regime calculation
#[derive(Args)]
pub struct CalculateArgs {
    /// Path to a taxation record (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a regime comparison
#[derive(Args)]
pub struct CompareArgs {
    /// Path to a taxation record (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the break-even search
#[derive(Args)]
pub struct BreakEvenArgs {
    /// Path to a taxation record (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_calculate(args: CalculateArgs, catalog: &RegimeCatalog) -> Result<Value, Box<dyn std::error::Error>> {
    let record: TaxationRecord = input::read_input(args.input.as_deref(), "tax calculation")?;
    let result = calculate_record(&record, catalog)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_compare(args: CompareArgs, catalog: &RegimeCatalog) -> Result<Value, Box<dyn std::error::Error>> {
    let record: TaxationRecord = input::read_input(args.input.as_deref(), "regime comparison")?;
    let result = compare_record(&record, catalog)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_break_even(args: BreakEvenArgs, catalog: &RegimeCatalog) -> Result<Value, Box<dyn std::error::Error>> {
    let record: TaxationRecord = input::read_input(args.input.as_deref(), "break-even search")?;
    let result = break_even_record(&record, catalog)?;
    Ok(serde_json::to_value(result)?)
}
