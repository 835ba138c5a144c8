use clap::Args;
use serde_json::Value;

use paytax_core::payroll::{build_withholding_schedule, WithholdingRequest};
use paytax_core::regime::RegimeCatalog;

use crate::input;

/// Arguments for a monthly withholding schedule
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to a withholding request (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_schedule(args: ScheduleArgs, catalog: &RegimeCatalog) -> Result<Value, Box<dyn std::error::Error>> {
    let request: WithholdingRequest = input::read_input(args.input.as_deref(), "withholding schedule")?;
    let result = build_withholding_schedule(&request, catalog)?;
    Ok(serde_json::to_value(result)?)
}
