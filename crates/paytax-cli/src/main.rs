mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::payroll::ScheduleArgs;
use commands::regimes::RegimesArgs;
use commands::tax::{BreakEvenArgs, CalculateArgs, CompareArgs};

/// Income-tax computation and payroll withholding for salaried employees
#[derive(Parser)]
#[command(
    name = "paytax",
    version,
    about = "Income-tax computation and payroll withholding",
    long_about = "A CLI for computing annual income-tax liability under the legacy and \
                  simplified regimes with decimal precision. Supports single-regime \
                  calculation, regime comparison, break-even deductions and monthly \
                  withholding schedules."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Regime tables (JSON or YAML) merged over the built-in tables by id
    #[arg(long, global = true)]
    regimes: Option<String>,

    /// Use only the tables from --regimes, ignoring the built-in ones
    #[arg(long, global = true, requires = "regimes")]
    replace_regimes: bool,

    /// Emit log lines on stderr as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate the liability for a record under its own regime
    Calculate(CalculateArgs),
    /// Compare both regimes for a record and recommend the cheaper one
    Compare(CompareArgs),
    /// Additional legacy deductions needed to match the simplified regime
    BreakEven(BreakEvenArgs),
    /// Build a monthly withholding schedule for one employee
    Schedule(ScheduleArgs),
    /// List the regime tables in force
    Regimes(RegimesArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    if let Commands::Version = cli.command {
        println!("paytax {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let catalog = match commands::regimes::load_catalog(cli.regimes.as_deref(), cli.replace_regimes) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(2);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Calculate(args) => commands::tax::run_calculate(args, &catalog),
        Commands::Compare(args) => commands::tax::run_compare(args, &catalog),
        Commands::BreakEven(args) => commands::tax::run_break_even(args, &catalog),
        Commands::Schedule(args) => commands::payroll::run_schedule(args, &catalog),
        Commands::Regimes(args) => commands::regimes::run_regimes(args, &catalog),
        Commands::Version => return,
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` overrides
/// the default `warn` level.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = installed {
        eprintln!("{}: logging disabled: {}", "warning".yellow().bold(), e);
    }
}
