mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::demo::SampleArgs;
use commands::portfolio::{FilterArgs, StatsArgs};
use commands::pool::{AutoDistributeArgs, ExpectedReturnArgs, PoolArgs, ValidateArgs};
use commands::requests::{ApproveArgs, RejectArgs};
use commands::schedule::ScheduleArgs;
use commands::taxonomy::ClassifyArgs;

/// Peer-to-peer lending portfolio and pool accounting
#[derive(Parser)]
#[command(
    name = "lend",
    version,
    about = "Peer-to-peer lending portfolio and pool accounting",
    long_about = "A CLI for the lendfolio engine: risk-band classification, \
                  installment schedules, pool allocation and expected returns, \
                  portfolio statistics, and credit request resolution. All \
                  money math is decimal-precise."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a borrower credit score onto its risk band
    Classify(ClassifyArgs),
    /// Derive an installment schedule from loan terms
    Schedule(ScheduleArgs),
    /// Validate a pool distribution before confirmation
    ValidateDistribution(ValidateArgs),
    /// Weighted expected return of a pool distribution
    ExpectedReturn(ExpectedReturnArgs),
    /// Seed a distribution from a diversification preset
    AutoDistribute(AutoDistributeArgs),
    /// Full pool model: validation, band amounts, expected return
    Pool(PoolArgs),
    /// Aggregate portfolio statistics over a loan collection
    PortfolioStats(StatsArgs),
    /// Filtered and sorted view over a loan collection
    PortfolioFilter(FilterArgs),
    /// Approve a pending credit request into a loan
    Approve(ApproveArgs),
    /// Reject a pending credit request
    Reject(RejectArgs),
    /// Generate a seeded demo portfolio
    SamplePortfolio(SampleArgs),
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

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Classify(args) => commands::taxonomy::run_classify(args),
        Commands::Schedule(args) => commands::schedule::run_schedule(args),
        Commands::ValidateDistribution(args) => commands::pool::run_validate(args),
        Commands::ExpectedReturn(args) => commands::pool::run_expected_return(args),
        Commands::AutoDistribute(args) => commands::pool::run_auto_distribute(args),
        Commands::Pool(args) => commands::pool::run_pool(args),
        Commands::PortfolioStats(args) => commands::portfolio::run_stats(args),
        Commands::PortfolioFilter(args) => commands::portfolio::run_filter(args),
        Commands::Approve(args) => commands::requests::run_approve(args),
        Commands::Reject(args) => commands::requests::run_reject(args),
        Commands::SamplePortfolio(args) => commands::demo::run_sample(args),
        Commands::Version => {
            println!("lend {}", env!("CARGO_PKG_VERSION"));
            return;
        }
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
