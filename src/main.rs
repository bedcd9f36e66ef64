//! Retirement engine CLI
//!
//! Loads a record set (JSON, optionally with holdings from CSV) and a
//! scenario, runs one engine operation and prints the result as JSON.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;

use retirement_engine::assumptions::loader::load_scenario;
use retirement_engine::projection::{Phase, ProjectionYear};
use retirement_engine::records::{load_holdings_csv, load_record_set};
use retirement_engine::simulation::YearBand;
use retirement_engine::{FinancialRecordSet, MonteCarloConfig, ProjectionOrchestrator, ScenarioAssumptions};

#[derive(Parser, Debug)]
#[command(name = "retire", about = "Retirement corpus projection and Monte Carlo simulation")]
struct Cli {
    /// Record set JSON (income, holdings, loans, policies, family, goals)
    #[arg(long)]
    records: PathBuf,

    /// Holdings CSV; replaces the holdings in the record set
    #[arg(long)]
    holdings_csv: Option<PathBuf>,

    /// Scenario JSON; defaults apply to any missing field
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Valuation date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    #[arg(long, default_value = "self")]
    owner: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Current assets, liabilities and net worth
    NetWorth,
    /// Deterministic year-by-year corpus matrix
    Project {
        /// Years to project
        #[arg(long, default_value_t = 10)]
        years: u32,
        /// Project through life expectancy instead
        #[arg(long)]
        full: bool,
        /// Also write the matrix as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Monte Carlo outcome distribution
    Simulate {
        #[arg(long, default_value_t = 1000)]
        trials: u32,
        /// Years of percentile bands to report; success always covers the full life
        #[arg(long, default_value_t = 10)]
        horizon: u32,
        /// Report bands through life expectancy
        #[arg(long)]
        full_life: bool,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Also write the percentile bands as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Amortization schedule for every loan
    Amortize,
    /// Holdings, policies and loans maturing before retirement
    Maturities,
    /// Post-retirement withdrawal plan
    Withdrawals,
}

/// Flat matrix row for CSV export
#[derive(Serialize)]
struct MatrixCsvRow {
    year: i32,
    age: u32,
    phase: Phase,
    opening_total: f64,
    income: f64,
    contributions: f64,
    payouts: f64,
    loan_payments: f64,
    premiums: f64,
    obligations_from_income: f64,
    goals_from_income: f64,
    goal_withdrawals: f64,
    retirement_withdrawal: f64,
    growth: f64,
    closing_total: f64,
    shortfall: bool,
    shortfall_amount: f64,
}

impl From<&ProjectionYear> for MatrixCsvRow {
    fn from(row: &ProjectionYear) -> Self {
        Self {
            year: row.year,
            age: row.age,
            phase: row.phase,
            opening_total: row.opening_total,
            income: row.income,
            contributions: row.contributions,
            payouts: row.payouts,
            loan_payments: row.loan_payments,
            premiums: row.premiums,
            obligations_from_income: row.obligations_from_income,
            goals_from_income: row.goals_from_income,
            goal_withdrawals: row.goal_withdrawals,
            retirement_withdrawal: row.retirement_withdrawal,
            growth: row.growth,
            closing_total: row.closing_total,
            shortfall: row.shortfall,
            shortfall_amount: row.shortfall_amount,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let records = load_records(&cli.records, cli.holdings_csv.as_deref())?;
    let scenario = match &cli.scenario {
        Some(path) => load_scenario(path)?,
        None => ScenarioAssumptions::default(),
    };
    let as_of = cli.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    let orchestrator = ProjectionOrchestrator::new(scenario, as_of);
    let owner = cli.owner.as_str();

    match cli.command {
        Command::NetWorth => print_json(&orchestrator.net_worth(owner, &records)),
        Command::Project { years, full, csv } => {
            // The projector caps the horizon at life expectancy
            let years = if full { u32::MAX } else { years };
            let matrix = orchestrator.projection_matrix(owner, &records, None, Some(years))?;
            if let Some(path) = csv {
                write_csv(&path, matrix.projection.years.iter().map(MatrixCsvRow::from))?;
                log::info!("matrix written to {}", path.display());
            }
            print_json(&matrix)
        }
        Command::Simulate {
            trials,
            horizon,
            full_life,
            seed,
            csv,
        } => {
            let config = if full_life {
                MonteCarloConfig::full_life(trials, seed)
            } else {
                MonteCarloConfig {
                    trials,
                    horizon_years: Some(horizon),
                    seed,
                }
            };
            let summary = orchestrator.monte_carlo(owner, &records, None, config)?;
            if let Some(path) = csv {
                write_csv(&path, summary.simulation.bands.iter().map(BandCsvRow::from))?;
                log::info!("percentile bands written to {}", path.display());
            }
            print_json(&summary)
        }
        Command::Amortize => print_json(&orchestrator.amortization(owner, &records)),
        Command::Maturities => print_json(&orchestrator.maturities(owner, &records, None)?),
        Command::Withdrawals => print_json(&orchestrator.withdrawal_plan(owner, &records, None)?),
    }
}

#[derive(Serialize)]
struct BandCsvRow {
    year: i32,
    age: u32,
    p10: f64,
    p50: f64,
    p90: f64,
}

impl From<&YearBand> for BandCsvRow {
    fn from(band: &YearBand) -> Self {
        Self {
            year: band.year,
            age: band.age,
            p10: band.band.p10,
            p50: band.band.p50,
            p90: band.band.p90,
        }
    }
}

fn load_records(path: &Path, holdings_csv: Option<&Path>) -> Result<FinancialRecordSet> {
    let mut records = load_record_set(path)?;
    if let Some(csv_path) = holdings_csv {
        records.holdings = load_holdings_csv(csv_path)?;
    }
    log::info!(
        "loaded {} holdings, {} loans, {} policies, {} goals",
        records.holdings.len(),
        records.loans.len(),
        records.insurance_policies.len(),
        records.goals.len()
    );
    Ok(records)
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
