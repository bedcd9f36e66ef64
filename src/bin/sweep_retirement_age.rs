//! Sweep candidate retirement ages and report plan success for each
//!
//! Usage: cargo run --release --bin sweep_retirement_age [-- --json]
//!
//! Configuration comes from the environment:
//! RECORDS_PATH, SCENARIO_PATH, SWEEP_MIN_AGE, SWEEP_MAX_AGE, TRIALS, SEED,
//! AS_OF (YYYY-MM-DD) and OUTPUT_PATH.

use std::env;
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use retirement_engine::assumptions::loader::load_scenario;
use retirement_engine::records::load_record_set;
use retirement_engine::ProjectionOrchestrator;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn main() -> Result<()> {
    env_logger::init();

    let json_output = env::args().any(|arg| arg == "--json");
    let start = Instant::now();

    let records_path = env_or("RECORDS_PATH", "data/sample_records.json".to_string());
    let scenario_path = env_or("SCENARIO_PATH", "data/sample_scenario.json".to_string());
    let output_path = env_or("OUTPUT_PATH", "retirement_age_sweep.csv".to_string());
    let trials: u32 = env_or("TRIALS", 500);
    let seed: u64 = env_or("SEED", 42);
    let as_of: NaiveDate = env_or("AS_OF", chrono::Local::now().date_naive());

    let records = load_record_set(&records_path)?;
    let scenario = load_scenario(&scenario_path)?;
    let min_age: u32 = env_or("SWEEP_MIN_AGE", scenario.current_age + 1);
    let max_age: u32 = env_or("SWEEP_MAX_AGE", scenario.life_expectancy.saturating_sub(10));

    println!(
        "Sweeping retirement ages {}..={} ({} trials each, seed {})",
        min_age, max_age, trials, seed
    );

    let orchestrator = ProjectionOrchestrator::new(scenario, as_of);
    let points = orchestrator.retirement_age_sweep(&records, None, min_age..=max_age, trials, seed)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else {
        println!("{:>4} {:>6} {:>16} {:>10} {:>16}", "Age", "Year", "Corpus", "Success", "Median end");
        println!("{}", "-".repeat(56));
        for point in &points {
            println!(
                "{:>4} {:>6} {:>16.0} {:>9.1}% {:>16.0}",
                point.retirement_age,
                point.retirement_year,
                point.retirement_corpus.unwrap_or(0.0),
                point.success_probability * 100.0,
                point.median_terminal
            );
        }
    }

    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    for point in &points {
        writer.serialize(point)?;
    }
    writer.flush()?;

    println!("\nSweep written to {} in {:?}", output_path, start.elapsed());
    Ok(())
}
