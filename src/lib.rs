//! Retirement Engine - long-term retirement projection and simulation
//!
//! This library provides:
//! - Typed financial records (income, holdings, loans, insurance, family, goals)
//! - Goal expansion, loan amortization and insurance payout schedules
//! - Time-varying return resolution with overrides and rate decay
//! - Deterministic year-by-year corpus projection with withdrawal strategies
//! - Parallel, seeded Monte Carlo simulation of plan success

pub mod error;
pub mod records;
pub mod assumptions;
pub mod cashflows;
pub mod projection;
pub mod simulation;
pub mod orchestrator;

// Re-export commonly used types
pub use error::{EngineError, EngineResult};
pub use records::{AssetBucket, FinancialRecordSet};
pub use assumptions::{ScenarioAssumptions, WithdrawalStrategy};
pub use projection::{CorpusProjector, ProjectionResult, ProjectionYear};
pub use simulation::{MonteCarloConfig, MonteCarloEngine, SimulationResult};
pub use orchestrator::ProjectionOrchestrator;
