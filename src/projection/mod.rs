//! Year-by-year corpus projection through accumulation and drawdown

mod allocation;
mod engine;
mod schedule;
mod state;
mod withdrawal;
mod years;

pub use allocation::{draw, Allocation};
pub use engine::CorpusProjector;
pub use schedule::{ScheduledFlows, YearFlows};
pub use state::BucketBalances;
pub use withdrawal::{annual_expense_need, WithdrawalPlanner};
pub use years::{Phase, ProjectionResult, ProjectionSummary, ProjectionYear, WithdrawalYear};
