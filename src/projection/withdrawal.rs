//! Post-retirement living withdrawal under the selected strategy
//!
//! - `SIMPLE_DEPLETION`: the inflation-adjusted expense need, every year,
//!   until the corpus runs out.
//! - `SAFE_4_PERCENT`: `withdrawal_rate`% of the corpus at the first drawdown
//!   year, then that amount inflated each following year.
//! - `SUSTAINABLE`: the lesser of `corpus_return_rate`% of the current corpus
//!   and the expense need, so the corpus is not eroded faster than it earns.

use crate::assumptions::{ScenarioAssumptions, WithdrawalStrategy, DEFAULT_EXPENSE_REPLACEMENT};
use crate::records::FinancialRecordSet;

/// Annual retirement expense in today's value
///
/// The scenario's monthly expense when given, otherwise a fixed share of the
/// current active income.
pub fn annual_expense_need(
    records: &FinancialRecordSet,
    scenario: &ScenarioAssumptions,
    start_year: i32,
) -> f64 {
    match scenario.retirement_monthly_expense {
        Some(monthly) => monthly.max(0.0) * 12.0,
        None => records.monthly_income(start_year) * 12.0 * DEFAULT_EXPENSE_REPLACEMENT,
    }
}

/// Computes the living withdrawal target for each drawdown year
///
/// One planner serves one projection path: the safe-withdrawal strategy
/// remembers the corpus it first saw.
#[derive(Debug, Clone)]
pub struct WithdrawalPlanner {
    strategy: WithdrawalStrategy,
    need_today: f64,
    inflation: f64,
    start_year: i32,
    withdrawal_rate: f64,
    corpus_return_rate: f64,
    initial: Option<(i32, f64)>,
}

impl WithdrawalPlanner {
    pub fn new(scenario: &ScenarioAssumptions, need_today: f64, start_year: i32) -> Self {
        Self {
            strategy: scenario.withdrawal_strategy,
            need_today,
            inflation: scenario.inflation_rate / 100.0,
            start_year,
            withdrawal_rate: scenario.withdrawal_rate / 100.0,
            corpus_return_rate: scenario.corpus_return_rate / 100.0,
            initial: None,
        }
    }

    pub fn strategy(&self) -> WithdrawalStrategy {
        self.strategy
    }

    /// Expense need inflated to the given year
    pub fn expense_need(&self, year: i32) -> f64 {
        self.need_today * (1.0 + self.inflation).powi(year - self.start_year)
    }

    /// Withdrawal the strategy asks for in `year` given the corpus available
    pub fn target(&mut self, year: i32, corpus: f64) -> f64 {
        let corpus = corpus.max(0.0);
        match self.strategy {
            WithdrawalStrategy::SimpleDepletion => self.expense_need(year),
            WithdrawalStrategy::Safe4Percent => {
                let (first_year, first_corpus) = *self.initial.get_or_insert((year, corpus));
                self.withdrawal_rate * first_corpus * (1.0 + self.inflation).powi(year - first_year)
            }
            WithdrawalStrategy::Sustainable => {
                (self.corpus_return_rate * corpus).min(self.expense_need(year))
            }
        }
    }
}
