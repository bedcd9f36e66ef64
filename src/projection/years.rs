//! Output structures for a corpus projection

use serde::Serialize;

use super::state::BucketBalances;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Accumulation,
    Drawdown,
}

/// One row of the year-by-year corpus matrix
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionYear {
    pub year: i32,
    pub age: u32,
    pub phase: Phase,

    pub opening: BucketBalances,
    pub opening_total: f64,

    // Inflows
    pub income: f64,
    /// SIPs, yearly contributions, lump sums and saved income
    pub contributions: f64,
    /// Insurance proceeds reinvested this year
    pub payouts: f64,

    // Outflows
    pub loan_payments: f64,
    pub premiums: f64,
    /// Part of loan payments and premiums covered by income
    pub obligations_from_income: f64,
    /// Goal amounts covered by income left after obligations
    pub goals_from_income: f64,
    /// Goal amounts drawn from the corpus
    pub goal_withdrawals: f64,
    pub retirement_withdrawal: f64,

    pub growth: f64,

    pub closing: BucketBalances,
    pub closing_total: f64,

    /// Outflows that could not be met from the corpus
    pub shortfall: bool,
    pub shortfall_amount: f64,

    /// Goals, payouts and maturities falling in the year
    pub events: Vec<String>,
}

/// Living withdrawal for one drawdown year
#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalYear {
    pub year: i32,
    pub age: u32,
    /// Amount the strategy asked for
    pub target: f64,
    /// Amount the corpus actually supplied
    pub withdrawal: f64,
    pub sources: BucketBalances,
    pub capped: bool,
}

/// Full result of one projection path
#[derive(Debug, Clone, Serialize)]
pub struct ProjectionResult {
    pub start_year: i32,
    pub retirement_year: i32,
    pub years: Vec<ProjectionYear>,
    pub withdrawals: Vec<WithdrawalYear>,
    pub first_shortfall_year: Option<i32>,
}

impl ProjectionResult {
    pub fn new(start_year: i32, retirement_year: i32) -> Self {
        Self {
            start_year,
            retirement_year,
            years: Vec::new(),
            withdrawals: Vec::new(),
            first_shortfall_year: None,
        }
    }

    pub fn add_year(&mut self, row: ProjectionYear) {
        if row.shortfall && self.first_shortfall_year.is_none() {
            self.first_shortfall_year = Some(row.year);
        }
        self.years.push(row);
    }

    pub fn has_shortfall(&self) -> bool {
        self.first_shortfall_year.is_some()
    }

    /// Closing corpus per year
    pub fn trajectory(&self) -> Vec<f64> {
        self.years.iter().map(|y| y.closing_total).collect()
    }

    pub fn terminal_corpus(&self) -> f64 {
        self.years.last().map(|y| y.closing_total).unwrap_or(0.0)
    }

    /// Corpus at the start of the retirement year, if projected that far
    pub fn retirement_corpus(&self) -> Option<f64> {
        self.years
            .iter()
            .find(|y| y.year == self.retirement_year)
            .map(|y| y.opening_total)
    }

    pub fn summary(&self) -> ProjectionSummary {
        ProjectionSummary {
            total_years: self.years.len() as u32,
            total_contributions: self.years.iter().map(|y| y.contributions).sum(),
            total_payouts: self.years.iter().map(|y| y.payouts).sum(),
            total_goal_withdrawals: self.years.iter().map(|y| y.goal_withdrawals).sum(),
            total_retirement_withdrawals: self.years.iter().map(|y| y.retirement_withdrawal).sum(),
            total_growth: self.years.iter().map(|y| y.growth).sum(),
            retirement_corpus: self.retirement_corpus(),
            terminal_corpus: self.terminal_corpus(),
            first_shortfall_year: self.first_shortfall_year,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectionSummary {
    pub total_years: u32,
    pub total_contributions: f64,
    pub total_payouts: f64,
    pub total_goal_withdrawals: f64,
    pub total_retirement_withdrawals: f64,
    pub total_growth: f64,
    pub retirement_corpus: Option<f64>,
    pub terminal_corpus: f64,
    pub first_shortfall_year: Option<i32>,
}
