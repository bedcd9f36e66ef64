//! Single-path, year-by-year corpus projection
//!
//! Each year runs in a fixed order:
//! 1. opening balances
//! 2. contributions (accumulation only)
//! 3. insurance payouts reinvested
//! 4. loan EMIs and premiums, paid from income first and the corpus after
//! 5. living withdrawal (drawdown only)
//! 6. goals, paid from income left after obligations and the corpus after
//! 7. the savings share of any income still left goes to cash
//! 8. growth on what remains
//!
//! All draws go through `allocation::draw`. Anything the corpus cannot cover
//! flags the year as a shortfall and the projection carries on from zero.

use chrono::NaiveDate;

use crate::assumptions::{RateSource, ReturnSchedule, ScenarioAssumptions};
use crate::error::{EngineError, EngineResult};
use crate::records::{AssetBucket, FinancialRecordSet};

use super::allocation::draw;
use super::schedule::ScheduledFlows;
use super::state::BucketBalances;
use super::withdrawal::{annual_expense_need, WithdrawalPlanner};
use super::years::{Phase, ProjectionResult, ProjectionYear, WithdrawalYear};

/// Unmet amounts below this are rounding noise
const SHORTFALL_EPSILON: f64 = 1e-6;

/// Projects one record set under one scenario
///
/// Construction validates the scenario and precomputes every dated cash
/// flow, so the projector can be run repeatedly under different rate
/// sources.
#[derive(Debug, Clone)]
pub struct CorpusProjector<'a> {
    scenario: &'a ScenarioAssumptions,
    flows: ScheduledFlows,
    opening: BucketBalances,
    rates: ReturnSchedule<'a>,
    need_today: f64,
}

impl<'a> CorpusProjector<'a> {
    pub fn new(
        records: &FinancialRecordSet,
        scenario: &'a ScenarioAssumptions,
        as_of: NaiveDate,
    ) -> EngineResult<Self> {
        scenario.validate()?;

        let flows = ScheduledFlows::build(records, scenario, as_of);
        let start_year = flows.start_year();

        Ok(Self {
            scenario,
            opening: BucketBalances::from_holdings(records.corpus_holdings()),
            rates: ReturnSchedule::new(scenario, start_year, &records.holdings),
            need_today: annual_expense_need(records, scenario, start_year),
            flows,
        })
    }

    pub fn scenario(&self) -> &ScenarioAssumptions {
        self.scenario
    }

    pub fn flows(&self) -> &ScheduledFlows {
        &self.flows
    }

    /// Deterministic return schedule for the scenario
    pub fn rates(&self) -> &ReturnSchedule<'a> {
        &self.rates
    }

    pub fn opening_balances(&self) -> &BucketBalances {
        &self.opening
    }

    /// Years from the start year through life expectancy
    pub fn full_horizon(&self) -> u32 {
        self.flows.len() as u32
    }

    /// Project under the deterministic schedule, for `years` or the full life
    pub fn project(&self, years: Option<u32>) -> EngineResult<ProjectionResult> {
        let result = self.run(&self.rates, years)?;
        log::debug!(
            "projected {} years from {}, first shortfall {:?}",
            result.years.len(),
            result.start_year,
            result.first_shortfall_year
        );
        Ok(result)
    }

    /// Project under any rate source
    pub fn run<R: RateSource + ?Sized>(&self, rates: &R, years: Option<u32>) -> EngineResult<ProjectionResult> {
        self.run_path(rates, years, true)
    }

    /// Same path as `run` with empty per-year event labels
    ///
    /// Simulation trials only read balances and shortfalls, so they skip
    /// copying the labels for every year.
    pub fn run_without_events<R: RateSource + ?Sized>(
        &self,
        rates: &R,
        years: Option<u32>,
    ) -> EngineResult<ProjectionResult> {
        self.run_path(rates, years, false)
    }

    fn run_path<R: RateSource + ?Sized>(
        &self,
        rates: &R,
        years: Option<u32>,
        with_events: bool,
    ) -> EngineResult<ProjectionResult> {
        let start_year = self.flows.start_year();
        let span = years.map_or(self.flows.len(), |n| (n as usize).min(self.flows.len()));
        let savings_share = (self.scenario.income_savings_pct / 100.0).clamp(0.0, 1.0);

        let mut result = ProjectionResult::new(start_year, self.flows.retirement_year());
        let mut planner = WithdrawalPlanner::new(self.scenario, self.need_today, start_year);
        let mut balances = self.opening;

        for offset in 0..span {
            let year = start_year + offset as i32;
            let Some(flows) = self.flows.get(year) else {
                break;
            };
            let age = self.scenario.current_age + offset as u32;
            let accumulating = self.flows.is_accumulation(year);
            let opening = balances;
            let mut unmet = 0.0;

            let mut contributions = 0.0;
            if accumulating {
                balances.add_all(&flows.contributions);
                contributions += flows.contributions.total();
            }

            balances.add(self.scenario.reinvestment_bucket, flows.payouts);

            // Fixed obligations come out of income before touching the corpus
            let income = if accumulating { flows.income } else { 0.0 };
            let obligations = flows.loan_payments + flows.premiums;
            let obligations_from_income = obligations.min(income);
            let mut spare_income = income - obligations_from_income;
            unmet += draw(&mut balances, obligations - obligations_from_income).unmet;

            let mut retirement_withdrawal = 0.0;
            if !accumulating {
                let target = planner.target(year, opening.total());
                let allocation = draw(&mut balances, target);
                unmet += allocation.unmet;
                retirement_withdrawal = allocation.drawn;
                result.withdrawals.push(WithdrawalYear {
                    year,
                    age,
                    target,
                    withdrawal: allocation.drawn,
                    capped: allocation.is_capped(),
                    sources: allocation.sources,
                });
            }

            let goals_from_income = flows.goals.min(spare_income);
            spare_income -= goals_from_income;
            let goal_allocation = draw(&mut balances, flows.goals - goals_from_income);
            unmet += goal_allocation.unmet;

            let saved = spare_income * savings_share;
            balances.add(AssetBucket::Cash, saved);
            contributions += saved;

            let growth = balances.grow(|bucket| rates.annual_rate(bucket, year));
            if !balances.is_finite() {
                return Err(EngineError::Computation(format!(
                    "corpus is not finite in {year}"
                )));
            }

            let shortfall = unmet > SHORTFALL_EPSILON;
            result.add_year(ProjectionYear {
                year,
                age,
                phase: if accumulating { Phase::Accumulation } else { Phase::Drawdown },
                opening_total: opening.total(),
                opening,
                income,
                contributions,
                payouts: flows.payouts,
                loan_payments: flows.loan_payments,
                premiums: flows.premiums,
                obligations_from_income,
                goals_from_income,
                goal_withdrawals: goal_allocation.drawn,
                retirement_withdrawal,
                growth,
                closing_total: balances.total(),
                closing: balances,
                shortfall,
                shortfall_amount: if shortfall { unmet } else { 0.0 },
                events: if with_events { flows.events.clone() } else { Vec::new() },
            });
        }

        Ok(result)
    }
}
