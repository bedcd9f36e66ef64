//! Dated cash flows for every projection year, computed once per run
//!
//! Everything here is independent of market returns, so a Monte Carlo run
//! builds the schedule once and replays it under each trial's rates.

use chrono::{Datelike, NaiveDate};

use crate::assumptions::{LumpSumFrequency, ScenarioAssumptions};
use crate::cashflows::{amortize, schedule_payouts, GoalExpander};
use crate::records::FinancialRecordSet;

use super::state::BucketBalances;

/// Cash flows falling in one calendar year
#[derive(Debug, Clone, Default)]
pub struct YearFlows {
    pub income: f64,
    pub contributions: BucketBalances,
    pub payouts: f64,
    pub loan_payments: f64,
    pub premiums: f64,
    pub goals: f64,
    pub events: Vec<String>,
}

/// Year-indexed cash flows from the start year through the final year
#[derive(Debug, Clone)]
pub struct ScheduledFlows {
    start_year: i32,
    retirement_year: i32,
    years: Vec<YearFlows>,
}

impl ScheduledFlows {
    /// Materialize all flows for the record set under the scenario
    ///
    /// `as_of` prorates the first year: only months from the as-of month on
    /// count, and a SIP debiting earlier in the as-of month is skipped.
    pub fn build(records: &FinancialRecordSet, scenario: &ScenarioAssumptions, as_of: NaiveDate) -> Self {
        let start_year = scenario.start_year.unwrap_or(as_of.year());
        let retirement_year = scenario.retirement_year(start_year);
        let final_year = scenario.final_year(start_year);
        let span = (final_year - start_year + 1).max(0) as usize;

        let mut schedule = Self {
            start_year,
            retirement_year,
            years: vec![YearFlows::default(); span],
        };

        let first_month = if start_year == as_of.year() { as_of.month() } else { 1 };
        schedule.add_income(records, start_year, first_month);
        schedule.add_contributions(records, scenario, as_of, first_month);
        schedule.add_payouts(records, final_year);
        schedule.add_loans(records, as_of);
        schedule.add_premiums(records, as_of);
        schedule.add_goals(records, scenario, final_year);
        schedule.add_maturities(records);

        log::debug!(
            "scheduled flows for {}..={} (retirement {})",
            start_year,
            final_year,
            retirement_year
        );
        schedule
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn retirement_year(&self) -> i32 {
        self.retirement_year
    }

    pub fn final_year(&self) -> i32 {
        self.start_year + self.years.len() as i32 - 1
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn is_accumulation(&self, year: i32) -> bool {
        year < self.retirement_year
    }

    pub fn get(&self, year: i32) -> Option<&YearFlows> {
        let offset = usize::try_from(year - self.start_year).ok()?;
        self.years.get(offset)
    }

    fn slot(&mut self, year: i32) -> Option<&mut YearFlows> {
        let offset = usize::try_from(year - self.start_year).ok()?;
        self.years.get_mut(offset)
    }

    fn accumulation_years(&self) -> std::ops::Range<i32> {
        self.start_year..self.retirement_year.min(self.final_year() + 1)
    }

    fn add_income(&mut self, records: &FinancialRecordSet, start_year: i32, first_month: u32) {
        for year in self.accumulation_years() {
            let mut total = 0.0;
            for stream in records.income_streams.iter().filter(|s| s.pays_in(year)) {
                let mut months = if year == start_year { 13 - first_month } else { 12 };
                if let Some(start) = stream.start_date.filter(|d| d.year() == year) {
                    months = months.min(13 - start.month());
                }
                let raised = (1.0 + stream.annual_increment_pct / 100.0).powi(year - start_year);
                total += stream.monthly() * raised * months as f64;
            }
            if let Some(flows) = self.slot(year) {
                flows.income = total;
            }
        }
    }

    fn add_contributions(
        &mut self,
        records: &FinancialRecordSet,
        scenario: &ScenarioAssumptions,
        as_of: NaiveDate,
        first_month: u32,
    ) {
        let start_year = self.start_year;
        let effective_year = scenario.effective_year(start_year);
        let step_up = scenario.sip_step_up_pct / 100.0;

        for year in self.accumulation_years() {
            let step_factor = (1.0 + step_up).powi((year - effective_year).max(0));
            let mut contributions = BucketBalances::new();

            for holding in records.corpus_holdings() {
                let sip = holding.monthly_sip();
                if sip > 0.0 {
                    let instalments = if year == start_year && year == as_of.year() {
                        let due_this_month = holding.sip_day.map_or(true, |day| day >= as_of.day());
                        12 - first_month + u32::from(due_this_month)
                    } else {
                        12
                    };
                    contributions.add(holding.bucket, sip * step_factor * instalments as f64);
                }
                contributions.add(holding.bucket, holding.yearly_contribution());
            }

            if let Some(plan) = scenario.lump_sum.as_ref().filter(|p| p.amount > 0.0) {
                let amount = match plan.frequency {
                    LumpSumFrequency::OneTime if year == effective_year => plan.amount,
                    LumpSumFrequency::OneTime => 0.0,
                    _ if year >= effective_year => plan.amount * plan.frequency.per_year() as f64,
                    _ => 0.0,
                };
                contributions.add(plan.bucket, amount);
            }

            if let Some(flows) = self.slot(year) {
                flows.contributions = contributions;
            }
        }
    }

    fn add_payouts(&mut self, records: &FinancialRecordSet, final_year: i32) {
        for policy in &records.insurance_policies {
            for event in schedule_payouts(policy, self.start_year, final_year) {
                if let Some(flows) = self.slot(event.year) {
                    flows.payouts += event.amount;
                    flows.events.push(event.label);
                }
            }
        }
    }

    fn add_loans(&mut self, records: &FinancialRecordSet, as_of: NaiveDate) {
        for loan in &records.loans {
            let schedule = amortize(loan);
            let anchor = loan.repayment_anchor(as_of);
            for (year, paid) in schedule.payments_by_year(anchor) {
                if let Some(flows) = self.slot(year) {
                    flows.loan_payments += paid;
                }
            }
            if let Some(year) = schedule.closing_year(anchor) {
                if let Some(flows) = self.slot(year) {
                    flows.events.push(format!("{} closes", loan.label()));
                }
            }
        }
    }

    fn add_premiums(&mut self, records: &FinancialRecordSet, as_of: NaiveDate) {
        for year in self.start_year..=self.final_year() {
            let after_month = if year == as_of.year() { as_of.month() - 1 } else { 0 };
            let premiums: f64 = records
                .insurance_policies
                .iter()
                .map(|p| p.premium_in_year(year, after_month))
                .sum();
            if let Some(flows) = self.slot(year) {
                flows.premiums = premiums;
            }
        }
    }

    fn add_goals(&mut self, records: &FinancialRecordSet, scenario: &ScenarioAssumptions, final_year: i32) {
        let expander =
            GoalExpander::new(self.retirement_year, scenario.inflation_rate).with_horizon(final_year);
        for occurrence in expander.expand_all(&records.goals) {
            match self.slot(occurrence.year) {
                Some(flows) => {
                    flows.goals += occurrence.amount;
                    flows.events.push(occurrence.label);
                }
                None => log::debug!(
                    "goal {:?} in {} falls outside the projection",
                    occurrence.label,
                    occurrence.year
                ),
            }
        }
    }

    fn add_maturities(&mut self, records: &FinancialRecordSet) {
        for holding in records.corpus_holdings() {
            if let Some(date) = holding.maturity_date {
                if let Some(flows) = self.slot(date.year()) {
                    flows.events.push(format!("{} matures", holding.name));
                }
            }
        }
    }
}
