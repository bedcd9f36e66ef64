//! Entry point that assembles inputs, drives the engine and shapes outputs
//!
//! Callers hand over the owner's identity and record snapshot with every
//! request; the orchestrator itself holds only a default scenario and the
//! as-of date.

use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use serde::Serialize;

use crate::assumptions::{ReturnSchedule, ScenarioAssumptions, WithdrawalStrategy};
use crate::cashflows::{amortize, maturity_payout, AmortizationSchedule};
use crate::error::EngineResult;
use crate::projection::{
    BucketBalances, CorpusProjector, ProjectionResult, ProjectionSummary, WithdrawalYear,
};
use crate::records::{FinancialRecordSet, LoanType};
use crate::simulation::{MonteCarloConfig, MonteCarloEngine, SimulationResult};

/// Default number of years in the projection matrix
pub const DEFAULT_MATRIX_YEARS: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct NetWorthReport {
    pub owner: String,
    pub as_of: NaiveDate,
    pub assets: BucketBalances,
    pub total_assets: f64,
    /// Part of `total_assets` set aside as emergency fund
    pub emergency_fund: f64,
    /// Fund value held in investment-linked policies
    pub insurance_fund_value: f64,
    pub total_liabilities: f64,
    pub net_worth: f64,
    pub monthly_income: f64,
    pub dependents: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectionMatrix {
    pub owner: String,
    pub summary: ProjectionSummary,
    #[serde(flatten)]
    pub projection: ProjectionResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloSummary {
    pub owner: String,
    /// Terminal corpus of the deterministic path over the same horizon
    pub deterministic_terminal: f64,
    #[serde(flatten)]
    pub simulation: SimulationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoanAmortization {
    pub label: String,
    pub loan_type: LoanType,
    pub outstanding: f64,
    pub closing_year: Option<i32>,
    #[serde(flatten)]
    pub schedule: AmortizationSchedule,
}

#[derive(Debug, Clone, Serialize)]
pub struct AmortizationReport {
    pub owner: String,
    pub loans: Vec<LoanAmortization>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaturityKind {
    Holding,
    Policy,
    Loan,
}

/// Capital unlocked before retirement
#[derive(Debug, Clone, Serialize)]
pub struct Maturity {
    pub kind: MaturityKind,
    pub name: String,
    pub year: i32,
    /// Value released: holding value at maturity, policy benefit, or the
    /// yearly EMI freed when a loan closes
    pub unlocked_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaturityReport {
    pub owner: String,
    pub retirement_year: i32,
    pub maturities: Vec<Maturity>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalPlan {
    pub owner: String,
    pub strategy: WithdrawalStrategy,
    pub retirement_year: i32,
    pub retirement_corpus: Option<f64>,
    /// First drawdown year the corpus could not fund in full
    pub depleted_year: Option<i32>,
    pub years: Vec<WithdrawalYear>,
}

/// One candidate retirement age in a sweep
#[derive(Debug, Clone, Serialize)]
pub struct AgeSweepPoint {
    pub retirement_age: u32,
    pub retirement_year: i32,
    pub retirement_corpus: Option<f64>,
    pub first_shortfall_year: Option<i32>,
    pub success_probability: f64,
    pub median_terminal: f64,
}

/// Drives projections for any owner under a default or overriding scenario
#[derive(Debug, Clone)]
pub struct ProjectionOrchestrator {
    default_scenario: ScenarioAssumptions,
    as_of: NaiveDate,
}

impl ProjectionOrchestrator {
    pub fn new(default_scenario: ScenarioAssumptions, as_of: NaiveDate) -> Self {
        Self {
            default_scenario,
            as_of,
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn default_scenario(&self) -> &ScenarioAssumptions {
        &self.default_scenario
    }

    fn scenario<'s>(&'s self, scenario: Option<&'s ScenarioAssumptions>) -> &'s ScenarioAssumptions {
        scenario.unwrap_or(&self.default_scenario)
    }

    fn start_year(&self, scenario: &ScenarioAssumptions) -> i32 {
        scenario.start_year.unwrap_or(self.as_of.year())
    }

    /// Current assets by bucket, liabilities and net worth
    ///
    /// Emergency-fund holdings count here even though the projection leaves
    /// them out of the corpus.
    pub fn net_worth(&self, owner: &str, records: &FinancialRecordSet) -> NetWorthReport {
        let assets = BucketBalances::from_holdings(&records.holdings);
        let emergency_fund = records
            .holdings
            .iter()
            .filter(|h| h.emergency_fund)
            .map(|h| h.current_value.max(0.0))
            .sum();
        let insurance_fund_value: f64 = records
            .insurance_policies
            .iter()
            .filter_map(|p| p.fund_value)
            .map(|v| v.max(0.0))
            .sum();
        let total_assets = assets.total();
        let total_liabilities = records.total_liabilities();

        NetWorthReport {
            owner: owner.to_string(),
            as_of: self.as_of,
            assets,
            total_assets,
            emergency_fund,
            insurance_fund_value,
            total_liabilities,
            net_worth: total_assets + insurance_fund_value - total_liabilities,
            monthly_income: records.monthly_income(self.as_of.year()),
            dependents: records.dependents(),
        }
    }

    /// Deterministic year-by-year matrix; `years` defaults to ten
    pub fn projection_matrix(
        &self,
        owner: &str,
        records: &FinancialRecordSet,
        scenario: Option<&ScenarioAssumptions>,
        years: Option<u32>,
    ) -> EngineResult<ProjectionMatrix> {
        let projector = CorpusProjector::new(records, self.scenario(scenario), self.as_of)?;
        let projection = projector.project(Some(years.unwrap_or(DEFAULT_MATRIX_YEARS)))?;
        Ok(ProjectionMatrix {
            owner: owner.to_string(),
            summary: projection.summary(),
            projection,
        })
    }

    pub fn monte_carlo(
        &self,
        owner: &str,
        records: &FinancialRecordSet,
        scenario: Option<&ScenarioAssumptions>,
        config: MonteCarloConfig,
    ) -> EngineResult<MonteCarloSummary> {
        let engine = MonteCarloEngine::new(config)?;
        let projector = CorpusProjector::new(records, self.scenario(scenario), self.as_of)?;
        let simulation = engine.run(&projector)?;
        let deterministic = projector.project(Some(simulation.horizon_years))?;

        Ok(MonteCarloSummary {
            owner: owner.to_string(),
            deterministic_terminal: deterministic.terminal_corpus(),
            simulation,
        })
    }

    pub fn amortization(&self, owner: &str, records: &FinancialRecordSet) -> AmortizationReport {
        let loans = records
            .loans
            .iter()
            .map(|loan| {
                let schedule = amortize(loan);
                LoanAmortization {
                    label: loan.label(),
                    loan_type: loan.loan_type,
                    outstanding: loan.outstanding,
                    closing_year: schedule.closing_year(loan.repayment_anchor(self.as_of)),
                    schedule,
                }
            })
            .collect();

        AmortizationReport {
            owner: owner.to_string(),
            loans,
        }
    }

    /// Holdings, policies and loans that mature between now and retirement
    pub fn maturities(
        &self,
        owner: &str,
        records: &FinancialRecordSet,
        scenario: Option<&ScenarioAssumptions>,
    ) -> EngineResult<MaturityReport> {
        let scenario = self.scenario(scenario);
        scenario.validate()?;
        let start_year = self.start_year(scenario);
        let retirement_year = scenario.retirement_year(start_year);
        let before_retirement = |year: i32| (start_year..retirement_year).contains(&year);
        let rates = ReturnSchedule::new(scenario, start_year, &records.holdings);

        let mut maturities = Vec::new();

        for holding in &records.holdings {
            let Some(year) = holding.maturity_date.map(|d| d.year()).filter(|y| before_retirement(*y)) else {
                continue;
            };
            let value = (start_year..year).fold(holding.current_value.max(0.0), |value, y| {
                value * (1.0 + rates.resolve(holding.bucket, y).max(-100.0) / 100.0)
            });
            maturities.push(Maturity {
                kind: MaturityKind::Holding,
                name: holding.name.clone(),
                year,
                unlocked_value: value,
            });
        }

        for policy in &records.insurance_policies {
            if let Some(event) = maturity_payout(policy).filter(|e| before_retirement(e.year)) {
                maturities.push(Maturity {
                    kind: MaturityKind::Policy,
                    name: policy.name.clone(),
                    year: event.year,
                    unlocked_value: event.amount,
                });
            }
        }

        for loan in &records.loans {
            let closing_year = amortize(loan).closing_year(loan.repayment_anchor(self.as_of));
            if let Some(year) = closing_year.filter(|y| before_retirement(*y)) {
                maturities.push(Maturity {
                    kind: MaturityKind::Loan,
                    name: loan.label(),
                    year,
                    unlocked_value: loan.emi * 12.0,
                });
            }
        }

        maturities.sort_by_key(|m| m.year);
        Ok(MaturityReport {
            owner: owner.to_string(),
            retirement_year,
            maturities,
        })
    }

    pub fn withdrawal_plan(
        &self,
        owner: &str,
        records: &FinancialRecordSet,
        scenario: Option<&ScenarioAssumptions>,
    ) -> EngineResult<WithdrawalPlan> {
        let scenario = self.scenario(scenario);
        let projection = CorpusProjector::new(records, scenario, self.as_of)?.project(None)?;

        Ok(WithdrawalPlan {
            owner: owner.to_string(),
            strategy: scenario.withdrawal_strategy,
            retirement_year: projection.retirement_year,
            retirement_corpus: projection.retirement_corpus(),
            depleted_year: projection.withdrawals.iter().find(|w| w.capped).map(|w| w.year),
            years: projection.withdrawals,
        })
    }

    /// Success probability across candidate retirement ages
    ///
    /// Ages that do not fall strictly between the current age and life
    /// expectancy are skipped. Every age runs a full-life simulation with the
    /// same trials and seed.
    pub fn retirement_age_sweep(
        &self,
        records: &FinancialRecordSet,
        scenario: Option<&ScenarioAssumptions>,
        ages: RangeInclusive<u32>,
        trials: u32,
        seed: u64,
    ) -> EngineResult<Vec<AgeSweepPoint>> {
        let base = self.scenario(scenario);
        let engine = MonteCarloEngine::new(MonteCarloConfig::full_life(trials, seed))?;

        let candidates: Vec<u32> = ages
            .filter(|&age| age > base.current_age && age < base.life_expectancy)
            .collect();

        candidates
            .par_iter()
            .map(|&retirement_age| -> EngineResult<AgeSweepPoint> {
                let scenario = ScenarioAssumptions {
                    retirement_age,
                    ..base.clone()
                };
                let projector = CorpusProjector::new(records, &scenario, self.as_of)?;
                let deterministic = projector.project(None)?;
                let simulation = engine.run(&projector)?;

                Ok(AgeSweepPoint {
                    retirement_age,
                    retirement_year: deterministic.retirement_year,
                    retirement_corpus: deterministic.retirement_corpus(),
                    first_shortfall_year: deterministic.first_shortfall_year,
                    success_probability: simulation.success_probability,
                    median_terminal: simulation.terminal.p50,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{
        AssetBucket, FamilyMember, IncomeStream, InsurancePolicy, InvestmentHolding, Loan,
        PolicyType, Relationship,
    };

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn orchestrator() -> ProjectionOrchestrator {
        ProjectionOrchestrator::new(ScenarioAssumptions::with_ages(35, 60, 85), as_of())
    }

    fn records() -> FinancialRecordSet {
        let mut emergency = InvestmentHolding::new("Liquid fund", AssetBucket::DebtMf, 300_000.0);
        emergency.emergency_fund = true;

        let mut fd = InvestmentHolding::new("Bank FD", AssetBucket::FixedDeposit, 200_000.0);
        fd.maturity_date = NaiveDate::from_ymd_opt(2028, 6, 30);

        let mut ulip = InsurancePolicy::new("ULIP", PolicyType::Ulip, 1_000_000.0);
        ulip.fund_value = Some(250_000.0);
        ulip.maturity_date = NaiveDate::from_ymd_opt(2035, 3, 1);

        FinancialRecordSet {
            income_streams: vec![IncomeStream::new("Salary", 150_000.0, 6.0)],
            holdings: vec![
                InvestmentHolding::new("Index fund", AssetBucket::EquityMf, 1_500_000.0).with_sip(20_000.0, 1),
                emergency,
                fd,
            ],
            loans: vec![Loan {
                loan_type: LoanType::Car,
                principal: 800_000.0,
                outstanding: 240_000.0,
                emi: 20_000.0,
                annual_rate_pct: 0.0,
                total_months: 48,
                remaining_months: 12,
                start_date: None,
                moratorium_months: None,
            }],
            insurance_policies: vec![ulip],
            family_members: vec![
                FamilyMember { name: "A".into(), relationship: Relationship::Spouse, birth_year: Some(1992), dependent: false },
                FamilyMember { name: "B".into(), relationship: Relationship::Child, birth_year: Some(2020), dependent: true },
            ],
            goals: Vec::new(),
        }
    }

    #[test]
    fn test_net_worth_counts_emergency_fund_and_policy_value() {
        let report = orchestrator().net_worth("user-7", &records());

        assert_eq!(report.owner, "user-7");
        assert_eq!(report.total_assets, 2_000_000.0);
        assert_eq!(report.emergency_fund, 300_000.0);
        assert_eq!(report.insurance_fund_value, 250_000.0);
        assert_eq!(report.net_worth, 2_000_000.0 + 250_000.0 - 240_000.0);
        assert_eq!(report.dependents, 1);
    }

    #[test]
    fn test_matrix_defaults_to_ten_years() {
        let matrix = orchestrator().projection_matrix("user-7", &records(), None, None).unwrap();
        assert_eq!(matrix.projection.years.len(), 10);
        assert_eq!(matrix.summary.total_years, 10);
        // Emergency fund stays out of the corpus
        assert_eq!(matrix.projection.years[0].opening_total, 1_700_000.0);
    }

    #[test]
    fn test_scenario_override_replaces_default() {
        let scenario = ScenarioAssumptions::with_ages(35, 45, 85);
        let matrix = orchestrator()
            .projection_matrix("user-7", &records(), Some(&scenario), Some(15))
            .unwrap();
        assert_eq!(matrix.projection.retirement_year, 2036);
    }

    #[test]
    fn test_maturities_before_retirement() {
        let report = orchestrator().maturities("user-7", &records(), None).unwrap();
        let kinds: Vec<(MaturityKind, i32)> = report.maturities.iter().map(|m| (m.kind, m.year)).collect();

        assert_eq!(
            kinds,
            vec![(MaturityKind::Loan, 2027), (MaturityKind::Holding, 2028), (MaturityKind::Policy, 2035)]
        );
        let fd = &report.maturities[1];
        assert!((fd.unlocked_value - 200_000.0 * 1.07 * 1.07).abs() < 1e-6);
        assert_eq!(report.maturities[2].unlocked_value, 250_000.0);
    }

    #[test]
    fn test_withdrawal_plan_starts_at_retirement() {
        let plan = orchestrator().withdrawal_plan("user-7", &records(), None).unwrap();
        assert_eq!(plan.retirement_year, 2051);
        assert_eq!(plan.years.first().unwrap().year, 2051);
        assert_eq!(plan.years.len(), 26);
        assert!(plan.retirement_corpus.unwrap() > 0.0);
    }

    #[test]
    fn test_amortization_report_per_loan() {
        let report = orchestrator().amortization("user-7", &records());
        assert_eq!(report.loans.len(), 1);
        assert_eq!(report.loans[0].schedule.rows.len(), 12);
        assert_eq!(report.loans[0].closing_year, Some(2027));
    }

    #[test]
    fn test_monte_carlo_summary_carries_owner() {
        let config = MonteCarloConfig {
            trials: 50,
            ..MonteCarloConfig::default()
        };
        let summary = orchestrator().monte_carlo("user-7", &records(), None, config).unwrap();
        assert_eq!(summary.owner, "user-7");
        assert_eq!(summary.simulation.bands.len(), 10);
        assert!(summary.deterministic_terminal > 0.0);
    }

    #[test]
    fn test_age_sweep_skips_impossible_ages() {
        let points = orchestrator()
            .retirement_age_sweep(&records(), None, 30..=90, 20, 9)
            .unwrap();
        assert_eq!(points.first().unwrap().retirement_age, 36);
        assert_eq!(points.last().unwrap().retirement_age, 84);
        assert!(points.windows(2).all(|w| w[0].retirement_age < w[1].retirement_age));
        assert!(points.iter().all(|p| (0.0..=1.0).contains(&p.success_probability)));
    }
}
