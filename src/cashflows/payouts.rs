//! Dated payout events for money-back, annuity and maturing policies

use chrono::Datelike;
use serde::Serialize;

use crate::records::{AnnuityParams, InsurancePolicy, PayoutRule, PolicyType};

/// What produced a payout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutKind {
    MoneyBack,
    Annuity,
    Maturity,
}

/// Money paid out by a policy in a calendar year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PayoutEvent {
    pub year: i32,
    pub amount: f64,
    pub kind: PayoutKind,
    pub label: String,
}

/// Amount of one money-back rule
///
/// A percentage of the sum assured wins over a fixed amount; a rule that
/// includes bonus adds the same percentage of the accrued bonus.
pub fn money_back_amount(rule: &PayoutRule, sum_assured: f64, bonus_accrued: f64) -> f64 {
    match (rule.percentage, rule.fixed_amount) {
        (Some(pct), _) => {
            let base = pct / 100.0 * sum_assured;
            if rule.includes_bonus {
                base + pct / 100.0 * bonus_accrued
            } else {
                base
            }
        }
        (None, Some(fixed)) => fixed,
        (None, None) => 0.0,
    }
}

/// Money-back payouts of a policy, in rule order
///
/// Needs a start date; without one the policy contributes nothing.
pub fn money_back_payouts(policy: &InsurancePolicy) -> Vec<PayoutEvent> {
    let Some(start) = policy.start_date else {
        if !policy.payout_rules.is_empty() {
            log::debug!("policy {:?} has payout rules but no start date", policy.name);
        }
        return Vec::new();
    };

    policy
        .payout_rules
        .iter()
        .map(|rule| PayoutEvent {
            year: start.year() + rule.policy_year as i32,
            amount: money_back_amount(rule, policy.sum_assured, policy.bonus_accrued),
            kind: PayoutKind::MoneyBack,
            label: format!("{} money-back (year {})", policy.name, rule.policy_year),
        })
        .filter(|event| event.amount > 0.0)
        .collect()
}

/// Unbounded yearly annuity stream; bound it with `take_while`
#[derive(Debug, Clone)]
pub struct AnnuityStream {
    year: i32,
    start_year: i32,
    annual_amount: f64,
    growth: f64,
    label: String,
}

impl AnnuityStream {
    pub fn new(name: &str, params: &AnnuityParams) -> Self {
        Self {
            year: params.start_year,
            start_year: params.start_year,
            annual_amount: params.monthly_amount.max(0.0) * 12.0,
            growth: params.growth_rate_pct / 100.0,
            label: format!("{name} annuity"),
        }
    }

    /// Skip ahead so the first item is `year` (or the start year if later)
    pub fn starting_at(mut self, year: i32) -> Self {
        self.year = self.year.max(year);
        self
    }
}

impl Iterator for AnnuityStream {
    type Item = PayoutEvent;

    fn next(&mut self) -> Option<PayoutEvent> {
        let year = self.year;
        self.year += 1;
        let amount = self.annual_amount * (1.0 + self.growth).powi(year - self.start_year);
        Some(PayoutEvent {
            year,
            amount,
            kind: PayoutKind::Annuity,
            label: self.label.clone(),
        })
    }
}

/// Annuity stream of a policy, if it carries annuity parameters
pub fn annuity_payouts(policy: &InsurancePolicy) -> Option<AnnuityStream> {
    policy
        .annuity
        .as_ref()
        .map(|params| AnnuityStream::new(&policy.name, params))
}

/// Lump sum paid when an investment-linked policy matures
pub fn maturity_payout(policy: &InsurancePolicy) -> Option<PayoutEvent> {
    let maturity = policy.maturity_date?;
    let amount = match policy.policy_type {
        PolicyType::Endowment => policy.sum_assured + policy.bonus_accrued,
        PolicyType::MoneyBack => {
            let paid_share: f64 = policy.payout_rules.iter().filter_map(|r| r.percentage).sum();
            policy.bonus_accrued + policy.sum_assured * (1.0 - paid_share / 100.0).max(0.0)
        }
        PolicyType::Ulip => policy.fund_value.unwrap_or(0.0),
        PolicyType::TermLife
        | PolicyType::Health
        | PolicyType::Annuity
        | PolicyType::Vehicle
        | PolicyType::Other => return None,
    };

    (amount > 0.0).then(|| PayoutEvent {
        year: maturity.year(),
        amount,
        kind: PayoutKind::Maturity,
        label: format!("{} maturity", policy.name),
    })
}

/// Every payout of a policy from `from_year` through `to_year`, by year
pub fn schedule_payouts(policy: &InsurancePolicy, from_year: i32, to_year: i32) -> Vec<PayoutEvent> {
    let in_window = |e: &PayoutEvent| (from_year..=to_year).contains(&e.year);

    let mut events: Vec<PayoutEvent> = money_back_payouts(policy)
        .into_iter()
        .filter(in_window)
        .collect();

    if let Some(stream) = annuity_payouts(policy) {
        events.extend(stream.starting_at(from_year).take_while(|e| e.year <= to_year));
    }

    if let Some(event) = maturity_payout(policy).filter(in_window) {
        events.push(event);
    }

    events.sort_by_key(|e| e.year);
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::PolicyType;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn money_back_policy() -> InsurancePolicy {
        let mut policy = InsurancePolicy::new("Jeevan", PolicyType::MoneyBack, 1_000_000.0);
        policy.start_date = NaiveDate::from_ymd_opt(2020, 6, 1);
        policy.maturity_date = NaiveDate::from_ymd_opt(2040, 6, 1);
        policy.bonus_accrued = 200_000.0;
        policy.payout_rules = vec![
            PayoutRule { policy_year: 5, percentage: Some(20.0), fixed_amount: None, includes_bonus: false },
            PayoutRule { policy_year: 10, percentage: Some(30.0), fixed_amount: None, includes_bonus: true },
            PayoutRule { policy_year: 15, percentage: None, fixed_amount: Some(75_000.0), includes_bonus: true },
        ];
        policy
    }

    #[test]
    fn test_percentage_of_sum_assured() {
        let rule = PayoutRule { policy_year: 5, percentage: Some(20.0), fixed_amount: None, includes_bonus: false };
        assert_eq!(money_back_amount(&rule, 1_000_000.0, 0.0), 200_000.0);
    }

    #[test]
    fn test_percentage_with_bonus() {
        let rule = PayoutRule { policy_year: 10, percentage: Some(30.0), fixed_amount: None, includes_bonus: true };
        assert_eq!(money_back_amount(&rule, 1_000_000.0, 200_000.0), 360_000.0);
    }

    #[test]
    fn test_percentage_takes_precedence_over_fixed() {
        let rule = PayoutRule { policy_year: 5, percentage: Some(10.0), fixed_amount: Some(1.0), includes_bonus: false };
        assert_eq!(money_back_amount(&rule, 500_000.0, 0.0), 50_000.0);
    }

    #[test]
    fn test_money_back_years_from_start_date() {
        let events = money_back_payouts(&money_back_policy());
        let years: Vec<i32> = events.iter().map(|e| e.year).collect();
        assert_eq!(years, vec![2025, 2030, 2035]);
        assert_eq!(events[2].amount, 75_000.0);
    }

    #[test]
    fn test_missing_start_date_yields_nothing() {
        let mut policy = money_back_policy();
        policy.start_date = None;
        assert!(money_back_payouts(&policy).is_empty());
    }

    #[test]
    fn test_annuity_compounds_yearly() {
        let mut policy = InsurancePolicy::new("Pension plan", PolicyType::Annuity, 0.0);
        policy.annuity = Some(AnnuityParams { start_year: 2050, monthly_amount: 10_000.0, growth_rate_pct: 3.0 });

        let events: Vec<PayoutEvent> = annuity_payouts(&policy).unwrap().take(3).collect();
        assert_eq!(events[0].year, 2050);
        assert_eq!(events[0].amount, 120_000.0);
        assert_relative_eq!(events[2].amount, 120_000.0 * 1.03_f64.powi(2), epsilon = 1e-6);
    }

    #[test]
    fn test_annuity_bounded_by_window() {
        let mut policy = InsurancePolicy::new("Pension plan", PolicyType::Annuity, 0.0);
        policy.annuity = Some(AnnuityParams { start_year: 2050, monthly_amount: 10_000.0, growth_rate_pct: 0.0 });

        let events = schedule_payouts(&policy, 2026, 2054);
        assert_eq!(events.len(), 5);
        assert_eq!(events.last().unwrap().year, 2054);
    }

    #[test]
    fn test_money_back_maturity_pays_remaining_share() {
        let event = maturity_payout(&money_back_policy()).unwrap();
        assert_eq!(event.year, 2040);
        // 50% paid by percentage rules, remaining 50% plus bonus
        assert_relative_eq!(event.amount, 700_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_endowment_and_ulip_maturity() {
        let mut endowment = InsurancePolicy::new("Endowment", PolicyType::Endowment, 500_000.0);
        endowment.bonus_accrued = 120_000.0;
        endowment.maturity_date = NaiveDate::from_ymd_opt(2035, 1, 1);
        assert_eq!(maturity_payout(&endowment).unwrap().amount, 620_000.0);

        let mut ulip = InsurancePolicy::new("ULIP", PolicyType::Ulip, 1_000_000.0);
        ulip.fund_value = Some(340_000.0);
        ulip.maturity_date = NaiveDate::from_ymd_opt(2031, 1, 1);
        assert_eq!(maturity_payout(&ulip).unwrap().amount, 340_000.0);

        let mut term = InsurancePolicy::new("Term", PolicyType::TermLife, 10_000_000.0);
        term.maturity_date = NaiveDate::from_ymd_opt(2060, 1, 1);
        assert!(maturity_payout(&term).is_none());
    }

    #[test]
    fn test_schedule_window_filters_past_payouts() {
        let events = schedule_payouts(&money_back_policy(), 2026, 2045);
        let kinds: Vec<PayoutKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![PayoutKind::MoneyBack, PayoutKind::MoneyBack, PayoutKind::Maturity]);
    }
}
