//! Insurance policy records and legacy payout normalization
//!
//! Money-back payouts reach the engine in two shapes: a structured list of
//! payout rules, or the legacy flat percentage/amount with a comma-separated
//! list of policy years. `InsurancePolicyRecord` is the wire shape that
//! accepts both; converting it into `InsurancePolicy` is the only place the
//! legacy form is understood.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Insurance policy category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    TermLife,
    Health,
    Ulip,
    Endowment,
    MoneyBack,
    Annuity,
    Vehicle,
    Other,
}

impl PolicyType {
    /// Policies with an investment component that returns money to the holder
    pub fn has_maturity_benefit(&self) -> bool {
        matches!(self, PolicyType::Ulip | PolicyType::Endowment | PolicyType::MoneyBack)
    }
}

/// How often premiums are paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PremiumFrequency {
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
    Single,
}

impl PremiumFrequency {
    /// Months between instalments (0 for a single premium)
    pub fn months_between(&self) -> u32 {
        match self {
            PremiumFrequency::Monthly => 1,
            PremiumFrequency::Quarterly => 3,
            PremiumFrequency::HalfYearly => 6,
            PremiumFrequency::Yearly => 12,
            PremiumFrequency::Single => 0,
        }
    }
}

/// Premium amount and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumSchedule {
    /// Amount per instalment
    pub amount: f64,

    pub frequency: PremiumFrequency,

    /// Month (1-12) the annual renewal falls in; defaults to the start month
    #[serde(default)]
    pub renewal_month: Option<u32>,

    /// Last calendar year a premium is due
    #[serde(default)]
    pub paying_until_year: Option<i32>,
}

impl PremiumSchedule {
    /// Premium paid in a calendar year, counting only months after `after_month`
    ///
    /// `after_month` is 0 for a full year. `start` is the policy start date,
    /// which anchors single premiums and the default renewal month. No
    /// instalment falls before the start month or on or after the maturity
    /// month.
    pub fn outflow_in_year(
        &self,
        year: i32,
        after_month: u32,
        start: Option<NaiveDate>,
        maturity: Option<NaiveDate>,
    ) -> f64 {
        if self.amount <= 0.0 {
            return 0.0;
        }
        if start.is_some_and(|s| s.year() > year) {
            return 0.0;
        }
        let last_year = match (self.paying_until_year, maturity.map(|m| m.year())) {
            (Some(p), Some(m)) => Some(p.min(m)),
            (p, m) => p.or(m),
        };
        if last_year.is_some_and(|last| year > last) {
            return 0.0;
        }

        let anchor = self
            .renewal_month
            .filter(|m| (1..=12).contains(m))
            .or(start.map(|s| s.month()))
            .unwrap_or(1);

        let step = self.frequency.months_between();
        if step == 0 {
            // Single premium: only in the start year
            let paid_now = start.is_some_and(|s| s.year() == year && s.month() > after_month);
            return if paid_now { self.amount } else { 0.0 };
        }

        let after_month = match start {
            Some(s) if s.year() == year => after_month.max(s.month() - 1),
            _ => after_month,
        };
        let before_month = match maturity {
            Some(m) if m.year() == year => m.month(),
            _ => 13,
        };

        // Instalment months are anchor, anchor+step, ... wrapped into 1..=12
        let instalments = (1..=12u32)
            .filter(|&m| m > after_month && m < before_month && (m + 12 - anchor) % step == 0)
            .count();
        self.amount * instalments as f64
    }
}

/// One money-back payout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRule {
    /// Policy year the payout falls due (years after the start year)
    pub policy_year: u32,

    /// Share of the sum assured (%); takes precedence over `fixed_amount`
    #[serde(default)]
    pub percentage: Option<f64>,

    #[serde(default)]
    pub fixed_amount: Option<f64>,

    /// Also pay the same percentage of accrued bonus
    #[serde(default)]
    pub includes_bonus: bool,
}

/// Annuity payout parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnuityParams {
    /// Calendar year the annuity starts paying
    pub start_year: i32,

    pub monthly_amount: f64,

    /// Annual growth of the annuity (%)
    #[serde(default)]
    pub growth_rate_pct: f64,
}

/// Canonical insurance policy, as the engine consumes it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "InsurancePolicyRecord")]
pub struct InsurancePolicy {
    pub name: String,
    pub policy_type: PolicyType,
    pub sum_assured: f64,
    pub bonus_accrued: f64,
    pub premium: Option<PremiumSchedule>,
    pub start_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub payout_rules: Vec<PayoutRule>,
    pub annuity: Option<AnnuityParams>,
    /// Fund value for investment-linked policies
    pub fund_value: Option<f64>,
}

impl InsurancePolicy {
    pub fn new(name: impl Into<String>, policy_type: PolicyType, sum_assured: f64) -> Self {
        Self {
            name: name.into(),
            policy_type,
            sum_assured,
            bonus_accrued: 0.0,
            premium: None,
            start_date: None,
            maturity_date: None,
            payout_rules: Vec::new(),
            annuity: None,
            fund_value: None,
        }
    }

    pub fn premium_in_year(&self, year: i32, after_month: u32) -> f64 {
        self.premium.as_ref().map_or(0.0, |p| {
            p.outflow_in_year(year, after_month, self.start_date, self.maturity_date)
        })
    }
}

/// Wire shape of an insurance policy, including the legacy payout fields
#[derive(Debug, Clone, Deserialize)]
pub struct InsurancePolicyRecord {
    pub name: String,
    pub policy_type: PolicyType,
    #[serde(default)]
    pub sum_assured: f64,
    #[serde(default)]
    pub bonus_accrued: f64,
    #[serde(default)]
    pub premium: Option<PremiumSchedule>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub maturity_date: Option<NaiveDate>,
    #[serde(default)]
    pub payout_rules: Vec<PayoutRule>,
    #[serde(default)]
    pub annuity: Option<AnnuityParams>,
    #[serde(default)]
    pub fund_value: Option<f64>,

    #[serde(default)]
    pub money_back_percentage: Option<f64>,
    #[serde(default)]
    pub money_back_amount: Option<f64>,
    /// e.g. "5,10,15"
    #[serde(default)]
    pub money_back_years: Option<String>,
}

impl From<InsurancePolicyRecord> for InsurancePolicy {
    fn from(record: InsurancePolicyRecord) -> Self {
        let payout_rules = if !record.payout_rules.is_empty() {
            record.payout_rules
        } else {
            legacy_payout_rules(
                record.money_back_percentage,
                record.money_back_amount,
                record.money_back_years.as_deref(),
            )
        };

        Self {
            name: record.name,
            policy_type: record.policy_type,
            sum_assured: record.sum_assured,
            bonus_accrued: record.bonus_accrued,
            premium: record.premium,
            start_date: record.start_date,
            maturity_date: record.maturity_date,
            payout_rules,
            annuity: record.annuity,
            fund_value: record.fund_value,
        }
    }
}

/// Build payout rules from the legacy flat fields
pub fn legacy_payout_rules(
    percentage: Option<f64>,
    fixed_amount: Option<f64>,
    years: Option<&str>,
) -> Vec<PayoutRule> {
    let Some(years) = years else {
        return Vec::new();
    };
    if percentage.is_none() && fixed_amount.is_none() {
        return Vec::new();
    }

    parse_policy_years(years)
        .into_iter()
        .map(|policy_year| PayoutRule {
            policy_year,
            percentage,
            fixed_amount,
            includes_bonus: false,
        })
        .collect()
}

/// Parse a comma-separated list of policy years, skipping malformed tokens
pub fn parse_policy_years(raw: &str) -> Vec<u32> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| match token.parse::<u32>() {
            Ok(year) => Some(year),
            Err(_) => {
                log::warn!("skipping malformed money-back year {token:?}");
                None
            }
        })
        .collect()
}
