//! Financial record structures supplied by the data layer

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::insurance::InsurancePolicy;

/// Asset bucket a holding belongs to
///
/// Each bucket carries its own return behavior. The set is closed: any
/// holding the data layer cannot classify lands in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetBucket {
    EquityMf,
    DebtMf,
    #[serde(rename = "FD")]
    FixedDeposit,
    #[serde(rename = "RD")]
    RecurringDeposit,
    Ppf,
    Epf,
    Nps,
    RealEstate,
    Gold,
    Crypto,
    Cash,
    Other,
}

impl AssetBucket {
    pub const COUNT: usize = 12;

    /// All buckets, in index order
    pub const ALL: [AssetBucket; AssetBucket::COUNT] = [
        AssetBucket::EquityMf,
        AssetBucket::DebtMf,
        AssetBucket::FixedDeposit,
        AssetBucket::RecurringDeposit,
        AssetBucket::Ppf,
        AssetBucket::Epf,
        AssetBucket::Nps,
        AssetBucket::RealEstate,
        AssetBucket::Gold,
        AssetBucket::Crypto,
        AssetBucket::Cash,
        AssetBucket::Other,
    ];

    /// Order in which buckets are liquidated to fund withdrawals
    pub const WITHDRAWAL_ORDER: [AssetBucket; AssetBucket::COUNT] = [
        AssetBucket::Cash,
        AssetBucket::FixedDeposit,
        AssetBucket::RecurringDeposit,
        AssetBucket::DebtMf,
        AssetBucket::EquityMf,
        AssetBucket::Ppf,
        AssetBucket::Epf,
        AssetBucket::Nps,
        AssetBucket::Gold,
        AssetBucket::Crypto,
        AssetBucket::RealEstate,
        AssetBucket::Other,
    ];

    /// Stable index into per-bucket arrays
    pub fn index(self) -> usize {
        self as usize
    }

    /// Annual return (%) used when neither the scenario nor the holdings give one
    pub fn default_return_pct(self) -> f64 {
        match self {
            AssetBucket::EquityMf => 12.0,
            AssetBucket::DebtMf => 7.0,
            AssetBucket::FixedDeposit => 7.0,
            AssetBucket::RecurringDeposit => 6.5,
            AssetBucket::Ppf => 7.1,
            AssetBucket::Epf => 8.25,
            AssetBucket::Nps => 10.0,
            AssetBucket::RealEstate => 8.0,
            AssetBucket::Gold => 8.0,
            AssetBucket::Crypto => 15.0,
            AssetBucket::Cash => 3.5,
            AssetBucket::Other => 7.0,
        }
    }

    /// Standard deviation (percentage points) of the annual return noise
    pub fn volatility_pct(self) -> f64 {
        match self {
            AssetBucket::EquityMf => 18.0,
            AssetBucket::DebtMf => 4.0,
            AssetBucket::FixedDeposit | AssetBucket::RecurringDeposit => 0.5,
            AssetBucket::Ppf | AssetBucket::Epf => 0.3,
            AssetBucket::Nps => 10.0,
            AssetBucket::RealEstate => 8.0,
            AssetBucket::Gold => 15.0,
            AssetBucket::Crypto => 60.0,
            AssetBucket::Cash => 0.5,
            AssetBucket::Other => 6.0,
        }
    }

    /// Government-administered or contractually fixed instruments
    pub fn is_rate_stable(self) -> bool {
        matches!(
            self,
            AssetBucket::Ppf
                | AssetBucket::Epf
                | AssetBucket::FixedDeposit
                | AssetBucket::RecurringDeposit
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetBucket::EquityMf => "EQUITY_MF",
            AssetBucket::DebtMf => "DEBT_MF",
            AssetBucket::FixedDeposit => "FD",
            AssetBucket::RecurringDeposit => "RD",
            AssetBucket::Ppf => "PPF",
            AssetBucket::Epf => "EPF",
            AssetBucket::Nps => "NPS",
            AssetBucket::RealEstate => "REAL_ESTATE",
            AssetBucket::Gold => "GOLD",
            AssetBucket::Crypto => "CRYPTO",
            AssetBucket::Cash => "CASH",
            AssetBucket::Other => "OTHER",
        }
    }
}

impl fmt::Display for AssetBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring source of income
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeStream {
    /// Source label (salary, rent, business, ...)
    pub source: String,

    /// Monthly amount in today's value
    pub monthly_amount: f64,

    /// Annual increment (%)
    #[serde(default)]
    pub annual_increment_pct: f64,

    #[serde(default = "default_true")]
    pub active: bool,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

impl IncomeStream {
    pub fn new(source: impl Into<String>, monthly_amount: f64, annual_increment_pct: f64) -> Self {
        Self {
            source: source.into(),
            monthly_amount,
            annual_increment_pct,
            active: true,
            start_date: None,
        }
    }

    /// Monthly amount with the non-negativity invariant applied
    pub fn monthly(&self) -> f64 {
        self.monthly_amount.max(0.0)
    }

    /// Whether the stream pays anything in the given calendar year
    pub fn pays_in(&self, year: i32) -> bool {
        self.active && self.start_date.map_or(true, |d| d.year() <= year)
    }
}

/// A single investment holding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentHolding {
    pub name: String,

    pub bucket: AssetBucket,

    /// Market value today
    pub current_value: f64,

    /// Total amount invested so far
    #[serde(default)]
    pub invested_amount: f64,

    /// Monthly SIP amount
    #[serde(default)]
    pub monthly_sip: Option<f64>,

    /// Day of month the SIP debits (1-31)
    #[serde(default)]
    pub sip_day: Option<u32>,

    /// Yearly contribution (e.g. PPF deposit)
    #[serde(default)]
    pub yearly_contribution: Option<f64>,

    /// Expected annual return (%)
    #[serde(default)]
    pub expected_return_pct: Option<f64>,

    #[serde(default)]
    pub maturity_date: Option<NaiveDate>,

    /// Emergency-fund holdings are kept out of the retirement corpus
    #[serde(default)]
    pub emergency_fund: bool,
}

impl InvestmentHolding {
    pub fn new(name: impl Into<String>, bucket: AssetBucket, current_value: f64) -> Self {
        Self {
            name: name.into(),
            bucket,
            current_value,
            invested_amount: current_value,
            monthly_sip: None,
            sip_day: None,
            yearly_contribution: None,
            expected_return_pct: None,
            maturity_date: None,
            emergency_fund: false,
        }
    }

    pub fn with_sip(mut self, monthly: f64, day: u32) -> Self {
        self.monthly_sip = Some(monthly);
        self.sip_day = Some(day);
        self
    }

    pub fn with_return(mut self, pct: f64) -> Self {
        self.expected_return_pct = Some(pct);
        self
    }

    /// Counts towards the retirement corpus
    pub fn in_corpus(&self) -> bool {
        !self.emergency_fund
    }

    pub fn monthly_sip(&self) -> f64 {
        self.monthly_sip.unwrap_or(0.0).max(0.0)
    }

    pub fn yearly_contribution(&self) -> f64 {
        self.yearly_contribution.unwrap_or(0.0).max(0.0)
    }
}

/// Loan category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanType {
    Home,
    Car,
    Personal,
    Education,
    Gold,
    Other,
}

/// An outstanding loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    pub loan_type: LoanType,

    /// Original principal
    pub principal: f64,

    /// Outstanding principal today
    pub outstanding: f64,

    /// Monthly instalment
    pub emi: f64,

    /// Annual interest rate (%)
    pub annual_rate_pct: f64,

    pub total_months: u32,

    pub remaining_months: u32,

    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub moratorium_months: Option<u32>,
}

impl Loan {
    pub fn label(&self) -> String {
        format!("{:?} loan", self.loan_type)
    }

    /// Date repayment periods count from
    ///
    /// A loan disbursed after the as-of date pays its first EMI a month after
    /// disbursement. For a running loan `remaining_months` counts the EMIs
    /// still due after the as-of date, so the as-of month is treated as paid.
    pub fn repayment_anchor(&self, as_of: NaiveDate) -> NaiveDate {
        self.start_date.filter(|start| *start > as_of).unwrap_or(as_of)
    }

    /// Moratorium months still ahead of the loan at the as-of date
    pub fn moratorium_remaining(&self) -> u32 {
        let elapsed = self.total_months.saturating_sub(self.remaining_months);
        self.moratorium_months
            .unwrap_or(0)
            .saturating_sub(elapsed)
            .min(self.remaining_months)
    }
}

/// Relationship of a family member to the plan owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relationship {
    #[serde(rename = "SELF")]
    Owner,
    Spouse,
    Child,
    Parent,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyMember {
    pub name: String,
    pub relationship: Relationship,
    #[serde(default)]
    pub birth_year: Option<i32>,
    #[serde(default)]
    pub dependent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalPriority {
    High,
    Medium,
    Low,
}

impl Default for GoalPriority {
    fn default() -> Self {
        GoalPriority::Medium
    }
}

/// A one-time or recurring financial goal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub name: String,

    /// Target amount in today's value
    #[serde(default)]
    pub target_amount: Option<f64>,

    #[serde(default)]
    pub target_year: Option<i32>,

    #[serde(default)]
    pub priority: GoalPriority,

    #[serde(default)]
    pub recurring: Option<bool>,

    #[serde(default)]
    pub recurrence_interval_years: Option<u32>,

    /// Last year of recurrence (defaults to the retirement year)
    #[serde(default)]
    pub recurrence_end_year: Option<i32>,

    #[serde(default)]
    pub inflation_adjusted: bool,

    /// Overrides the scenario inflation rate (%)
    #[serde(default)]
    pub custom_inflation_rate: Option<f64>,
}

impl Goal {
    pub fn one_time(name: impl Into<String>, amount: f64, year: i32) -> Self {
        Self {
            name: name.into(),
            target_amount: Some(amount),
            target_year: Some(year),
            priority: GoalPriority::Medium,
            recurring: Some(false),
            recurrence_interval_years: None,
            recurrence_end_year: None,
            inflation_adjusted: false,
            custom_inflation_rate: None,
        }
    }

    pub fn recurring(
        name: impl Into<String>,
        amount: f64,
        first_year: i32,
        interval_years: u32,
        end_year: Option<i32>,
    ) -> Self {
        Self {
            recurring: Some(true),
            recurrence_interval_years: Some(interval_years),
            recurrence_end_year: end_year,
            inflation_adjusted: true,
            ..Self::one_time(name, amount, first_year)
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring.unwrap_or(false)
    }

    /// Recurrence interval with the one-year default applied
    pub fn interval(&self) -> u32 {
        self.recurrence_interval_years.filter(|&i| i > 0).unwrap_or(1)
    }
}

/// Immutable snapshot of one user's financial records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialRecordSet {
    #[serde(default)]
    pub income_streams: Vec<IncomeStream>,
    #[serde(default)]
    pub holdings: Vec<InvestmentHolding>,
    #[serde(default)]
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub insurance_policies: Vec<InsurancePolicy>,
    #[serde(default)]
    pub family_members: Vec<FamilyMember>,
    #[serde(default)]
    pub goals: Vec<Goal>,
}

impl FinancialRecordSet {
    /// Total monthly income of streams active in the given year
    pub fn monthly_income(&self, year: i32) -> f64 {
        self.income_streams
            .iter()
            .filter(|s| s.pays_in(year))
            .map(IncomeStream::monthly)
            .sum()
    }

    /// Holdings that make up the retirement corpus
    pub fn corpus_holdings(&self) -> impl Iterator<Item = &InvestmentHolding> {
        self.holdings.iter().filter(|h| h.in_corpus())
    }

    pub fn total_liabilities(&self) -> f64 {
        self.loans.iter().map(|l| l.outstanding.max(0.0)).sum()
    }

    pub fn dependents(&self) -> usize {
        self.family_members.iter().filter(|m| m.dependent).count()
    }
}

fn default_true() -> bool {
    true
}
