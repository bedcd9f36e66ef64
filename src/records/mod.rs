//! Financial record snapshot and loaders

mod data;
mod insurance;
pub mod loader;

pub use data::{
    AssetBucket, FamilyMember, FinancialRecordSet, Goal, GoalPriority, IncomeStream,
    InvestmentHolding, Loan, LoanType, Relationship,
};
pub use insurance::{
    legacy_payout_rules, parse_policy_years, AnnuityParams, InsurancePolicy,
    InsurancePolicyRecord, PayoutRule, PolicyType, PremiumFrequency, PremiumSchedule,
};
pub use loader::{load_holdings_csv, load_record_set};
