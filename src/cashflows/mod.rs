//! Materialize dated cash flows from goals, loans and insurance policies

pub mod amortization;
pub mod goals;
pub mod payouts;

pub use amortization::{amortize, AmortizationRow, AmortizationSchedule};
pub use goals::{GoalExpander, GoalOccurrence};
pub use payouts::{
    annuity_payouts, maturity_payout, money_back_amount, money_back_payouts, schedule_payouts,
    AnnuityStream, PayoutEvent, PayoutKind,
};
