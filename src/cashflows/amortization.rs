//! Reducing-balance amortization of an outstanding loan
//!
//! The stored EMI is trusted as-is. Whatever balance is left after the last
//! period (from rounding, a stale EMI, or capitalized moratorium interest) is
//! cleared on that period and reported as its `adjustment`.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use crate::records::Loan;

/// Balances below this are treated as fully repaid
const BALANCE_EPSILON: f64 = 1e-6;

/// One period of an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmortizationRow {
    /// Period number (1-indexed from the as-of date)
    pub period: u32,
    pub opening_balance: f64,
    pub interest_portion: f64,
    /// Negative while interest capitalizes during a moratorium
    pub principal_portion: f64,
    pub closing_balance: f64,
    /// Amount actually paid this period
    pub payment: f64,
    /// Correction applied on the last period to clear the residual
    pub adjustment: f64,
}

/// Full schedule for one loan
#[derive(Debug, Clone, Serialize)]
pub struct AmortizationSchedule {
    pub rows: Vec<AmortizationRow>,
    pub total_interest: f64,
    pub total_principal: f64,
}

impl AmortizationSchedule {
    /// Calendar year in which the given period is paid
    ///
    /// Period `p` falls `p` months after the anchor date, which is the
    /// loan's `repayment_anchor`.
    pub fn period_year(anchor: NaiveDate, period: u32) -> i32 {
        anchor
            .checked_add_months(Months::new(period))
            .map_or_else(|| anchor.year() + (period / 12) as i32, |d| d.year())
    }

    /// Sum of payments per calendar year, in year order
    pub fn payments_by_year(&self, anchor: NaiveDate) -> Vec<(i32, f64)> {
        let mut years: Vec<(i32, f64)> = Vec::new();
        for row in &self.rows {
            let year = Self::period_year(anchor, row.period);
            match years.last_mut() {
                Some((y, total)) if *y == year => *total += row.payment,
                _ => years.push((year, row.payment)),
            }
        }
        years
    }

    /// Year of the final payment, if the loan has any periods left
    pub fn closing_year(&self, anchor: NaiveDate) -> Option<i32> {
        self.rows
            .iter()
            .rev()
            .find(|r| r.payment > 0.0)
            .map(|r| Self::period_year(anchor, r.period))
    }
}

/// Compute the schedule for the loan's remaining months
pub fn amortize(loan: &Loan) -> AmortizationSchedule {
    let periods = loan.remaining_months;
    let monthly_rate = loan.annual_rate_pct / 12.0 / 100.0;
    let moratorium = loan.moratorium_remaining();

    let mut rows = Vec::with_capacity(periods as usize);
    let mut balance = loan.outstanding.max(0.0);

    for period in 1..=periods {
        let opening = balance;
        let interest = opening * monthly_rate;
        let is_last = period == periods;

        let (principal, payment, adjustment) = if period <= moratorium && !is_last {
            // Nothing paid; interest capitalizes
            (-interest, 0.0, 0.0)
        } else if opening <= BALANCE_EPSILON && !is_last {
            (0.0, 0.0, 0.0)
        } else {
            let scheduled = (loan.emi - interest).min(opening);
            if is_last {
                // Clear whatever is left, including any under/over-payment
                (opening, opening + interest, opening - scheduled)
            } else {
                (scheduled, scheduled + interest, 0.0)
            }
        };

        balance = opening - principal;
        if is_last {
            balance = 0.0;
        }

        rows.push(AmortizationRow {
            period,
            opening_balance: opening,
            interest_portion: interest,
            principal_portion: principal,
            closing_balance: balance,
            payment,
            adjustment,
        });
    }

    let total_interest = rows.iter().map(|r| r.interest_portion).sum();
    let total_principal = rows.iter().map(|r| r.principal_portion).sum();

    AmortizationSchedule {
        rows,
        total_interest,
        total_principal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::LoanType;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn home_loan() -> Loan {
        Loan {
            loan_type: LoanType::Home,
            principal: 5_000_000.0,
            outstanding: 3_000_000.0,
            emi: 45_000.0,
            annual_rate_pct: 8.5,
            total_months: 240,
            remaining_months: 96,
            start_date: NaiveDate::from_ymd_opt(2018, 1, 1),
            moratorium_months: None,
        }
    }

    #[test]
    fn test_first_period_split() {
        let schedule = amortize(&home_loan());
        let first = &schedule.rows[0];

        assert_relative_eq!(first.interest_portion, 3_000_000.0 * 0.085 / 12.0, epsilon = 1e-9);
        assert_relative_eq!(first.principal_portion, 45_000.0 - first.interest_portion, epsilon = 1e-9);
        assert_relative_eq!(
            first.closing_balance,
            3_000_000.0 - first.principal_portion,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_principal_sums_to_outstanding() {
        let loan = home_loan();
        let schedule = amortize(&loan);

        assert_eq!(schedule.rows.len(), 96);
        assert_relative_eq!(schedule.total_principal, loan.outstanding, epsilon = 1e-6);
        assert_eq!(schedule.rows.last().unwrap().closing_balance, 0.0);
    }

    #[test]
    fn test_overpaying_emi_clamps_to_balance() {
        let mut loan = home_loan();
        loan.emi = 500_000.0;
        loan.remaining_months = 24;
        let schedule = amortize(&loan);

        // Paid off well before the last period; no negative balances anywhere
        assert!(schedule.rows.iter().all(|r| r.closing_balance >= 0.0));
        assert_eq!(schedule.rows[10].payment, 0.0);
        assert_relative_eq!(schedule.total_principal, loan.outstanding, epsilon = 1e-6);
    }

    #[test]
    fn test_underpaying_emi_adjusted_on_last_period() {
        let mut loan = home_loan();
        loan.emi = 30_000.0;
        let schedule = amortize(&loan);
        let last = schedule.rows.last().unwrap();

        assert!(last.adjustment > 0.0);
        assert_eq!(last.closing_balance, 0.0);
        assert_relative_eq!(schedule.total_principal, loan.outstanding, epsilon = 1e-6);
    }

    #[test]
    fn test_moratorium_capitalizes_interest() {
        let loan = Loan {
            loan_type: LoanType::Education,
            principal: 1_000_000.0,
            outstanding: 1_000_000.0,
            emi: 20_000.0,
            annual_rate_pct: 9.0,
            total_months: 84,
            remaining_months: 84,
            start_date: None,
            moratorium_months: Some(6),
        };
        let schedule = amortize(&loan);

        assert_eq!(schedule.rows[0].payment, 0.0);
        assert!(schedule.rows[5].closing_balance > loan.outstanding);
        assert!(schedule.rows[6].payment > 0.0);
        assert_relative_eq!(schedule.total_principal, loan.outstanding, epsilon = 1e-6);
    }

    #[test]
    fn test_payments_grouped_by_year() {
        let mut loan = home_loan();
        loan.remaining_months = 14;
        let schedule = amortize(&loan);
        let as_of = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let by_year = schedule.payments_by_year(as_of);
        // Periods run Nov 2026 through Dec 2027
        assert_eq!(by_year[0].0, 2026);
        assert_relative_eq!(by_year[0].1, 90_000.0, epsilon = 1e-9);
        assert_eq!(by_year.len(), 2);
        assert_eq!(schedule.closing_year(as_of), Some(2027));
    }

    #[test]
    fn test_zero_remaining_months() {
        let mut loan = home_loan();
        loan.remaining_months = 0;
        let schedule = amortize(&loan);
        assert!(schedule.rows.is_empty());
        assert_eq!(schedule.closing_year(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()), None);
    }

    proptest! {
        #[test]
        fn prop_schedule_clears_outstanding(
            outstanding in 10_000.0f64..10_000_000.0,
            rate in 0.0f64..18.0,
            months in 1u32..360,
            emi_factor in 0.5f64..2.0,
        ) {
            let monthly = rate / 1200.0;
            let level_emi = if monthly == 0.0 {
                outstanding / months as f64
            } else {
                outstanding * monthly / (1.0 - (1.0 + monthly).powi(-(months as i32)))
            };
            let loan = Loan {
                loan_type: LoanType::Personal,
                principal: outstanding,
                outstanding,
                emi: level_emi * emi_factor,
                annual_rate_pct: rate,
                total_months: months,
                remaining_months: months,
                start_date: None,
                moratorium_months: None,
            };
            let schedule = amortize(&loan);

            prop_assert_eq!(schedule.rows.len(), months as usize);
            prop_assert!((schedule.total_principal - outstanding).abs() < 1e-6 * outstanding.max(1.0));
            prop_assert_eq!(schedule.rows.last().unwrap().closing_balance, 0.0);
        }
    }
}
