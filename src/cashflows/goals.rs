//! Expand one-time and recurring goals into dated cash outflows

use serde::Serialize;

use crate::records::{Goal, GoalPriority};

/// One dated outflow produced by a goal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalOccurrence {
    pub year: i32,
    /// Nominal amount, rounded to whole currency units
    pub amount: f64,
    pub label: String,
}

/// Expands goals against a recurrence end year and inflation rate
#[derive(Debug, Clone, Copy)]
pub struct GoalExpander {
    /// Recurrence end when the goal does not set one (the retirement year)
    default_end_year: i32,
    /// Hard limit on any occurrence year
    horizon_end_year: i32,
    /// Global inflation (%)
    inflation_rate: f64,
}

impl GoalExpander {
    pub fn new(default_end_year: i32, inflation_rate: f64) -> Self {
        Self {
            default_end_year,
            horizon_end_year: default_end_year,
            inflation_rate,
        }
    }

    /// Allow explicitly dated recurrences to run past the default end year
    pub fn with_horizon(mut self, horizon_end_year: i32) -> Self {
        self.horizon_end_year = horizon_end_year.max(self.default_end_year);
        self
    }

    /// Ordered occurrences for one goal; empty when the goal is incomplete
    pub fn expand(&self, goal: &Goal) -> Vec<GoalOccurrence> {
        let (Some(amount), Some(target_year)) = (goal.target_amount, goal.target_year) else {
            log::debug!("goal {:?} has no amount or year, skipping", goal.name);
            return Vec::new();
        };

        if !goal.is_recurring() {
            return vec![GoalOccurrence {
                year: target_year,
                amount,
                label: goal.name.clone(),
            }];
        }

        let interval = goal.interval();
        let end_year = match goal.recurrence_end_year {
            Some(end) => end.min(self.horizon_end_year),
            None => self.default_end_year,
        };
        let rate = goal.custom_inflation_rate.unwrap_or(self.inflation_rate);

        let mut occurrences = Vec::new();
        let mut year = target_year;
        loop {
            let amount = if goal.inflation_adjusted {
                inflate(amount, rate, year - target_year).round()
            } else {
                amount
            };
            let label = if interval > 1 {
                format!("{} ({})", goal.name, year)
            } else {
                goal.name.clone()
            };
            occurrences.push(GoalOccurrence { year, amount, label });

            year += interval as i32;
            if year > end_year {
                break;
            }
        }
        occurrences
    }

    /// Sum of all occurrence amounts for a goal
    pub fn total_cost(&self, goal: &Goal) -> f64 {
        self.expand(goal).iter().map(|o| o.amount).sum()
    }

    /// Expand every goal, ordered by year and then priority
    pub fn expand_all<'g>(&self, goals: impl IntoIterator<Item = &'g Goal>) -> Vec<GoalOccurrence> {
        let mut tagged: Vec<(GoalOccurrence, GoalPriority)> = goals
            .into_iter()
            .flat_map(|g| self.expand(g).into_iter().map(move |o| (o, g.priority)))
            .collect();
        tagged.sort_by_key(|(o, priority)| (o.year, *priority));
        tagged.into_iter().map(|(o, _)| o).collect()
    }
}

fn inflate(amount: f64, rate_pct: f64, years: i32) -> f64 {
    amount * (1.0 + rate_pct / 100.0).powi(years)
}
