//! Per-rep load metrics and the team roll-up.
//!
//! RULE: metrics are pure functions of a `Book` and the config.
//! Nothing here is cached or stored on the rep.
//!
//! A rep with no accounts yields zero-valued metrics, never an error.

use crate::{
    config::PlannerConfig,
    model::{Book, Rep, Segment},
    types::{Money, Percent, RepId},
};
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityStatus {
    Healthy,
    Watch,
    OverCapacity,
}

impl CapacityStatus {
    pub fn from_score(score: Percent, threshold: Percent) -> Self {
        if score < threshold {
            Self::Healthy
        } else if score <= 100.0 {
            Self::Watch
        } else {
            Self::OverCapacity
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Watch => "watch",
            Self::OverCapacity => "over_capacity",
        }
    }
}

/// Signed percentage distance from the midpoint of the segment's range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkDiff {
    pub arr_diff:      Percent,
    pub accounts_diff: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityMetrics {
    pub rep_id:                      RepId,
    pub rep_name:                    String,
    pub segment:                     Segment,
    pub account_count:               usize,
    pub total_arr:                   Money,
    pub total_tam:                   Money,
    pub capacity_score:              Percent,
    pub capacity_status:             CapacityStatus,
    pub total_actionable_whitespace: Money,
    pub at_risk_arr:                 Money,
    pub avg_health:                  f64,
    pub benchmark_comparison:        BenchmarkDiff,
}

impl CapacityMetrics {
    /// Share of the rep's ARR sitting in at-risk accounts, 0..=1.
    pub fn at_risk_share(&self) -> f64 {
        ratio(self.at_risk_arr, self.total_arr)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team_size:              usize,
    pub total_arr:              Money,
    pub total_accounts:         usize,
    pub total_whitespace:       Money,
    pub total_at_risk_arr:      Money,
    pub at_risk_percent:        Percent,
    pub avg_capacity:           Percent,
    pub avg_health:             f64,
    pub avg_arr_per_rep:        Money,
    pub avg_accounts_per_rep:   f64,
}

// ── Calculations ─────────────────────────────────────────────────────────────

/// `numerator / denominator`, or 0 when the denominator is not positive.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

pub fn rep_metrics(book: &Book, rep: &Rep, config: &PlannerConfig) -> CapacityMetrics {
    let bench = config.benchmark(rep.segment);
    let cutoff = config.thresholds.risk_cutoff;

    let mut account_count = 0usize;
    let mut total_arr = 0.0;
    let mut total_tam = 0.0;
    let mut whitespace = 0.0;
    let mut at_risk_arr = 0.0;
    let mut health_sum = 0.0;

    for account in book.accounts_of(&rep.id) {
        account_count += 1;
        total_arr += account.current_arr;
        total_tam += account.internal_tam;
        whitespace += account.whitespace();
        health_sum += account.health_score;
        if account.churn_risk > cutoff {
            at_risk_arr += account.current_arr;
        }
    }

    let capacity_score = ratio(total_arr, bench.arr_per_rep.ideal) * 100.0;
    let avg_health = ratio(health_sum, account_count as f64);

    let diff_from_mid = |value: f64, mid: f64| {
        if account_count == 0 || mid <= 0.0 {
            0.0
        } else {
            (value / mid - 1.0) * 100.0
        }
    };

    CapacityMetrics {
        rep_id: rep.id.clone(),
        rep_name: rep.name.clone(),
        segment: rep.segment,
        account_count,
        total_arr,
        total_tam,
        capacity_score,
        capacity_status: CapacityStatus::from_score(capacity_score, config.thresholds.capacity_threshold),
        total_actionable_whitespace: whitespace,
        at_risk_arr,
        avg_health,
        benchmark_comparison: BenchmarkDiff {
            arr_diff:      diff_from_mid(total_arr, bench.arr_per_rep.midpoint()),
            accounts_diff: diff_from_mid(account_count as f64, bench.accounts_per_rep.midpoint()),
        },
    }
}

/// Metrics for every rep, in rep order.
pub fn calculate_capacity_metrics(book: &Book, config: &PlannerConfig) -> Vec<CapacityMetrics> {
    book.reps.iter().map(|rep| rep_metrics(book, rep, config)).collect()
}

pub fn team_summary(metrics: &[CapacityMetrics]) -> TeamSummary {
    if metrics.is_empty() {
        return TeamSummary::default();
    }

    let team_size = metrics.len();
    let total_arr: Money = metrics.iter().map(|m| m.total_arr).sum();
    let total_accounts: usize = metrics.iter().map(|m| m.account_count).sum();
    let total_at_risk_arr: Money = metrics.iter().map(|m| m.at_risk_arr).sum();
    let capacities: Vec<f64> = metrics.iter().map(|m| m.capacity_score).collect();

    // Team health weights each account equally, not each rep.
    let health_weighted: f64 = metrics.iter().map(|m| m.avg_health * m.account_count as f64).sum();

    TeamSummary {
        team_size,
        total_arr,
        total_accounts,
        total_whitespace: metrics.iter().map(|m| m.total_actionable_whitespace).sum(),
        total_at_risk_arr,
        at_risk_percent: ratio(total_at_risk_arr, total_arr) * 100.0,
        avg_capacity: mean(&capacities),
        avg_health: ratio(health_weighted, total_accounts as f64),
        avg_arr_per_rep: total_arr / team_size as f64,
        avg_accounts_per_rep: total_accounts as f64 / team_size as f64,
    }
}
