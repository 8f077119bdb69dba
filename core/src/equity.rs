//! Equity scoring: how evenly load is spread across the team.
//!
//! Each dimension is scored as 100 − coefficient of variation, clamped
//! to [0, 100] and rounded. Fewer than two reps, or a dimension whose
//! values are all zero, scores a perfect 100.

use crate::{
    config::Thresholds,
    metrics::{ratio, CapacityMetrics, TeamSummary},
    types::RepId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityDimension {
    Arr,
    Whitespace,
    Capacity,
    Risk,
}

impl EquityDimension {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Arr => "ARR",
            Self::Whitespace => "whitespace",
            Self::Capacity => "capacity",
            Self::Risk => "at-risk ARR",
        }
    }

    fn value(&self, m: &CapacityMetrics) -> f64 {
        match self {
            Self::Arr => m.total_arr,
            Self::Whitespace => m.total_actionable_whitespace,
            Self::Capacity => m.capacity_score,
            Self::Risk => m.at_risk_arr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityStatus {
    Good,
    Warning,
    Critical,
}

impl EquityStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityScore {
    pub dimension:              EquityDimension,
    pub score:                  f64,
    pub status:                 EquityStatus,
    pub explanation:            String,
    pub imbalance_contributors: Vec<RepId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityScores {
    pub arr:        EquityScore,
    pub whitespace: EquityScore,
    pub capacity:   EquityScore,
    pub risk:       EquityScore,
}

impl EquityScores {
    pub fn all(&self) -> [&EquityScore; 4] {
        [&self.arr, &self.whitespace, &self.capacity, &self.risk]
    }

    pub fn overall(&self) -> f64 {
        (self.all().iter().map(|s| s.score).sum::<f64>() / 4.0).round()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Warning,
    Info,
    Success,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind:    InsightKind,
    pub message: String,
}

// ── Scoring ──────────────────────────────────────────────────────────────────

fn score_dimension(metrics: &[CapacityMetrics], dimension: EquityDimension, outlier_sigma: f64) -> EquityScore {
    let values: Vec<f64> = metrics.iter().map(|m| dimension.value(m)).collect();
    let n = values.len() as f64;
    let mu = if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / n };

    if values.len() < 2 || mu <= 0.0 {
        let explanation = if values.len() < 2 {
            format!("Fewer than two reps; {} balance is trivially even", dimension.label())
        } else {
            format!("No {} on the team to balance", dimension.label())
        };
        return EquityScore {
            dimension,
            score: 100.0,
            status: EquityStatus::Good,
            explanation,
            imbalance_contributors: Vec::new(),
        };
    }

    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n;
    let sigma = variance.sqrt();
    let cv = sigma / mu * 100.0;
    let score = (100.0 - cv).clamp(0.0, 100.0).round();

    let imbalance_contributors: Vec<RepId> = if sigma > 0.0 {
        metrics
            .iter()
            .zip(&values)
            .filter(|(_, v)| (*v - mu).abs() > outlier_sigma * sigma)
            .map(|(m, _)| m.rep_id.clone())
            .collect()
    } else {
        Vec::new()
    };

    let status = EquityStatus::from_score(score);
    let explanation = match status {
        EquityStatus::Good => format!("{} is evenly distributed (variation {cv:.0}%)", dimension.label()),
        EquityStatus::Warning => format!(
            "{} is moderately uneven (variation {cv:.0}%, {} outlier rep(s))",
            dimension.label(),
            imbalance_contributors.len()
        ),
        EquityStatus::Critical => format!(
            "{} is heavily concentrated (variation {cv:.0}%, {} outlier rep(s))",
            dimension.label(),
            imbalance_contributors.len()
        ),
    };

    EquityScore { dimension, score, status, explanation, imbalance_contributors }
}

pub fn calculate_equity_scores(metrics: &[CapacityMetrics], thresholds: &Thresholds) -> EquityScores {
    let sigma = thresholds.outlier_sigma;
    EquityScores {
        arr:        score_dimension(metrics, EquityDimension::Arr, sigma),
        whitespace: score_dimension(metrics, EquityDimension::Whitespace, sigma),
        capacity:   score_dimension(metrics, EquityDimension::Capacity, sigma),
        risk:       score_dimension(metrics, EquityDimension::Risk, sigma),
    }
}

// ── Insights ─────────────────────────────────────────────────────────────────

const HEALTHY_BAND: (f64, f64) = (60.0, 85.0);
const ARR_RATIO_ALERT: f64 = 2.0;
const WHITESPACE_CONCENTRATION: f64 = 40.0;

pub fn equity_insights(metrics: &[CapacityMetrics], summary: &TeamSummary, thresholds: &Thresholds) -> Vec<Insight> {
    let mut insights = Vec::new();
    if metrics.is_empty() {
        return insights;
    }

    // First occurrence wins ties so the wording is stable.
    let mut max_arr = &metrics[0];
    let mut min_arr = &metrics[0];
    let mut max_ws = &metrics[0];
    for m in metrics.iter().skip(1) {
        if m.total_arr > max_arr.total_arr {
            max_arr = m;
        }
        if m.total_arr < min_arr.total_arr {
            min_arr = m;
        }
        if m.total_actionable_whitespace > max_ws.total_actionable_whitespace {
            max_ws = m;
        }
    }

    if metrics.len() >= 2 && max_arr.total_arr > 0.0 {
        if min_arr.total_arr <= 0.0 {
            insights.push(Insight {
                kind: InsightKind::Warning,
                message: format!(
                    "{} carries no ARR while {} manages {:.0}. Consider rebalancing.",
                    min_arr.rep_name, max_arr.rep_name, max_arr.total_arr
                ),
            });
        } else {
            let arr_ratio = max_arr.total_arr / min_arr.total_arr;
            if arr_ratio > ARR_RATIO_ALERT {
                insights.push(Insight {
                    kind: InsightKind::Warning,
                    message: format!(
                        "{} manages {arr_ratio:.1}x more ARR than {}. Consider rebalancing.",
                        max_arr.rep_name, min_arr.rep_name
                    ),
                });
            }
        }
    }

    let ws_share = ratio(max_ws.total_actionable_whitespace, summary.total_whitespace) * 100.0;
    if metrics.len() >= 2 && ws_share > WHITESPACE_CONCENTRATION {
        insights.push(Insight {
            kind: InsightKind::Info,
            message: format!(
                "{ws_share:.0}% of actionable whitespace is concentrated with {}.",
                max_ws.rep_name
            ),
        });
    }

    let overloaded: Vec<&str> = metrics
        .iter()
        .filter(|m| m.capacity_score > 100.0)
        .map(|m| m.rep_name.as_str())
        .collect();
    if !overloaded.is_empty() {
        insights.push(Insight {
            kind: InsightKind::Warning,
            message: format!(
                "{} team member(s) are over capacity: {}.",
                overloaded.len(),
                overloaded.join(", ")
            ),
        });
    }

    let mut risky: Vec<&CapacityMetrics> = metrics
        .iter()
        .filter(|m| m.at_risk_share() > thresholds.risk_concentration_share)
        .collect();
    if !risky.is_empty() {
        risky.sort_by(|a, b| b.at_risk_arr.total_cmp(&a.at_risk_arr));
        let names: Vec<&str> = risky.iter().map(|m| m.rep_name.as_str()).collect();
        insights.push(Insight {
            kind: InsightKind::Warning,
            message: format!(
                "{} team member(s) have >{:.0}% at-risk ARR: {}.",
                risky.len(),
                thresholds.risk_concentration_share * 100.0,
                names.join(", ")
            ),
        });
    }

    let all_balanced = metrics
        .iter()
        .all(|m| m.capacity_score >= HEALTHY_BAND.0 && m.capacity_score <= HEALTHY_BAND.1);
    if all_balanced {
        insights.push(Insight {
            kind: InsightKind::Success,
            message: "All team members are within healthy capacity range.".into(),
        });
    }

    insights
}
