//! Book health scorecard: a 0–100 score per rep, rolled up to the team.
//!
//! Each rep starts at 100 and loses points for load, risk and weak
//! account health. Issues cost more than warnings.

use crate::{
    config::PlannerConfig,
    metrics::{ratio, CapacityMetrics},
    model::Book,
    types::{Percent, RepId},
};
use serde::{Deserialize, Serialize};

const HEALTHY_SCORE: f64 = 80.0;
const WARNING_SCORE: f64 = 60.0;

const NEAR_CAPACITY: Percent = 95.0;
const HIGH_RISK_PCT: Percent = 20.0;
const ELEVATED_RISK_PCT: Percent = 10.0;
const LOW_HEALTH: f64 = 60.0;
const SOFT_HEALTH: f64 = 70.0;
/// Account health at or above this, with whitespace left, is expansion-ready.
const EXPANSION_READY_HEALTH: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    fn from_score(score: f64) -> Self {
        if score >= HEALTHY_SCORE {
            Self::Healthy
        } else if score >= WARNING_SCORE {
            Self::Warning
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepBookHealth {
    pub rep_id:           RepId,
    pub rep_name:         String,
    pub score:            f64,
    pub status:           HealthStatus,
    pub issues:           Vec<String>,
    pub warnings:         Vec<String>,
    pub risk_pct:         Percent,
    pub penetration_rate: Percent,
    pub expansion_ready:  usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamBookHealth {
    pub avg_score:      f64,
    pub overall_status: HealthStatus,
    pub healthy_reps:   Vec<RepId>,
    pub critical_reps:  Vec<RepId>,
    pub rep_scores:     Vec<RepBookHealth>,
}

fn rep_book_health(book: &Book, m: &CapacityMetrics, config: &PlannerConfig) -> RepBookHealth {
    let t = &config.thresholds;
    let mut score: f64 = 100.0;
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    if m.capacity_score > t.critical_capacity {
        score -= 30.0;
        issues.push(format!("Critically over capacity ({:.0}%)", m.capacity_score));
    } else if m.capacity_score > 100.0 {
        score -= 20.0;
        issues.push(format!("Over capacity ({:.0}%)", m.capacity_score));
    } else if m.capacity_score > NEAR_CAPACITY {
        score -= 10.0;
        warnings.push(format!("Near capacity ({:.0}%)", m.capacity_score));
    }

    let risk_pct = m.at_risk_share() * 100.0;
    if risk_pct > HIGH_RISK_PCT {
        score -= 25.0;
        issues.push(format!("High at-risk ARR ({risk_pct:.0}%)"));
    } else if risk_pct > ELEVATED_RISK_PCT {
        score -= 10.0;
        warnings.push(format!("Elevated at-risk ARR ({risk_pct:.0}%)"));
    }

    if m.account_count == 0 {
        warnings.push("No accounts assigned".into());
    } else if m.avg_health < LOW_HEALTH {
        score -= 20.0;
        issues.push(format!("Low average health ({:.0})", m.avg_health));
    } else if m.avg_health < SOFT_HEALTH {
        score -= 10.0;
        warnings.push(format!("Soft average health ({:.0})", m.avg_health));
    }

    let expansion_ready = book
        .accounts_of(&m.rep_id)
        .filter(|a| a.health_score >= EXPANSION_READY_HEALTH && a.churn_risk <= t.risk_cutoff && a.whitespace() > 0.0)
        .count();

    let score = score.clamp(0.0, 100.0);
    RepBookHealth {
        rep_id: m.rep_id.clone(),
        rep_name: m.rep_name.clone(),
        score,
        status: HealthStatus::from_score(score),
        issues,
        warnings,
        risk_pct,
        penetration_rate: ratio(m.total_arr, m.total_tam) * 100.0,
        expansion_ready,
    }
}

pub fn team_book_health(book: &Book, metrics: &[CapacityMetrics], config: &PlannerConfig) -> TeamBookHealth {
    let rep_scores: Vec<RepBookHealth> = metrics.iter().map(|m| rep_book_health(book, m, config)).collect();

    let avg_score = if rep_scores.is_empty() {
        100.0
    } else {
        (rep_scores.iter().map(|r| r.score).sum::<f64>() / rep_scores.len() as f64).round()
    };

    let ids_with = |status: HealthStatus| -> Vec<RepId> {
        rep_scores
            .iter()
            .filter(|r| r.status == status)
            .map(|r| r.rep_id.clone())
            .collect()
    };

    TeamBookHealth {
        avg_score,
        overall_status: HealthStatus::from_score(avg_score),
        healthy_reps: ids_with(HealthStatus::Healthy),
        critical_reps: ids_with(HealthStatus::Critical),
        rep_scores,
    }
}
