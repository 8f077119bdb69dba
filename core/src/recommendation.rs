//! Rebalancing, hiring and routing recommendations.
//!
//! Generation order (fixed, so output is deterministic):
//!   1. Rebalance   overloaded reps, most loaded first
//!   2. Reassign    concentrated at-risk ARR, in rep order
//!   3. Hire        team above threshold with no headroom left
//!   4. Allocate    whitespace equity below "good"
//!
//! The list is then stable-sorted by priority and truncated.
//!
//! RULES:
//!   - Every function here is pure. Nothing mutates the book.
//!   - Ties always fall back to rep order, never to hash or float noise.

use crate::{
    config::PlannerConfig,
    equity::EquityScores,
    metrics::{ratio, CapacityMetrics, TeamSummary},
    model::{Account, Book, PendingAccount},
    types::{format_money, AccountId, Money, PendingId, Percent, RepId},
};
use serde::{Deserialize, Serialize};

// ── Public types ─────────────────────────────────────────────────────────────

/// Declaration order is sort order: High sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Rebalance,
    Hire,
    Reassign,
    Allocate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id:          String,
    pub priority:    Priority,
    pub kind:        RecommendationKind,
    pub action:      String,
    pub impact:      String,
    pub reason:      String,
    pub account_ids: Option<Vec<AccountId>>,
    pub from_rep_id: Option<RepId>,
    pub to_rep_id:   Option<RepId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    Excellent,
    Good,
    Fair,
}

impl Fit {
    pub fn from_capacity(capacity: Percent, config: &PlannerConfig) -> Self {
        let t = &config.thresholds;
        if capacity < t.excellent_fit_below {
            Self::Excellent
        } else if capacity < t.good_fit_below {
            Self::Good
        } else {
            Self::Fair
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepCandidate {
    pub rep_id:             RepId,
    pub rep_name:           String,
    /// Load before this account, counting earlier ones in the batch.
    /// Candidates are ranked and graded on this.
    pub current_capacity:   Percent,
    /// Capacity once this account lands. Informational.
    pub projected_capacity: Percent,
    pub fit:                Fit,
    pub reasons:            Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecommendation {
    pub pending_id:   PendingId,
    pub account_name: String,
    pub arr:          Money,
    /// Best candidate first.
    pub candidates:   Vec<RepCandidate>,
}

impl AllocationRecommendation {
    pub fn top(&self) -> Option<&RepCandidate> {
        self.candidates.first()
    }
}

// ── Smart recommendations ────────────────────────────────────────────────────

fn capacity_of(arr: Money, ideal: Money) -> Percent {
    ratio(arr, ideal) * 100.0
}

/// Index of the lowest-keyed rep accepted by `eligible`, rep order on ties.
fn pick_rep(
    metrics:  &[CapacityMetrics],
    eligible: impl Fn(usize) -> bool,
    key:      impl Fn(usize) -> (bool, f64),
) -> Option<usize> {
    (0..metrics.len())
        .filter(|&i| eligible(i))
        .min_by(|&a, &b| {
            let (ka, kb) = (key(a), key(b));
            ka.0.cmp(&kb.0)
                .then(ka.1.total_cmp(&kb.1))
                .then(a.cmp(&b))
        })
}

fn rebalance_recommendations(
    book:    &Book,
    metrics: &[CapacityMetrics],
    config:  &PlannerConfig,
) -> Vec<Recommendation> {
    let t = &config.thresholds;
    let ideals: Vec<Money> = metrics
        .iter()
        .map(|m| config.benchmark(m.segment).arr_per_rep.ideal)
        .collect();
    // Planned loads, so two overloaded reps do not both fill one destination.
    let mut loads: Vec<Money> = metrics.iter().map(|m| m.total_arr).collect();

    let mut overloaded: Vec<usize> = (0..metrics.len())
        .filter(|&i| metrics[i].capacity_score > 100.0)
        .collect();
    overloaded.sort_by(|&a, &b| metrics[b].capacity_score.total_cmp(&metrics[a].capacity_score));

    let mut out = Vec::new();
    for src in overloaded {
        let source = &metrics[src];
        let excess = loads[src] - ideals[src];
        if excess <= 0.0 {
            continue;
        }

        let dest = pick_rep(
            metrics,
            |j| j != src && capacity_of(loads[j], ideals[j]) < t.capacity_threshold,
            |j| (metrics[j].segment != source.segment, capacity_of(loads[j], ideals[j])),
        );
        let Some(dest) = dest else {
            continue;
        };
        let target = &metrics[dest];
        let headroom = ideals[dest] * t.capacity_threshold / 100.0 - loads[dest];
        let budget = excess.min(headroom);

        let mut candidates: Vec<&Account> = book.accounts_of(&source.rep_id).collect();
        candidates.sort_by(|a, b| {
            (!a.is_transferable())
                .cmp(&!b.is_transferable())
                .then(a.current_arr.total_cmp(&b.current_arr))
        });

        let mut chosen: Vec<&Account> = Vec::new();
        let mut moved = 0.0;
        for &account in &candidates {
            if chosen.len() >= t.max_accounts_per_move {
                break;
            }
            if moved + account.current_arr <= budget {
                moved += account.current_arr;
                chosen.push(account);
            }
        }
        if chosen.is_empty() {
            let Some(&smallest) = candidates.first() else {
                continue;
            };
            moved = smallest.current_arr;
            chosen.push(smallest);
        }

        let before_src = capacity_of(loads[src], ideals[src]);
        let before_dest = capacity_of(loads[dest], ideals[dest]);
        loads[src] -= moved;
        loads[dest] += moved;

        out.push(Recommendation {
            id: format!("rebalance-{}-{}", source.rep_id, target.rep_id),
            priority: if source.capacity_score > t.critical_capacity { Priority::High } else { Priority::Medium },
            kind: RecommendationKind::Rebalance,
            action: format!(
                "Move {} account(s) ({}) from {} to {}",
                chosen.len(),
                format_money(moved),
                source.rep_name,
                target.rep_name
            ),
            impact: format!(
                "{} drops from {before_src:.0}% to {:.0}% capacity; {} rises from {before_dest:.0}% to {:.0}%",
                source.rep_name,
                capacity_of(loads[src], ideals[src]),
                target.rep_name,
                capacity_of(loads[dest], ideals[dest])
            ),
            reason: format!("{} is at {:.0}% capacity", source.rep_name, source.capacity_score),
            account_ids: Some(chosen.iter().map(|a| a.id.clone()).collect()),
            from_rep_id: Some(source.rep_id.clone()),
            to_rep_id: Some(target.rep_id.clone()),
        });
    }
    out
}

fn risk_recommendations(
    book:    &Book,
    metrics: &[CapacityMetrics],
    config:  &PlannerConfig,
) -> Vec<Recommendation> {
    let t = &config.thresholds;
    let mut out = Vec::new();

    for (src, source) in metrics.iter().enumerate() {
        let priority = if source.at_risk_arr > t.critical_at_risk_arr {
            Priority::High
        } else if source.at_risk_arr > t.warning_at_risk_arr {
            Priority::Medium
        } else {
            continue;
        };

        let mut at_risk: Vec<&Account> = book
            .accounts_of(&source.rep_id)
            .filter(|a| a.churn_risk > t.risk_cutoff)
            .collect();
        at_risk.sort_by(|a, b| b.current_arr.total_cmp(&a.current_arr));
        at_risk.truncate(t.max_accounts_per_move);
        let moved: Money = at_risk.iter().map(|a| a.current_arr).sum();

        let dest = pick_rep(
            metrics,
            |j| j != src && metrics[j].capacity_score < t.capacity_threshold,
            |j| (false, metrics[j].at_risk_share()),
        );

        let reason = format!(
            "{} holds {} at-risk ARR ({:.0}% of their book)",
            source.rep_name,
            format_money(source.at_risk_arr),
            source.at_risk_share() * 100.0
        );
        let rec = match dest {
            Some(dest) => {
                let target = &metrics[dest];
                Recommendation {
                    id: format!("reassign-{}-{}", source.rep_id, target.rep_id),
                    priority,
                    kind: RecommendationKind::Reassign,
                    action: format!(
                        "Reassign {} at-risk account(s) ({}) from {} to {}",
                        at_risk.len(),
                        format_money(moved),
                        source.rep_name,
                        target.rep_name
                    ),
                    impact: format!(
                        "Spreads retention work; {} carries the lowest risk share on the team",
                        target.rep_name
                    ),
                    reason,
                    account_ids: Some(at_risk.iter().map(|a| a.id.clone()).collect()),
                    from_rep_id: Some(source.rep_id.clone()),
                    to_rep_id: Some(target.rep_id.clone()),
                }
            }
            None => Recommendation {
                id: format!("reassign-{}", source.rep_id),
                priority,
                kind: RecommendationKind::Reassign,
                action: format!("Build a retention plan for {}'s at-risk accounts", source.rep_name),
                impact: format!("Protects {} of ARR", format_money(source.at_risk_arr)),
                reason,
                account_ids: Some(at_risk.iter().map(|a| a.id.clone()).collect()),
                from_rep_id: Some(source.rep_id.clone()),
                to_rep_id: None,
            },
        };
        out.push(rec);
    }
    out
}

fn hire_recommendation(metrics: &[CapacityMetrics], summary: &TeamSummary, config: &PlannerConfig) -> Option<Recommendation> {
    let t = &config.thresholds;
    if metrics.is_empty() || summary.avg_capacity <= t.capacity_threshold {
        return None;
    }
    if metrics.iter().any(|m| m.capacity_score < t.capacity_threshold) {
        return None;
    }
    Some(Recommendation {
        id: "hire".into(),
        priority: if summary.avg_capacity > t.critical_capacity { Priority::High } else { Priority::Medium },
        kind: RecommendationKind::Hire,
        action: format!("Hire rep #{}", metrics.len() + 1),
        impact: format!(
            "Brings average capacity from {:.0}% to about {:.0}%",
            summary.avg_capacity,
            summary.avg_capacity * metrics.len() as f64 / (metrics.len() + 1) as f64
        ),
        reason: format!(
            "Team averages {:.0}% capacity and no rep has headroom below {:.0}%",
            summary.avg_capacity, t.capacity_threshold
        ),
        account_ids: None,
        from_rep_id: None,
        to_rep_id: None,
    })
}

fn allocate_recommendation(metrics: &[CapacityMetrics], equity: &EquityScores) -> Option<Recommendation> {
    let score = equity.whitespace.score;
    if metrics.len() < 2 || score >= 75.0 {
        return None;
    }
    let target = metrics.iter().reduce(|best, m| {
        if m.total_actionable_whitespace < best.total_actionable_whitespace { m } else { best }
    })?;
    Some(Recommendation {
        id: format!("allocate-{}", target.rep_id),
        priority: if score < 50.0 { Priority::Medium } else { Priority::Low },
        kind: RecommendationKind::Allocate,
        action: format!("Route new accounts to {}", target.rep_name),
        impact: "Evens out expansion opportunity across the team".into(),
        reason: format!(
            "Whitespace equity is {score:.0}; {} has the least whitespace ({})",
            target.rep_name,
            format_money(target.total_actionable_whitespace)
        ),
        account_ids: None,
        from_rep_id: None,
        to_rep_id: Some(target.rep_id.clone()),
    })
}

pub fn generate_smart_recommendations(
    book:    &Book,
    metrics: &[CapacityMetrics],
    summary: &TeamSummary,
    equity:  &EquityScores,
    config:  &PlannerConfig,
) -> Vec<Recommendation> {
    let mut recs = rebalance_recommendations(book, metrics, config);
    recs.extend(risk_recommendations(book, metrics, config));
    recs.extend(hire_recommendation(metrics, summary, config));
    recs.extend(allocate_recommendation(metrics, equity));

    recs.sort_by_key(|r| r.priority);
    recs.truncate(config.thresholds.max_recommendations);
    recs
}

// ── New-account routing ──────────────────────────────────────────────────────

pub fn get_account_recommendations(
    book:    &Book,
    metrics: &[CapacityMetrics],
    pending: &[PendingAccount],
    config:  &PlannerConfig,
) -> Vec<AllocationRecommendation> {
    let t = &config.thresholds;
    let ideals: Vec<Money> = metrics
        .iter()
        .map(|m| config.benchmark(m.segment).arr_per_rep.ideal)
        .collect();
    let mut loads: Vec<Money> = metrics.iter().map(|m| m.total_arr).collect();

    let territory_match = |i: usize, territory: &str| {
        let rep_id = &metrics[i].rep_id;
        book.rep(rep_id).is_some_and(|r| r.territory == territory)
            || book.accounts_of(rep_id).any(|a| a.territory == territory)
    };

    let mut out = Vec::with_capacity(pending.len());
    for account in pending {
        let current: Vec<Percent> = (0..metrics.len()).map(|i| capacity_of(loads[i], ideals[i])).collect();
        let projected: Vec<Percent> = (0..metrics.len())
            .map(|i| capacity_of(loads[i] + account.arr, ideals[i]))
            .collect();
        let segment_match: Vec<bool> = metrics.iter().map(|m| m.segment == account.segment).collect();
        let terr_match: Vec<bool> = (0..metrics.len()).map(|i| territory_match(i, &account.territory)).collect();

        let mut order: Vec<usize> = (0..metrics.len()).collect();
        order.sort_by(|&a, &b| {
            current[a]
                .total_cmp(&current[b])
                .then_with(|| segment_match[b].cmp(&segment_match[a]))
                .then_with(|| terr_match[b].cmp(&terr_match[a]))
                .then(a.cmp(&b))
        });

        let candidates: Vec<RepCandidate> = order
            .iter()
            .take(t.candidates_per_account)
            .map(|&i| {
                let m = &metrics[i];
                let mut reasons = vec![format!(
                    "Capacity {:.0}% -> {:.0}% after assignment",
                    current[i], projected[i]
                )];
                if current[i] < t.capacity_threshold {
                    reasons.push("Has capacity headroom".into());
                }
                if segment_match[i] {
                    reasons.push("Segment expertise".into());
                }
                if terr_match[i] {
                    reasons.push("Territory match".into());
                }
                RepCandidate {
                    rep_id: m.rep_id.clone(),
                    rep_name: m.rep_name.clone(),
                    current_capacity: current[i],
                    projected_capacity: projected[i],
                    fit: Fit::from_capacity(current[i], config),
                    reasons,
                }
            })
            .collect();

        if let Some(&best) = order.first() {
            loads[best] += account.arr;
        }

        out.push(AllocationRecommendation {
            pending_id: account.id.clone(),
            account_name: account.name.clone(),
            arr: account.arr,
            candidates,
        });
    }
    out
}
