//! The territory planner: an immutable baseline, a mutable scenario,
//! and the analysis derived from the scenario.
//!
//! RECOMPUTE ORDER (fixed, documented, never reordered):
//!   1. Capacity metrics + team summary
//!   2. Equity scores + insights
//!   3. Benchmark comparison
//!   4. Projections
//!   5. Recommendations
//!   6. Book health
//!
//! RULES:
//!   - `original` is never mutated after construction.
//!   - Every mutation validates its whole request before touching the
//!     scenario. A rejected request leaves the planner unchanged.
//!   - Every scenario mutation ends with a full recompute, so the cached
//!     analysis always matches the scenario.
//!   - All randomness flows through the RngBank.

use crate::{
    benchmark::{benchmark_comparison, dominant_segment, BenchmarkComparison},
    config::PlannerConfig,
    equity::{calculate_equity_scores, equity_insights, EquityScores, Insight},
    error::{PlannerError, PlannerResult},
    export::ExportReport,
    health::{team_book_health, TeamBookHealth},
    ingest,
    metrics::{calculate_capacity_metrics, ratio, team_summary, CapacityMetrics, TeamSummary},
    model::{Account, Book, NewPendingAccount, PendingAccount, Rep, Segment},
    projection::{calculate_projections, ProjectionConfig, Projections},
    recommendation::{
        generate_smart_recommendations, get_account_recommendations, AllocationRecommendation,
        Recommendation, RecommendationKind,
    },
    rng::{RngBank, RngSlot, ScenarioRng},
    types::{format_money, AccountId, PendingId, RepId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, io::Read};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioState {
    Clean,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub original:   f64,
    pub scenario:   f64,
    pub diff:       f64,
    /// Relative to the original; 0 when the original is 0.
    pub pct_change: f64,
    pub direction:  Direction,
}

impl MetricDelta {
    /// `higher_is_better`: None for metrics with no preferred direction.
    fn between(original: f64, scenario: f64, higher_is_better: Option<bool>) -> Self {
        let diff = scenario - original;
        let direction = match higher_is_better {
            _ if diff.abs() < 1e-9 => Direction::Neutral,
            None => Direction::Neutral,
            Some(true) if diff > 0.0 => Direction::Positive,
            Some(false) if diff < 0.0 => Direction::Positive,
            Some(_) => Direction::Negative,
        };
        Self {
            original,
            scenario,
            diff,
            pct_change: ratio(diff, original.abs()) * 100.0,
            direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioComparison {
    pub team_size:    MetricDelta,
    pub total_arr:    MetricDelta,
    pub avg_capacity: MetricDelta,
    pub whitespace:   MetricDelta,
    pub at_risk_arr:  MetricDelta,
    pub avg_health:   MetricDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnOutcome {
    pub removed_accounts: Vec<String>,
    pub removed_arr:      f64,
}

/// Everything derived from one book, computed in the recompute order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub metrics:         Vec<CapacityMetrics>,
    pub summary:         TeamSummary,
    pub equity:          EquityScores,
    pub insights:        Vec<Insight>,
    pub benchmarks:      BenchmarkComparison,
    pub projections:     Projections,
    pub recommendations: Vec<Recommendation>,
    pub health:          TeamBookHealth,
}

impl Analysis {
    pub fn compute(
        book:       &Book,
        config:     &PlannerConfig,
        projection: &ProjectionConfig,
        as_of:      NaiveDate,
    ) -> PlannerResult<Self> {
        let metrics = calculate_capacity_metrics(book, config);
        let summary = team_summary(&metrics);
        let equity = calculate_equity_scores(&metrics, &config.thresholds);
        let insights = equity_insights(&metrics, &summary, &config.thresholds);
        let segment = dominant_segment(book.reps.iter().map(|r| r.segment));
        let benchmarks = benchmark_comparison(&summary, segment, config);
        let projections = calculate_projections(&metrics, config, projection, as_of)?;
        let recommendations = generate_smart_recommendations(book, &metrics, &summary, &equity, config);
        let health = team_book_health(book, &metrics, config);

        Ok(Self {
            metrics,
            summary,
            equity,
            insights,
            benchmarks,
            projections,
            recommendations,
            health,
        })
    }
}

fn rejected(err: PlannerError) -> PlannerError {
    log::warn!("Rejected scenario request: {err}");
    err
}

// ── Planner ──────────────────────────────────────────────────────────────────

pub struct TerritoryPlanner {
    config:     PlannerConfig,
    original:   Book,
    scenario:   Book,
    pending:    Vec<PendingAccount>,
    changes:    Vec<String>,
    modified:   bool,
    rng_bank:   RngBank,
    churn_rng:  ScenarioRng,
    as_of:      NaiveDate,
    projection: ProjectionConfig,
    analysis:   Analysis,
}

impl TerritoryPlanner {
    /// Build a planner over `book`. The book becomes the baseline.
    pub fn new(book: Book, config: PlannerConfig, seed: u64, as_of: NaiveDate) -> PlannerResult<Self> {
        config.validate()?;
        if book.reps.is_empty() {
            return Err(PlannerError::NoReps);
        }
        let rep_ids: HashSet<&str> = book.reps.iter().map(|r| r.id.as_str()).collect();
        if let Some(orphan) = book.accounts.iter().find(|a| !rep_ids.contains(a.owner_id.as_str())) {
            return Err(PlannerError::InvalidRequest {
                reason: format!("account '{}' references unknown rep id '{}'", orphan.name, orphan.owner_id),
            });
        }

        let projection = config.projection.clone();
        let analysis = Analysis::compute(&book, &config, &projection, as_of)?;
        let rng_bank = RngBank::new(seed);

        log::info!(
            "Planner ready: {} reps, {} accounts, seed {seed}, as of {as_of}",
            book.reps.len(),
            book.accounts.len()
        );

        Ok(Self {
            scenario: book.clone(),
            original: book,
            pending: Vec::new(),
            changes: Vec::new(),
            modified: false,
            churn_rng: rng_bank.for_slot(RngSlot::Churn),
            rng_bank,
            as_of,
            projection,
            analysis,
            config,
        })
    }

    pub fn from_csv<R: Read>(reader: R, config: PlannerConfig, seed: u64, as_of: NaiveDate) -> PlannerResult<Self> {
        Self::new(ingest::parse_csv(reader)?, config, seed, as_of)
    }

    pub fn sample(config: PlannerConfig, seed: u64, as_of: NaiveDate) -> PlannerResult<Self> {
        Self::new(ingest::sample_book()?, config, seed, as_of)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn original(&self) -> &Book {
        &self.original
    }

    pub fn scenario(&self) -> &Book {
        &self.scenario
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn state(&self) -> ScenarioState {
        if self.modified { ScenarioState::Modified } else { ScenarioState::Clean }
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.seed()
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn pending_accounts(&self) -> &[PendingAccount] {
        &self.pending
    }

    /// Human-readable log of scenario mutations since the last reset.
    pub fn scenario_changes(&self) -> &[String] {
        &self.changes
    }

    pub fn territories(&self) -> Vec<String> {
        let mut out = self.scenario.territories();
        for rep in &self.scenario.reps {
            if !out.contains(&rep.territory) {
                out.push(rep.territory.clone());
            }
        }
        out
    }

    pub fn projection_config(&self) -> &ProjectionConfig {
        &self.projection
    }

    // ── Analysis views ──────────────────────────────────────────────

    pub fn capacity_metrics(&self) -> &[CapacityMetrics] {
        &self.analysis.metrics
    }

    pub fn team_summary(&self) -> &TeamSummary {
        &self.analysis.summary
    }

    pub fn calculate_equity_scores(&self) -> &EquityScores {
        &self.analysis.equity
    }

    pub fn equity_insights(&self) -> &[Insight] {
        &self.analysis.insights
    }

    pub fn benchmark_comparison(&self, segment: Segment) -> BenchmarkComparison {
        benchmark_comparison(&self.analysis.summary, segment, &self.config)
    }

    /// Projections under arbitrary levers; the stored levers are untouched.
    pub fn calculate_projections(&self, projection: &ProjectionConfig) -> PlannerResult<Projections> {
        calculate_projections(&self.analysis.metrics, &self.config, projection, self.as_of)
    }

    pub fn projections(&self) -> &Projections {
        &self.analysis.projections
    }

    pub fn generate_smart_recommendations(&self) -> &[Recommendation] {
        &self.analysis.recommendations
    }

    pub fn get_account_recommendations(&self, pending: &[PendingAccount]) -> Vec<AllocationRecommendation> {
        get_account_recommendations(&self.scenario, &self.analysis.metrics, pending, &self.config)
    }

    pub fn pending_recommendations(&self) -> Vec<AllocationRecommendation> {
        self.get_account_recommendations(&self.pending)
    }

    pub fn team_book_health(&self) -> &TeamBookHealth {
        &self.analysis.health
    }

    pub fn export_report(&self) -> ExportReport {
        ExportReport::build(&self.analysis.summary, self.analysis.equity.overall(), &self.analysis.metrics)
    }

    pub fn scenario_comparison(&self) -> ScenarioComparison {
        let before = team_summary(&calculate_capacity_metrics(&self.original, &self.config));
        let after = &self.analysis.summary;

        ScenarioComparison {
            team_size:    MetricDelta::between(before.team_size as f64, after.team_size as f64, None),
            total_arr:    MetricDelta::between(before.total_arr, after.total_arr, Some(true)),
            avg_capacity: MetricDelta::between(before.avg_capacity, after.avg_capacity, Some(false)),
            whitespace:   MetricDelta::between(before.total_whitespace, after.total_whitespace, Some(true)),
            at_risk_arr:  MetricDelta::between(before.total_at_risk_arr, after.total_at_risk_arr, Some(false)),
            avg_health:   MetricDelta::between(before.avg_health, after.avg_health, Some(true)),
        }
    }

    // ── Scenario mutations ──────────────────────────────────────────

    fn commit(&mut self, change: String) -> PlannerResult<()> {
        log::info!("scenario: {change}");
        self.changes.push(change);
        self.modified = true;
        self.recompute()
    }

    fn recompute(&mut self) -> PlannerResult<()> {
        self.analysis = Analysis::compute(&self.scenario, &self.config, &self.projection, self.as_of)?;
        log::debug!(
            "recompute: {} reps, {} accounts, avg capacity {:.1}%, {} recommendation(s)",
            self.scenario.reps.len(),
            self.scenario.accounts.len(),
            self.analysis.summary.avg_capacity,
            self.analysis.recommendations.len()
        );
        Ok(())
    }

    fn rep_id_by_name(&self, name: &str) -> PlannerResult<RepId> {
        self.scenario
            .rep_by_name(name)
            .map(|r| r.id.clone())
            .ok_or_else(|| rejected(PlannerError::RepNotFound { name: name.to_string() }))
    }

    pub fn simulate_add_rep(&mut self, name: &str, segment: Segment, territory: &str) -> PlannerResult<RepId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(rejected(PlannerError::InvalidRequest { reason: "rep name must not be empty".into() }));
        }
        if self.scenario.rep_by_name(name).is_some() {
            return Err(rejected(PlannerError::DuplicateRep { name: name.to_string() }));
        }
        let territory = match territory.trim() {
            "" => "Unassigned",
            t => t,
        };

        let id = self.scenario.next_rep_id();
        self.scenario.reps.push(Rep {
            id: id.clone(),
            name: name.to_string(),
            segment,
            territory: territory.to_string(),
        });
        self.commit(format!("Added {name} ({segment}, {territory})"))?;
        Ok(id)
    }

    /// Remove a rep and deal their accounts round-robin to the others.
    pub fn simulate_remove_rep(&mut self, name: &str) -> PlannerResult<()> {
        let rep_id = self.rep_id_by_name(name)?;
        if self.scenario.reps.len() <= 1 {
            return Err(rejected(PlannerError::LastRep { name: name.to_string() }));
        }

        self.scenario.reps.retain(|r| r.id != rep_id);
        let remaining: Vec<RepId> = self.scenario.reps.iter().map(|r| r.id.clone()).collect();

        let mut moved = 0usize;
        for account in self.scenario.accounts.iter_mut().filter(|a| a.owner_id == rep_id) {
            account.owner_id = remaining[moved % remaining.len()].clone();
            moved += 1;
        }

        self.commit(format!("Removed {name}; {moved} account(s) redistributed across {} reps", remaining.len()))
    }

    /// Move the named accounts to `to_rep_name`. Only ownership changes.
    pub fn simulate_reassignment<S: AsRef<str>>(&mut self, account_names: &[S], to_rep_name: &str) -> PlannerResult<()> {
        if account_names.is_empty() {
            return Err(rejected(PlannerError::InvalidRequest { reason: "no accounts to reassign".into() }));
        }
        let to_rep_id = self.rep_id_by_name(to_rep_name)?;

        let mut ids: Vec<AccountId> = Vec::with_capacity(account_names.len());
        for name in account_names {
            let name = name.as_ref();
            let account = self
                .scenario
                .account_by_name(name)
                .ok_or_else(|| rejected(PlannerError::AccountNotFound { name: name.to_string() }))?;
            ids.push(account.id.clone());
        }

        let moved_arr = self.move_accounts(&ids, &to_rep_id);
        self.commit(format!(
            "Reassigned {} account(s) ({}) to {to_rep_name}",
            ids.len(),
            format_money(moved_arr)
        ))
    }

    fn move_accounts(&mut self, ids: &[AccountId], to_rep_id: &str) -> f64 {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let mut moved_arr = 0.0;
        for account in self.scenario.accounts.iter_mut().filter(|a| wanted.contains(a.id.as_str())) {
            account.owner_id = to_rep_id.to_string();
            moved_arr += account.current_arr;
        }
        moved_arr
    }

    /// Remove `round(n × rate)` accounts, sampled by churn risk.
    pub fn simulate_churn(&mut self, rate: f64) -> PlannerResult<ChurnOutcome> {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(rejected(PlannerError::invalid_parameter("churn rate", rate, "must be within [0, 1]")));
        }

        let count = (self.scenario.accounts.len() as f64 * rate).round() as usize;
        let weights: Vec<f64> = self.scenario.accounts.iter().map(|a| a.churn_risk).collect();
        let picked: HashSet<usize> = self.churn_rng.weighted_sample(&weights, count).into_iter().collect();

        let mut removed_accounts = Vec::with_capacity(picked.len());
        let mut removed_arr = 0.0;
        let mut kept: Vec<Account> = Vec::with_capacity(self.scenario.accounts.len() - picked.len());
        for (i, account) in std::mem::take(&mut self.scenario.accounts).into_iter().enumerate() {
            if picked.contains(&i) {
                removed_arr += account.current_arr;
                removed_accounts.push(account.name);
            } else {
                kept.push(account);
            }
        }
        self.scenario.accounts = kept;

        self.commit(format!(
            "Simulated {:.0}% churn: lost {} account(s), {}",
            rate * 100.0,
            removed_accounts.len(),
            format_money(removed_arr)
        ))?;
        Ok(ChurnOutcome { removed_accounts, removed_arr })
    }

    pub fn reset_to_original(&mut self) -> PlannerResult<()> {
        self.scenario = self.original.clone();
        self.pending.clear();
        self.changes.clear();
        self.modified = false;
        self.churn_rng = self.rng_bank.for_slot(RngSlot::Churn);
        log::info!("scenario: reset to original");
        self.recompute()
    }

    /// Replace the projection levers and refresh the analysis.
    pub fn set_projection_config(&mut self, projection: ProjectionConfig) -> PlannerResult<()> {
        projection.validate().map_err(rejected)?;
        self.projection = projection;
        log::info!("projection levers updated");
        self.recompute()
    }

    // ── Pending accounts ────────────────────────────────────────────

    pub fn add_pending_account(&mut self, new: NewPendingAccount) -> PlannerResult<PendingId> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(rejected(PlannerError::InvalidPendingAccount { reason: "name must not be empty".into() }));
        }
        if !new.arr.is_finite() || new.arr < 0.0 {
            return Err(rejected(PlannerError::InvalidPendingAccount {
                reason: format!("ARR must be a non-negative number, got {}", new.arr),
            }));
        }
        let tam = match new.tam {
            Some(tam) if tam > 0.0 => tam,
            _ => new.arr * self.config.new_accounts.tam_multiple,
        };
        if !tam.is_finite() {
            return Err(rejected(PlannerError::InvalidPendingAccount { reason: "TAM must be finite".into() }));
        }
        let territory = new
            .territory
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Unassigned")
            .to_string();

        let id = uuid::Uuid::new_v4().to_string();
        log::info!("pending: queued {name} ({}, {territory})", format_money(new.arr));
        self.pending.push(PendingAccount {
            id: id.clone(),
            name: name.to_string(),
            arr: new.arr,
            tam,
            territory,
            segment: new.segment,
        });
        Ok(id)
    }

    pub fn remove_pending_account(&mut self, id: &str) -> PlannerResult<PendingAccount> {
        let pos = self
            .pending
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| rejected(PlannerError::PendingNotFound { id: id.to_string() }))?;
        let removed = self.pending.remove(pos);
        log::info!("pending: dropped {}", removed.name);
        Ok(removed)
    }

    /// Commit each pending account to its top candidate, then clear the queue.
    pub fn apply_recommendations(&mut self, recs: &[AllocationRecommendation]) -> PlannerResult<Vec<AccountId>> {
        if recs.is_empty() {
            return Ok(Vec::new());
        }

        let mut plan: Vec<(PendingAccount, RepId)> = Vec::with_capacity(recs.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(recs.len());
        for rec in recs {
            if !seen.insert(rec.pending_id.as_str()) {
                return Err(rejected(PlannerError::InvalidRequest {
                    reason: format!("pending account '{}' is listed more than once", rec.pending_id),
                }));
            }
            let pending = self
                .pending
                .iter()
                .find(|p| p.id == rec.pending_id)
                .ok_or_else(|| rejected(PlannerError::PendingNotFound { id: rec.pending_id.clone() }))?;
            let top = rec.top().ok_or_else(|| rejected(PlannerError::NoReps))?;
            if self.scenario.rep(&top.rep_id).is_none() {
                return Err(rejected(PlannerError::RepNotFound { name: top.rep_name.clone() }));
            }
            plan.push((pending.clone(), top.rep_id.clone()));
        }

        let defaults = self.config.new_accounts.clone();
        let mut created = Vec::with_capacity(plan.len());
        for (pending, rep_id) in plan {
            let id = self.scenario.next_account_id();
            self.scenario.accounts.push(Account {
                id: id.clone(),
                name: pending.name,
                owner_id: rep_id,
                current_arr: pending.arr,
                internal_tam: pending.tam,
                health_score: defaults.health_score,
                churn_risk: defaults.churn_risk,
                territory: pending.territory,
                segment: pending.segment,
                products_owned: Vec::new(),
                lifecycle_stage: defaults.lifecycle_stage.clone(),
            });
            created.push(id);
        }
        self.pending.clear();

        self.commit(format!("Assigned {} new account(s) from the pending queue", created.len()))?;
        Ok(created)
    }

    /// Route the whole pending queue in one step.
    pub fn apply_pending(&mut self) -> PlannerResult<Vec<AccountId>> {
        let recs = self.pending_recommendations();
        self.apply_recommendations(&recs)
    }

    /// Carry out a rebalance or reassign recommendation's account moves.
    pub fn apply_smart_recommendation(&mut self, rec: &Recommendation) -> PlannerResult<()> {
        if !matches!(rec.kind, RecommendationKind::Rebalance | RecommendationKind::Reassign) {
            return Err(rejected(PlannerError::InvalidRequest {
                reason: format!("'{}' has no account moves to apply", rec.id),
            }));
        }
        let (Some(ids), Some(to_rep_id)) = (&rec.account_ids, &rec.to_rep_id) else {
            return Err(rejected(PlannerError::InvalidRequest {
                reason: format!("'{}' names no destination rep", rec.id),
            }));
        };
        if ids.is_empty() {
            return Err(rejected(PlannerError::InvalidRequest { reason: "no accounts to move".into() }));
        }
        let to_rep = self
            .scenario
            .rep(to_rep_id)
            .ok_or_else(|| rejected(PlannerError::RepNotFound { name: to_rep_id.clone() }))?;
        let to_name = to_rep.name.clone();
        if let Some(missing) = ids.iter().find(|id| !self.scenario.accounts.iter().any(|a| &a.id == *id)) {
            return Err(rejected(PlannerError::AccountNotFound { name: missing.clone() }));
        }

        let moved_arr = self.move_accounts(ids, to_rep_id);
        self.commit(format!(
            "Applied '{}': moved {} account(s) ({}) to {to_name}",
            rec.id,
            ids.len(),
            format_money(moved_arr)
        ))
    }
}
