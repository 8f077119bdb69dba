//! Capacity projection and hiring timeline.
//!
//! The annual levers are compounded into one monthly rate:
//!   monthly_rate = (1 + growth + expansion − churn)^(1/12) − 1
//!
//! RULE: net growth ≤ 0 gives a flat or shrinking projection, never an
//! error. Only out-of-range levers are rejected.

use crate::{
    config::PlannerConfig,
    error::{PlannerError, PlannerResult},
    metrics::{mean, ratio, CapacityMetrics},
    types::{Money, Percent},
};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Levers ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthScenario {
    Conservative,
    Expected,
    Aggressive,
}

impl GrowthScenario {
    pub fn new_logo_growth(&self) -> f64 {
        match self {
            Self::Conservative => 0.10,
            Self::Expected => 0.20,
            Self::Aggressive => 0.35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    pub new_logo_growth:         f64,
    pub expansion_rate:          f64,
    pub churn_rate:              f64,
    pub hiring_lead_time_days:   u32,
    pub ramp_time_days:          u32,
    pub target_capacity_percent: Percent,
    pub projection_months:       u32,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            new_logo_growth:         0.15,
            expansion_rate:          0.10,
            churn_rate:              0.05,
            hiring_lead_time_days:   45,
            ramp_time_days:          90,
            target_capacity_percent: 85.0,
            projection_months:       12,
        }
    }
}

impl ProjectionConfig {
    /// Same levers with new-logo growth taken from a preset.
    pub fn for_scenario(&self, scenario: GrowthScenario) -> Self {
        Self {
            new_logo_growth: scenario.new_logo_growth(),
            ..self.clone()
        }
    }

    pub fn annual_net_growth(&self) -> f64 {
        self.new_logo_growth + self.expansion_rate - self.churn_rate
    }

    pub fn monthly_rate(&self) -> f64 {
        (1.0 + self.annual_net_growth()).max(0.0).powf(1.0 / 12.0) - 1.0
    }

    pub fn validate(&self) -> PlannerResult<()> {
        for (name, value) in [
            ("new_logo_growth", self.new_logo_growth),
            ("expansion_rate", self.expansion_rate),
            ("churn_rate", self.churn_rate),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PlannerError::invalid_parameter(name, value, "rate must be within [0, 1]"));
            }
        }
        if !self.target_capacity_percent.is_finite() || self.target_capacity_percent <= 0.0 {
            return Err(PlannerError::invalid_parameter(
                "target_capacity_percent",
                self.target_capacity_percent,
                "must be positive",
            ));
        }
        if self.projection_months == 0 {
            return Err(PlannerError::invalid_parameter(
                "projection_months",
                0.0,
                "must project at least one month",
            ));
        }
        Ok(())
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentState {
    pub team_size:    usize,
    pub total_arr:    Money,
    pub avg_capacity: Percent,
    /// ARR the team can still absorb before hitting the target capacity.
    pub headroom_arr: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyProjection {
    pub month:            u32,
    pub label:            String,
    pub arr:              Money,
    pub expansion:        Money,
    pub churn:            Money,
    pub capacity:         Percent,
    pub is_over_capacity: bool,
    pub is_critical:      bool,
    pub hire_triggered:   bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedState {
    pub total_arr:          Money,
    pub projected_capacity: Percent,
    pub required_headcount: u32,
    pub hiring_need:        u32,
    pub expected_expansion: Money,
    pub expected_churn:     Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapacityRunway {
    /// Months until the team crosses the target. 0 means already over.
    Within { months: u32 },
    /// Still under target at the end of the horizon.
    Beyond { horizon: u32 },
}

impl fmt::Display for CapacityRunway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Within { months: 1 } => f.write_str("1 month"),
            Self::Within { months } => write!(f, "{months} months"),
            Self::Beyond { horizon } => write!(f, "{horizon}+ months"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    NoAction,
    OpenRequisition,
    HireStart,
    FullyRamped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Urgent,
    Planned,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub date:    NaiveDate,
    pub kind:    TimelineEventKind,
    pub action:  String,
    pub reason:  String,
    pub urgency: Urgency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projections {
    pub config:              ProjectionConfig,
    pub current:             CurrentState,
    pub monthly_projections: Vec<MonthlyProjection>,
    pub projected:           ProjectedState,
    pub capacity_runway:     CapacityRunway,
    pub timeline:            Vec<TimelineEvent>,
}

// ── Engine ───────────────────────────────────────────────────────────────────

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

fn sub_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

pub fn calculate_projections(
    metrics:    &[CapacityMetrics],
    config:     &PlannerConfig,
    projection: &ProjectionConfig,
    as_of:      NaiveDate,
) -> PlannerResult<Projections> {
    projection.validate()?;

    let target = projection.target_capacity_percent;
    let critical = config.thresholds.critical_capacity;

    // ── 1. Current state ────────────────────────────────────────────
    let team_size = metrics.len();
    let total_arr: Money = metrics.iter().map(|m| m.total_arr).sum();
    let capacities: Vec<f64> = metrics.iter().map(|m| m.capacity_score).collect();
    let avg_capacity = mean(&capacities);
    let ideals: Vec<f64> = metrics
        .iter()
        .map(|m| config.benchmark(m.segment).arr_per_rep.ideal)
        .collect();
    let absorbable: Money = ideals.iter().map(|ideal| ideal * target / 100.0).sum();

    let current = CurrentState {
        team_size,
        total_arr,
        avg_capacity,
        headroom_arr: (absorbable - total_arr).max(0.0),
    };

    // ── 2. Month-by-month compounding ───────────────────────────────
    let rate = projection.monthly_rate();
    let monthly_churn = projection.churn_rate / 12.0;
    let horizon = projection.projection_months;

    let mut monthly_projections = Vec::with_capacity(horizon as usize);
    let mut arr = total_arr;
    let mut expected_expansion = 0.0;
    let mut expected_churn = 0.0;
    let mut first_over: Option<u32> = None;

    for month in 1..=horizon {
        let delta = arr * rate;
        // Gross flows: churn never drops below the churn lever.
        let expansion = (arr * (rate + monthly_churn)).max(0.0);
        let churn = expansion - delta;
        arr += delta;

        let capacity = if total_arr > 0.0 { avg_capacity * arr / total_arr } else { avg_capacity };
        let is_over_capacity = capacity > target;
        let hire_triggered = is_over_capacity && first_over.is_none();
        if hire_triggered {
            first_over = Some(month);
        }

        expected_expansion += expansion;
        expected_churn += churn;

        monthly_projections.push(MonthlyProjection {
            month,
            label: add_months(as_of, month).format("%b %Y").to_string(),
            arr,
            expansion,
            churn,
            capacity,
            is_over_capacity,
            is_critical: capacity > critical,
            hire_triggered,
        });
    }

    // ── 3. Headcount ────────────────────────────────────────────────
    let blended_ideal = if ideals.is_empty() {
        config.benchmark(Default::default()).arr_per_rep.ideal
    } else {
        mean(&ideals)
    };
    let required_headcount = if arr > 0.0 { ratio(arr, blended_ideal).ceil().max(1.0) as u32 } else { 0 };
    let hiring_need = required_headcount.saturating_sub(team_size as u32);
    let projected_capacity = monthly_projections.last().map(|p| p.capacity).unwrap_or(avg_capacity);

    let projected = ProjectedState {
        total_arr: arr,
        projected_capacity,
        required_headcount,
        hiring_need,
        expected_expansion,
        expected_churn,
    };

    // ── 4. Runway ───────────────────────────────────────────────────
    let capacity_runway = if team_size > 0 && avg_capacity > target {
        CapacityRunway::Within { months: 0 }
    } else {
        match first_over {
            Some(months) => CapacityRunway::Within { months },
            None => CapacityRunway::Beyond { horizon },
        }
    };

    // ── 5. Hiring timeline ──────────────────────────────────────────
    let anchor_months = match capacity_runway {
        CapacityRunway::Within { months } => Some(months),
        CapacityRunway::Beyond { .. } if hiring_need > 0 => Some(horizon),
        CapacityRunway::Beyond { .. } => None,
    };
    let timeline = hiring_timeline(anchor_months, hiring_need, &current, projection, as_of);

    log::debug!(
        "projection: arr {:.0} -> {:.0}, runway {capacity_runway}, hiring_need {hiring_need}",
        total_arr, arr
    );

    Ok(Projections {
        config: projection.clone(),
        current,
        monthly_projections,
        projected,
        capacity_runway,
        timeline,
    })
}

fn hiring_timeline(
    anchor_months: Option<u32>,
    hiring_need:   u32,
    current:       &CurrentState,
    projection:    &ProjectionConfig,
    as_of:         NaiveDate,
) -> Vec<TimelineEvent> {
    let target = projection.target_capacity_percent;

    let Some(anchor_months) = anchor_months else {
        return vec![TimelineEvent {
            date: as_of,
            kind: TimelineEventKind::NoAction,
            action: "No immediate hiring needed".into(),
            reason: format!(
                "Team capacity at {:.0}%, stays below {target:.0}% over the projection",
                current.avg_capacity
            ),
            urgency: Urgency::Info,
        }];
    };

    let lead = u64::from(projection.hiring_lead_time_days);
    let ramp = u64::from(projection.ramp_time_days);
    let anchor = add_months(as_of, anchor_months);

    let ideal_requisition = sub_days(anchor, lead + ramp);
    let late = ideal_requisition < as_of;
    let requisition = ideal_requisition.max(as_of);

    let mut events = vec![TimelineEvent {
        date: requisition,
        kind: TimelineEventKind::OpenRequisition,
        action: "Open requisition".into(),
        reason: if late {
            format!("Capacity crosses {target:.0}% before a new hire can be fully ramped")
        } else {
            format!("Allows {lead} days to hire and {ramp} days to ramp before capacity crosses {target:.0}%")
        },
        urgency: if late { Urgency::Urgent } else { Urgency::Planned },
    }];

    let hires = hiring_need.max(1);
    for i in 0..hires {
        let seat = current.team_size as u32 + i + 1;
        let start = add_days(requisition, lead + 30 * u64::from(i));
        events.push(TimelineEvent {
            date: start,
            kind: TimelineEventKind::HireStart,
            action: format!("Hire #{seat} starts"),
            reason: match (i, hiring_need) {
                // Headcount covers projected ARR at full load; the hire
                // exists only to bring the team back under the target.
                (0, 0) => format!(
                    "Capacity crosses the {target:.0}% target; projected ARR alone does not require a new seat"
                ),
                (0, _) => "Capacity threshold approaching".into(),
                _ => "Continued growth".into(),
            },
            urgency: if late && i == 0 { Urgency::Urgent } else { Urgency::Planned },
        });
        events.push(TimelineEvent {
            date: add_days(start, ramp),
            kind: TimelineEventKind::FullyRamped,
            action: format!("Hire #{seat} fully ramped"),
            reason: format!("{ramp}-day ramp complete"),
            urgency: Urgency::Planned,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monthly_rate_compounds_to_annual_net() {
        let p = ProjectionConfig::default();
        let annual = (1.0 + p.monthly_rate()).powi(12) - 1.0;

        assert!((annual - p.annual_net_growth()).abs() < 1e-9);
    }

    #[test]
    fn runway_renders_horizon_with_plus() {
        assert_eq!(CapacityRunway::Beyond { horizon: 12 }.to_string(), "12+ months");
        assert_eq!(CapacityRunway::Within { months: 1 }.to_string(), "1 month");
    }
}
