//! Team-versus-benchmark comparison for one segment.

use crate::{
    config::PlannerConfig,
    metrics::{ratio, TeamSummary},
    model::Segment,
    types::Percent,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    Under,
    Good,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BenchmarkTarget {
    Range { min: f64, max: f64 },
    Ceiling { max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub your_value: f64,
    pub target:     BenchmarkTarget,
    /// Bar fill, 0..=100.
    pub percentage: Percent,
    pub status:     BenchmarkStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    pub segment:          Segment,
    pub accounts_per_rep: MetricComparison,
    pub arr_per_rep:      MetricComparison,
    pub capacity:         MetricComparison,
    pub at_risk:          MetricComparison,
}

fn against_range(value: f64, min: f64, max: f64) -> MetricComparison {
    let status = if value < min {
        BenchmarkStatus::Under
    } else if value > max {
        BenchmarkStatus::Over
    } else {
        BenchmarkStatus::Good
    };
    MetricComparison {
        your_value: value,
        target: BenchmarkTarget::Range { min, max },
        percentage: (ratio(value, max) * 100.0).min(100.0),
        status,
    }
}

fn against_ceiling(value: f64, max: f64, bar_fill: f64) -> MetricComparison {
    MetricComparison {
        your_value: value,
        target: BenchmarkTarget::Ceiling { max },
        percentage: bar_fill.clamp(0.0, 100.0),
        status: if value > max { BenchmarkStatus::Over } else { BenchmarkStatus::Good },
    }
}

pub fn benchmark_comparison(summary: &TeamSummary, segment: Segment, config: &PlannerConfig) -> BenchmarkComparison {
    let bench = config.benchmark(segment);
    let ceiling = config.thresholds.risk_bar_ceiling;

    BenchmarkComparison {
        segment,
        accounts_per_rep: against_range(
            summary.avg_accounts_per_rep,
            bench.accounts_per_rep.min,
            bench.accounts_per_rep.max,
        ),
        arr_per_rep: against_range(summary.avg_arr_per_rep, bench.arr_per_rep.min, bench.arr_per_rep.max),
        capacity: against_ceiling(summary.avg_capacity, bench.healthy_capacity, summary.avg_capacity),
        at_risk: against_ceiling(
            summary.at_risk_percent,
            bench.at_risk_threshold,
            ratio(summary.at_risk_percent, ceiling) * 100.0,
        ),
    }
}

/// The segment most reps sit in. Mid-Market for an empty team and
/// whenever it ties for the lead; other ties follow `Segment::ALL`.
pub fn dominant_segment(segments: impl Iterator<Item = Segment>) -> Segment {
    let mut counts = [0usize; 3];
    for segment in segments {
        if let Some(i) = Segment::ALL.iter().position(|s| *s == segment) {
            counts[i] += 1;
        }
    }
    let count_of = |segment: Segment| {
        Segment::ALL
            .iter()
            .position(|s| *s == segment)
            .map_or(0, |i| counts[i])
    };
    let best = counts.iter().copied().max().unwrap_or(0);
    if best == 0 || count_of(Segment::default()) == best {
        return Segment::default();
    }
    Segment::ALL
        .iter()
        .copied()
        .find(|s| count_of(*s) == best)
        .unwrap_or_default()
}
