use crate::{
    model::Segment,
    projection::ProjectionConfig,
    types::{Money, Percent},
};
use serde::{Deserialize, Serialize};

// ── Segment benchmarks ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRange {
    pub min:   f64,
    pub max:   f64,
    pub ideal: f64,
}

impl TargetRange {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBenchmark {
    pub segment:          Segment,
    pub accounts_per_rep: TargetRange,
    pub arr_per_rep:      TargetRange,
    /// Average capacity above this is flagged against the benchmark.
    pub healthy_capacity: Percent,
    /// At-risk ARR as a share of the book, in percent.
    pub at_risk_threshold: Percent,
}

/// One benchmark per segment. Lookup is total: every segment has one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    pub smb:        SegmentBenchmark,
    pub mid_market: SegmentBenchmark,
    pub enterprise: SegmentBenchmark,
}

impl Benchmarks {
    pub fn get(&self, segment: Segment) -> &SegmentBenchmark {
        match segment {
            Segment::Smb => &self.smb,
            Segment::MidMarket => &self.mid_market,
            Segment::Enterprise => &self.enterprise,
        }
    }

    pub fn get_mut(&mut self, segment: Segment) -> &mut SegmentBenchmark {
        match segment {
            Segment::Smb => &mut self.smb,
            Segment::MidMarket => &mut self.mid_market,
            Segment::Enterprise => &mut self.enterprise,
        }
    }

    fn from_list(list: Vec<SegmentBenchmark>) -> anyhow::Result<Self> {
        let pick = |segment: Segment| {
            list.iter()
                .find(|b| b.segment == segment)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("No benchmark for segment {segment}"))
        };
        Ok(Self {
            smb:        pick(Segment::Smb)?,
            mid_market: pick(Segment::MidMarket)?,
            enterprise: pick(Segment::Enterprise)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SegmentBenchmarksFile {
    benchmarks: Vec<SegmentBenchmark>,
}

// ── Thresholds ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Below this a rep has healthy headroom; up to 100 is "watch".
    pub capacity_threshold: Percent,
    /// Above this a rep (or the team) is critically overloaded.
    pub critical_capacity: Percent,
    pub excellent_fit_below: Percent,
    pub good_fit_below: Percent,
    /// Accounts with churn risk strictly above this count as at risk.
    pub risk_cutoff: f64,
    /// Imbalance contributors sit more than this many σ from the mean.
    pub outlier_sigma: f64,
    pub critical_at_risk_arr: Money,
    pub warning_at_risk_arr: Money,
    /// At-risk share of a rep's ARR that counts as concentrated.
    pub risk_concentration_share: f64,
    pub max_accounts_per_move: usize,
    pub max_recommendations: usize,
    pub candidates_per_account: usize,
    /// At-risk percentage that fills the benchmark bar.
    pub risk_bar_ceiling: Percent,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            capacity_threshold:       85.0,
            critical_capacity:        110.0,
            excellent_fit_below:      70.0,
            good_fit_below:           90.0,
            risk_cutoff:              0.25,
            outlier_sigma:            1.0,
            critical_at_risk_arr:     400_000.0,
            warning_at_risk_arr:      200_000.0,
            risk_concentration_share: 0.20,
            max_accounts_per_move:    3,
            max_recommendations:      5,
            candidates_per_account:   3,
            risk_bar_ceiling:         25.0,
        }
    }
}

/// Starting values for accounts committed from the pending queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccountDefaults {
    pub health_score:    f64,
    pub churn_risk:      f64,
    pub lifecycle_stage: String,
    /// TAM assumed for a pending account entered without one.
    pub tam_multiple:    f64,
}

impl Default for NewAccountDefaults {
    fn default() -> Self {
        Self {
            health_score:    80.0,
            churn_risk:      0.05,
            lifecycle_stage: "Onboarding".into(),
            tam_multiple:    3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ThresholdsFile {
    thresholds:   Thresholds,
    new_accounts: NewAccountDefaults,
}

// ── Planner config ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub benchmarks:   Benchmarks,
    pub thresholds:   Thresholds,
    pub new_accounts: NewAccountDefaults,
    pub projection:   ProjectionConfig,
}

impl PlannerConfig {
    /// Load from the data/ directory.
    /// In tests, use PlannerConfig::default().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let bench_path = format!("{data_dir}/benchmarks/segment_benchmarks.json");
        let bench_content = std::fs::read_to_string(&bench_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {bench_path}: {e}"))?;
        let bench_file: SegmentBenchmarksFile = serde_json::from_str(&bench_content)?;
        let benchmarks = Benchmarks::from_list(bench_file.benchmarks)?;

        let thresholds_path = format!("{data_dir}/planner/thresholds.json");
        let thresholds_content = std::fs::read_to_string(&thresholds_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {thresholds_path}: {e}"))?;
        let thresholds_file: ThresholdsFile = serde_json::from_str(&thresholds_content)?;

        let projection_path = format!("{data_dir}/planner/projection_defaults.json");
        let projection_content = std::fs::read_to_string(&projection_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {projection_path}: {e}"))?;
        let projection: ProjectionConfig = serde_json::from_str(&projection_content)?;

        let config = Self {
            benchmarks,
            thresholds: thresholds_file.thresholds,
            new_accounts: thresholds_file.new_accounts,
            projection,
        };
        config.validate()?;

        log::info!("Loaded planner config from {data_dir}");
        Ok(config)
    }

    pub fn benchmark(&self, segment: Segment) -> &SegmentBenchmark {
        self.benchmarks.get(segment)
    }

    /// Replace one segment's ARR-per-rep target, keeping the range
    /// centred on it. Handy for what-if benchmark tuning.
    pub fn with_arr_per_rep(mut self, segment: Segment, ideal: Money) -> Self {
        let bench = self.benchmarks.get_mut(segment);
        bench.arr_per_rep = TargetRange {
            min: ideal * 0.75,
            max: ideal * 1.25,
            ideal,
        };
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for segment in Segment::ALL {
            let b = self.benchmark(segment);
            for (label, range) in [("accounts_per_rep", &b.accounts_per_rep), ("arr_per_rep", &b.arr_per_rep)] {
                if range.ideal <= 0.0 || range.max <= 0.0 {
                    anyhow::bail!("{segment} {label} targets must be positive");
                }
                if range.min > range.max {
                    anyhow::bail!("{segment} {label} range is inverted ({} > {})", range.min, range.max);
                }
            }
        }

        let t = &self.thresholds;
        if !(0.0..=1.0).contains(&t.risk_cutoff) {
            anyhow::bail!("risk_cutoff must be within [0, 1], got {}", t.risk_cutoff);
        }
        if t.capacity_threshold <= 0.0 || t.critical_capacity < t.capacity_threshold {
            anyhow::bail!(
                "capacity bands must satisfy 0 < capacity_threshold <= critical_capacity ({} / {})",
                t.capacity_threshold, t.critical_capacity
            );
        }
        if t.excellent_fit_below > t.good_fit_below {
            anyhow::bail!("excellent_fit_below must not exceed good_fit_below");
        }

        self.projection.validate().map_err(|e| anyhow::anyhow!(e.to_string()))?;
        Ok(())
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            benchmarks: Benchmarks {
                smb: SegmentBenchmark {
                    segment:           Segment::Smb,
                    accounts_per_rep:  TargetRange { min: 50.0, max: 75.0, ideal: 60.0 },
                    arr_per_rep:       TargetRange { min: 1_000_000.0, max: 2_000_000.0, ideal: 1_500_000.0 },
                    healthy_capacity:  85.0,
                    at_risk_threshold: 15.0,
                },
                mid_market: SegmentBenchmark {
                    segment:           Segment::MidMarket,
                    accounts_per_rep:  TargetRange { min: 25.0, max: 40.0, ideal: 32.0 },
                    arr_per_rep:       TargetRange { min: 2_000_000.0, max: 4_000_000.0, ideal: 3_000_000.0 },
                    healthy_capacity:  80.0,
                    at_risk_threshold: 12.0,
                },
                enterprise: SegmentBenchmark {
                    segment:           Segment::Enterprise,
                    accounts_per_rep:  TargetRange { min: 8.0, max: 15.0, ideal: 12.0 },
                    arr_per_rep:       TargetRange { min: 5_000_000.0, max: 10_000_000.0, ideal: 7_000_000.0 },
                    healthy_capacity:  75.0,
                    at_risk_threshold: 10.0,
                },
            },
            thresholds:   Thresholds::default(),
            new_accounts: NewAccountDefaults::default(),
            projection:   ProjectionConfig::default(),
        }
    }
}
