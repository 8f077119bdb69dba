//! Deterministic random number generation.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through ScenarioRng instances derived
//! from the planner's master seed.
//!
//! Each consumer gets its own stream, seeded from
//! (master_seed XOR slot_index * golden-ratio constant), so adding a
//! new consumer never changes an existing consumer's stream.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG stream.
#[derive(Clone)]
pub struct ScenarioRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl ScenarioRng {
    /// Create a stream from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Pick `k` indices from `weights` without replacement, each draw
    /// proportional to its weight (Efraimidis–Spirakis keys, in log
    /// space so tiny weights cannot underflow).
    /// Zero-weight entries are only picked once every positive weight
    /// is exhausted, lowest index first. Returned indices are sorted.
    pub fn weighted_sample(&mut self, weights: &[f64], k: usize) -> Vec<usize> {
        let mut keyed: Vec<(f64, usize)> = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                // Draw for every entry so the stream position does not
                // depend on which weights happen to be zero.
                let u = self.next_f64().max(1e-12);
                let key = if w > 0.0 { u.ln() / w } else { f64::NEG_INFINITY };
                (key, i)
            })
            .collect();

        keyed.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let mut picked: Vec<usize> = keyed.into_iter().take(k).map(|(_, i)| i).collect();
        picked.sort_unstable();
        picked
    }
}

/// Source of every RNG stream for one planner, indexed by stable slot.
#[derive(Debug, Clone, Copy)]
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_slot(&self, slot: RngSlot) -> ScenarioRng {
        ScenarioRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries. Only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum RngSlot {
    Churn = 0,
}

impl RngSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Churn => "churn",
        }
    }
}
