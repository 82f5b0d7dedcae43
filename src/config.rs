//! Session configuration.
//!
//! `SimConfig` is constructible directly in code; with the `serde`
//! feature it can also round-trip through JSON, mirroring this crate's
//! `#[cfg_attr(feature = "serde", derive(...))]` convention. Schedules
//! built with dynamic offset closures (`schedule::Offset::Shared` /
//! `MinMax`) cannot be deserialized — only schedules built from
//! `PriceRange::fixed` ranges round-trip; this is a property of the
//! `Offset` type, not a limitation worth hiding behind a runtime error.

use crate::schedule::Schedule;
use crate::types::TraderId;

/// Which concrete strategy a population blueprint instantiates, with the
/// handful of parameters each needs beyond defaults (spec §4.4-4.7).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TraderBlueprint {
    Gvwy,
    Zic,
    Shvr,
    Snpr,
    NoisyZic { sigma: f64 },
    Przi,
    Prsh { k: usize },
    /// Requires `k >= 4` (spec §7).
    Prde { k: usize },
    Zip,
    Zipsh { k: usize },
    Zipde { k: usize },
    Pt1,
    Pt2,
    TrendFollower,
    MeanReverter,
    RlAgent,
}

/// One population cohort: `count` traders named `"{prefix}{:02}"`, all of
/// `kind`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cohort {
    pub prefix: String,
    pub count: usize,
    pub kind: TraderBlueprint,
}

impl Cohort {
    /// Expands this cohort into its trader ids, e.g. `"ZIC00", "ZIC01"`.
    pub fn trader_ids(&self) -> Vec<TraderId> {
        (0..self.count).map(|i| format!("{}{:02}", self.prefix, i)).collect()
    }
}

/// Full configuration for one session.
#[derive(Clone, Debug)]
pub struct SimConfig {
    pub endtime: f64,
    pub seed: u64,
    pub buyers: Vec<Cohort>,
    pub sellers: Vec<Cohort>,
    pub demand: Schedule,
    pub supply: Schedule,
    pub shuffle_times: bool,
    pub replenish_interval: f64,
}

impl SimConfig {
    pub fn total_traders(&self) -> usize {
        self.buyers.iter().map(|c| c.count).sum::<usize>()
            + self.sellers.iter().map(|c| c.count).sum::<usize>()
    }
}
