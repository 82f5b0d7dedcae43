//! PRDE: differential-evolution meta-optimizer over a population of PRZI
//! strategy values (spec §4.5). Requires a population of at least four.

use super::przi::{self, PrziLut};
use super::{Strategy, TraderCore};
use crate::error::SimError;
use crate::order::Order;
use crate::rng::SimRng;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Timestamp, TraderId};

pub const WAIT_TIME: f64 = 7200.0;
/// Differential weight.
pub const F: f64 = 0.8;
/// Population diversity floor: below this stddev, one member is replaced
/// outright with a fresh uniform draw (spec §4.5).
pub const STDDEV_FLOOR: f64 = 1e-4;

/// Validates `k >= 4` (spec §7); callers building a `Prde` cohort should
/// invoke this before constructing any trader.
pub fn validate_k(k: usize) -> Result<(), SimError> {
    if k < 4 {
        Err(SimError::PrdeRequiresAtLeastFourStrategies { k })
    } else {
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    EvalS0,
    EvalSNew,
}

pub struct PrdeTrader {
    core: TraderCore,
    pop: Vec<f64>,
    candidate: f64,
    active_index: usize,
    phase: Phase,
    window_start: Timestamp,
    baseline_balance: i64,
    s0_pps: f64,
    ask_scale: f64,
    lut_cache: Option<PrziLut>,
}

impl PrdeTrader {
    pub fn new(tid: TraderId, birthtime: Timestamp, rng: &mut SimRng, k: usize) -> Self {
        let k = k.max(4);
        let pop: Vec<f64> = (0..k).map(|_| rng.uniform_range(-1.0, 1.0)).collect();
        let candidate = Self::propose_candidate(&pop, 0, rng);
        let ask_scale = (rng.uniform_int(1, 10) as f64).sqrt();
        PrdeTrader {
            core: TraderCore::new(tid, "PRDE", birthtime),
            pop,
            candidate,
            active_index: 0,
            phase: Phase::EvalS0,
            window_start: birthtime,
            baseline_balance: 0,
            s0_pps: 0.0,
            ask_scale,
            lut_cache: None,
        }
    }

    pub fn population(&self) -> &[f64] {
        &self.pop
    }

    fn current_s(&self) -> f64 {
        match self.phase {
            Phase::EvalS0 => self.pop[self.active_index],
            Phase::EvalSNew => self.candidate,
        }
    }

    /// `s_new = clip(s1 + F*(s2-s3), +-1)` with `s1,s2,s3` distinct
    /// population members other than `exclude` (spec §4.5).
    fn propose_candidate(pop: &[f64], exclude: usize, rng: &mut SimRng) -> f64 {
        let mut idxs: Vec<usize> = (0..pop.len()).filter(|&i| i != exclude).collect();
        rng.shuffle(&mut idxs);
        if idxs.len() < 3 {
            return rng.uniform_range(-1.0, 1.0);
        }
        let (s1, s2, s3) = (pop[idxs[0]], pop[idxs[1]], pop[idxs[2]]);
        (s1 + F * (s2 - s3)).clamp(-1.0, 1.0)
    }

    fn population_stddev(&self) -> f64 {
        let n = self.pop.len() as f64;
        let mean = self.pop.iter().sum::<f64>() / n;
        let var = self.pop.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        var.sqrt()
    }

    fn tick(&mut self, time: Timestamp, rng: &mut SimRng) {
        let elapsed = time - self.window_start;
        if elapsed < WAIT_TIME {
            return;
        }
        let profit = self.core.balance - self.baseline_balance;
        let pps = profit as f64 / elapsed.max(1e-9);

        match self.phase {
            Phase::EvalS0 => {
                self.s0_pps = pps;
                self.phase = Phase::EvalSNew;
                self.window_start = time;
                self.baseline_balance = self.core.balance;
            }
            Phase::EvalSNew => {
                if pps > self.s0_pps {
                    self.pop[self.active_index] = self.candidate;
                }
                if self.population_stddev() < STDDEV_FLOOR {
                    let i = rng.index(self.pop.len());
                    self.pop[i] = rng.uniform_range(-1.0, 1.0);
                }
                self.active_index = (self.active_index + 1) % self.pop.len();
                self.candidate = Self::propose_candidate(&self.pop, self.active_index, rng);
                self.phase = Phase::EvalS0;
                self.window_start = time;
                self.baseline_balance = self.core.balance;
            }
        }
    }
}

impl Strategy for PrdeTrader {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, lob: &Snapshot, rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let (side, limit) = (a.side, a.limit);
        let s = self.current_s();
        let price = przi::sample_price(&mut self.lut_cache, side, s, limit, lob, self.ask_scale, rng);
        Some(Order::new(self.core.tid.clone(), side, price, time))
    }

    fn respond(&mut self, time: Timestamp, _lob: &Snapshot, _last_trade: Option<&Trade>, rng: &mut SimRng) {
        self.tick(time, rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_populations_smaller_than_four() {
        assert!(matches!(validate_k(3), Err(SimError::PrdeRequiresAtLeastFourStrategies { k: 3 })));
        assert!(validate_k(4).is_ok());
    }

    #[test]
    fn undersized_k_is_clamped_to_four_defensively() {
        let mut rng = SimRng::seeded(1);
        let t = PrdeTrader::new("D0".into(), 0.0, &mut rng, 2);
        assert_eq!(t.population().len(), 4);
    }

    #[test]
    fn eval_s0_then_eval_snew_advances_index() {
        let mut rng = SimRng::seeded(7);
        let mut t = PrdeTrader::new("D0".into(), 0.0, &mut rng, 4);
        let start_index = t.active_index;
        let snap = crate::trader::fixed::tests_support::empty_snapshot();
        t.respond(WAIT_TIME, &snap, None, &mut rng);
        assert_eq!(t.phase, Phase::EvalSNew);
        t.respond(2.0 * WAIT_TIME, &snap, None, &mut rng);
        assert_eq!(t.phase, Phase::EvalS0);
        assert_eq!(t.active_index, (start_index + 1) % 4);
    }

    #[test]
    fn candidate_stays_within_bounds() {
        let mut rng = SimRng::seeded(9);
        let t = PrdeTrader::new("D0".into(), 0.0, &mut rng, 6);
        assert!((-1.0..=1.0).contains(&t.candidate));
    }

    #[test]
    fn candidate_matches_clip_s1_plus_f_times_s2_minus_s3() {
        let pop = vec![-0.9, -0.3, 0.2, 0.8];
        let mut rng = SimRng::seeded(42);
        let candidate = PrdeTrader::propose_candidate(&pop, 0, &mut rng);

        let mut idxs: Vec<usize> = (0..pop.len()).filter(|&i| i != 0).collect();
        let mut replay = SimRng::seeded(42);
        replay.shuffle(&mut idxs);
        let (s1, s2, s3) = (pop[idxs[0]], pop[idxs[1]], pop[idxs[2]]);
        let expected = (s1 + F * (s2 - s3)).clamp(-1.0, 1.0);

        assert!((candidate - expected).abs() < 1e-12, "candidate {candidate} != {expected}");
    }
}
