//! PRZI: a strategy value `s in [-1, 1]` parameterising a skewed discrete
//! distribution over the feasible price interval (spec §4.5).
//!
//! The CDF construction and interval logic here are shared by the plain
//! `PrziTrader` and by the `PRSH`/`PRDE` meta-optimizers (`prsh.rs`,
//! `prde.rs`), which each drive a population of these strategy values and
//! only need the sampling primitive, not a whole `Trader`.

use super::{Strategy, TraderCore};
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Price, Timestamp, TraderId};

/// `c = clip(m * tan(pi*(s+0.5)), +-theta0)`, nudged away from zero.
fn clip_bound(s: f64) -> f64 {
    const M: f64 = 4.0;
    const THETA0: f64 = 100.0;
    let raw = M * (std::f64::consts::PI * (s + 0.5)).tan();
    let c = raw.clamp(-THETA0, THETA0);
    if c.abs() < 1e-6 {
        if c >= 0.0 { 1e-6 } else { -1e-6 }
    } else {
        c
    }
}

/// Inverse-CDF-sampleable lookup table for one `(s, p_min, p_max, side)`
/// tuple (spec §4.5 steps 1-3).
#[derive(Clone, Debug, PartialEq)]
pub struct PrziLut {
    pub s: f64,
    pub p_min: i32,
    pub p_max: i32,
    pub side: Side,
    /// Cumulative probability per price, ascending from `p_min`.
    pub cdf: Vec<f64>,
}

impl PrziLut {
    pub fn build(side: Side, s: f64, p_min: i32, p_max: i32) -> Self {
        let (p_min, p_max) = if p_min <= p_max { (p_min, p_max) } else { (p_max, p_min) };
        let n = (p_max - p_min + 1) as usize;
        let range = (p_max - p_min) as f64;

        let mut weights = vec![0.0_f64; n];
        if s.abs() < f64::EPSILON {
            for w in weights.iter_mut() {
                *w = 1.0 / (range + 1.0);
            }
        } else {
            let c = clip_bound(s);
            let d = c.exp() - 1.0;
            for (idx, weight) in weights.iter_mut().enumerate() {
                let p = p_min + idx as i32;
                let r = if range > 0.0 { (p - p_min) as f64 / range } else { 0.0 };
                let base = match side {
                    Side::Bid => ((c * r).exp() - 1.0) / d,
                    Side::Ask => ((c * (1.0 - r)).exp() - 1.0) / d,
                };
                *weight = if s > 0.0 { base } else { 1.0 - base }.max(0.0);
            }
        }

        let total: f64 = weights.iter().sum();
        let total = if total > 0.0 { total } else { 1.0 };
        let mut cdf = vec![0.0_f64; n];
        let mut acc = 0.0;
        for (idx, weight) in weights.iter().enumerate() {
            acc += weight / total;
            cdf[idx] = acc;
        }
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }

        PrziLut { s, p_min, p_max, side, cdf }
    }

    /// Inverse-CDF sample given `u ~ U(0,1)`.
    pub fn sample(&self, u: f64) -> Price {
        let idx = self.cdf.iter().position(|&c| c >= u).unwrap_or(self.cdf.len() - 1);
        Price(self.p_min + idx as i32)
    }

    fn matches(&self, side: Side, s: f64, p_min: i32, p_max: i32) -> bool {
        self.side == side && (self.s - s).abs() < f64::EPSILON && self.p_min == p_min && self.p_max == p_max
    }
}

/// What SHVR would quote right now: used as the conservative endpoint of
/// the PRZI interval construction (spec §4.5).
fn shvr_reference(side: Side, limit: Price, lob: &Snapshot) -> Price {
    crate::trader::fixed::shvr_reference_price(side, limit, lob)
}

/// Builds the feasible `[p_min, p_max]` interval for strategy value `s`
/// (spec §4.5): aggressive (`s>0`) uses the full range to the book's
/// worst price; conservative (`s<0`) interpolates toward the SHVR price.
/// `ask_scale` is the trader's fixed `c_i = sqrt(U{1..10})` used to
/// estimate an individual ceiling for ask quotes.
pub fn interval(side: Side, s: f64, limit: Price, lob: &Snapshot, ask_scale: f64) -> (i32, i32) {
    match side {
        Side::Bid => {
            let p_max = limit.0;
            let worst_bid = lob.bids.worst.0;
            let p_min = if s > 0.0 {
                worst_bid
            } else {
                let p_shvr = shvr_reference(Side::Bid, limit, lob).0;
                (-s * p_shvr as f64 + (1.0 + s) * worst_bid as f64).round() as i32
            };
            (p_min.min(p_max), p_max)
        }
        Side::Ask => {
            let p_min = limit.0;
            let individual_max = (limit.0 as f64 * ask_scale).max(
                lob.sess_hi.map(|p| p.0 as f64).unwrap_or(limit.0 as f64),
            ) as i32;
            let p_max = if s > 0.0 {
                individual_max
            } else {
                let p_shvr = shvr_reference(Side::Ask, limit, lob).0;
                (-s * p_shvr as f64 + (1.0 + s) * individual_max as f64).round() as i32
            };
            (p_min, p_max.max(p_min))
        }
    }
}

/// Samples a quote price for strategy value `s`, memoizing the LUT in
/// `cache` until `(s, p_min, p_max, side)` changes (spec §4.5).
pub fn sample_price(
    cache: &mut Option<PrziLut>,
    side: Side,
    s: f64,
    limit: Price,
    lob: &Snapshot,
    ask_scale: f64,
    rng: &mut SimRng,
) -> Price {
    let (p_min, p_max) = interval(side, s, limit, lob, ask_scale);
    let needs_rebuild = match cache {
        Some(lut) => !lut.matches(side, s, p_min, p_max),
        None => true,
    };
    if needs_rebuild {
        *cache = Some(PrziLut::build(side, s, p_min, p_max));
    }
    let u = rng.uniform01();
    cache.as_ref().unwrap().sample(u)
}

/// Plain (non-adaptive) PRZI trader: a single fixed strategy value drawn
/// once at construction.
pub struct PrziTrader {
    core: TraderCore,
    pub s: f64,
    ask_scale: f64,
    lut_cache: Option<PrziLut>,
}

impl PrziTrader {
    pub fn new(tid: TraderId, birthtime: Timestamp, rng: &mut SimRng) -> Self {
        let s = rng.uniform_range(-1.0, 1.0);
        let ask_scale = (rng.uniform_int(1, 10) as f64).sqrt();
        PrziTrader { core: TraderCore::new(tid, "PRZI", birthtime), s, ask_scale, lut_cache: None }
    }
}

impl Strategy for PrziTrader {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, lob: &Snapshot, rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let (side, limit) = (a.side, a.limit);
        let price = sample_price(&mut self.lut_cache, side, self.s, limit, lob, self.ask_scale, rng);
        Some(Order::new(self.core.tid.clone(), side, price, time))
    }

    fn respond(&mut self, _time: Timestamp, _lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cdf_last_entry_is_one() {
        for s in [-0.9, -0.3, 0.0, 0.2, 0.8] {
            let lut = PrziLut::build(Side::Bid, s, 1, 100);
            assert!((lut.cdf.last().unwrap() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn cdf_is_nondecreasing() {
        let lut = PrziLut::build(Side::Ask, 0.6, 50, 150);
        for w in lut.cdf.windows(2) {
            assert!(w[1] >= w[0] - 1e-12);
        }
    }

    #[test]
    fn sample_stays_within_interval() {
        let lut = PrziLut::build(Side::Bid, 0.5, 10, 20);
        for i in 0..=10 {
            let p = lut.sample(i as f64 / 10.0);
            assert!((10..=20).contains(&p.0));
        }
    }

    #[test]
    fn zero_strategy_is_uniform_weights() {
        let lut = PrziLut::build(Side::Bid, 0.0, 1, 5);
        let mut prev = 0.0;
        let step = lut.cdf[0];
        for c in &lut.cdf {
            assert!((c - prev - step).abs() < 1e-9);
            prev = *c;
        }
    }

    #[test]
    fn memoized_lut_rebuilds_only_on_tuple_change() {
        let mut cache: Option<PrziLut> = None;
        let snap = crate::trader::fixed::tests_support::empty_snapshot();
        let mut rng = SimRng::seeded(1);
        let _ = sample_price(&mut cache, Side::Bid, 0.2, Price(100), &snap, 2.0, &mut rng);
        let first = cache.clone();
        let _ = sample_price(&mut cache, Side::Bid, 0.2, Price(100), &snap, 2.0, &mut rng);
        assert_eq!(cache, first);
    }
}
