//! Fixed (non-adaptive) strategies: GVWY, ZIC, SHVR, SNPR, Noisy-ZIC
//! (spec §4.4).

use super::{Strategy, TraderCore};
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Price, Timestamp, TraderId};

/// Builds the quote order for `core`'s pending assignment at `price`, or
/// `None` if there is nothing to quote.
fn quote(core: &TraderCore, time: Timestamp, price: Price) -> Order {
    let side = core.assignment.as_ref().expect("quote requires a pending assignment").side;
    Order::new(core.tid.clone(), side, price, time)
}

/// SHVR's improve-by-one-tick rule, shared with SNPR (spec §4.4): beat
/// the current best by `ticks`, clipped so as never to cross the
/// trader's own limit; if the side is empty, post a stub at the
/// worst-price sentinel.
fn shave_price(side: Side, limit: Price, lob: &Snapshot, ticks: i32) -> Price {
    match side {
        Side::Bid => match lob.bids.best {
            Some(best) => Price::clamp((best.0 + ticks).min(limit.0)),
            None => lob.bids.worst,
        },
        Side::Ask => match lob.asks.best {
            Some(best) => Price::clamp((best.0 - ticks).max(limit.0)),
            None => lob.asks.worst,
        },
    }
}

/// Public entry point for other strategy modules (PRZI's interval
/// construction, spec §4.5) that need "what would SHVR quote here".
pub fn shvr_reference_price(side: Side, limit: Price, lob: &Snapshot) -> Price {
    shave_price(side, limit, lob, 1)
}

/// Always quotes at its own assignment limit.
pub struct Gvwy {
    core: TraderCore,
}

impl Gvwy {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        Gvwy { core: TraderCore::new(tid, "GVWY", birthtime) }
    }
}

impl Strategy for Gvwy {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        let limit = self.core.assignment.as_ref()?.limit;
        Some(quote(&self.core, time, limit))
    }

    fn respond(&mut self, _time: Timestamp, _lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {}
}

/// Zero-Intelligence-Constrained: draws a uniformly random feasible price.
pub struct Zic {
    core: TraderCore,
}

impl Zic {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        Zic { core: TraderCore::new(tid, "ZIC", birthtime) }
    }
}

/// Draws ZIC's uniform price within the feasible interval bounded by
/// `limit` and the book's current worst price on that side.
pub fn zic_price(side: Side, limit: Price, lob: &Snapshot, rng: &mut SimRng) -> Price {
    let worst = match side {
        Side::Bid => lob.bids.worst,
        Side::Ask => lob.asks.worst,
    };
    let lo = worst.0.min(limit.0);
    let hi = worst.0.max(limit.0);
    Price::clamp(rng.uniform_int(lo, hi))
}

impl Strategy for Zic {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, lob: &Snapshot, rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let price = zic_price(a.side, a.limit, lob, rng);
        Some(quote(&self.core, time, price))
    }

    fn respond(&mut self, _time: Timestamp, _lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {}
}

/// Shaver: always posts one tick better than the current best.
pub struct Shvr {
    core: TraderCore,
}

impl Shvr {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        Shvr { core: TraderCore::new(tid, "SHVR", birthtime) }
    }
}

impl Strategy for Shvr {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let price = shave_price(a.side, a.limit, lob, 1);
        Some(quote(&self.core, time, price))
    }

    fn respond(&mut self, _time: Timestamp, _lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {}
}

/// Sniper: dormant until near the assignment deadline, then shaves by a
/// growing number of ticks (spec §4.4).
pub struct Snpr {
    core: TraderCore,
}

impl Snpr {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        Snpr { core: TraderCore::new(tid, "SNPR", birthtime) }
    }
}

impl Strategy for Snpr {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, countdown: f64, lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        if countdown >= 0.2 {
            return None;
        }
        let a = self.core.assignment.as_ref()?;
        let shave = (1.0 / (0.01 + countdown / (3.0 * 0.2))).floor() as i32;
        let price = shave_price(a.side, a.limit, lob, shave.max(1));
        Some(quote(&self.core, time, price))
    }

    fn respond(&mut self, _time: Timestamp, _lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {}
}

/// ZIC with additive Gaussian price noise.
pub struct NoisyZic {
    core: TraderCore,
    sigma: f64,
}

impl NoisyZic {
    pub fn new(tid: TraderId, birthtime: Timestamp, sigma: f64) -> Self {
        NoisyZic { core: TraderCore::new(tid, "ZIC-N", birthtime), sigma }
    }
}

impl Strategy for NoisyZic {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, lob: &Snapshot, rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let base = zic_price(a.side, a.limit, lob, rng);
        let noise = rng.gauss(0.0, self.sigma * base.0 as f64);
        let price = Price::clamp((base.0 as f64 + noise).round() as i32);
        Some(quote(&self.core, time, price))
    }

    fn respond(&mut self, _time: Timestamp, _lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {}
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::customer::Assignment;
    use crate::snapshot::SideSnapshot;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            time: 0.0,
            bids: SideSnapshot { best: None, worst: Price::MIN, n: 0, lob: vec![] },
            asks: SideSnapshot { best: None, worst: Price::MAX, n: 0, lob: vec![] },
            sess_hi: None,
            qid: crate::types::QuoteId(0),
            last_tape_event: None,
        }
    }

    #[test]
    fn gvwy_quotes_at_limit() {
        let mut t = Gvwy::new("G0".into(), 0.0);
        t.core_mut().assignment =
            Some(Assignment { trader_id: "G0".into(), side: Side::Bid, limit: Price(120), issue_time: 0.0 });
        let mut rng = SimRng::seeded(1);
        let order = t.get_order(1.0, 1.0, &empty_snapshot(), &mut rng).unwrap();
        assert_eq!(order.price, Price(120));
    }

    #[test]
    fn gvwy_quotes_nothing_without_assignment() {
        let mut t = Gvwy::new("G0".into(), 0.0);
        let mut rng = SimRng::seeded(1);
        assert!(t.get_order(1.0, 1.0, &empty_snapshot(), &mut rng).is_none());
    }

    #[test]
    fn shvr_stub_on_empty_book_is_worst() {
        let mut t = Shvr::new("H0".into(), 0.0);
        t.core_mut().assignment =
            Some(Assignment { trader_id: "H0".into(), side: Side::Bid, limit: Price(150), issue_time: 0.0 });
        let mut rng = SimRng::seeded(1);
        let order = t.get_order(1.0, 1.0, &empty_snapshot(), &mut rng).unwrap();
        assert_eq!(order.price, Price::MIN);
    }

    #[test]
    fn shvr_improves_best_by_one_tick_clipped_to_limit() {
        let mut t = Shvr::new("H0".into(), 0.0);
        t.core_mut().assignment =
            Some(Assignment { trader_id: "H0".into(), side: Side::Bid, limit: Price(105), issue_time: 0.0 });
        let mut snap = empty_snapshot();
        snap.bids.best = Some(Price(104));
        let mut rng = SimRng::seeded(1);
        let order = t.get_order(1.0, 1.0, &snap, &mut rng).unwrap();
        assert_eq!(order.price, Price(105));

        snap.bids.best = Some(Price(200));
        let order = t.get_order(1.0, 1.0, &snap, &mut rng).unwrap();
        assert_eq!(order.price, Price(105));
    }

    #[test]
    fn snpr_is_inactive_until_close_to_deadline() {
        let mut t = Snpr::new("N0".into(), 0.0);
        t.core_mut().assignment =
            Some(Assignment { trader_id: "N0".into(), side: Side::Bid, limit: Price(150), issue_time: 0.0 });
        let mut rng = SimRng::seeded(1);
        assert!(t.get_order(1.0, 0.5, &empty_snapshot(), &mut rng).is_none());
        assert!(t.get_order(1.0, 0.1, &empty_snapshot(), &mut rng).is_some());
    }

    #[test]
    fn zic_price_is_within_feasible_interval() {
        let mut rng = SimRng::seeded(42);
        let mut snap = empty_snapshot();
        snap.bids.worst = Price(50);
        for _ in 0..100 {
            let p = zic_price(Side::Bid, Price(120), &snap, &mut rng);
            assert!((50..=120).contains(&p.0));
        }
    }
}
