//! ZIP: margin-learning trader with momentum (spec §4.6).
//!
//! Unlike the PRZI family, ZIP carries no explicit probability model: it
//! nudges a single margin value toward whatever price the market just
//! revealed, with a momentum term smoothing the adjustment across ticks.

use super::{Strategy, TraderCore};
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Price, Timestamp, TraderId};

pub struct ZipTrader {
    core: TraderCore,
    pub margin: f64,
    pub beta: f64,
    pub momentum: f64,
    pub c_a: f64,
    pub c_r: f64,
    prev_change: f64,
    side: Option<Side>,
    last_limit: Option<Price>,
    active: bool,
}

impl ZipTrader {
    pub fn new(tid: TraderId, birthtime: Timestamp, rng: &mut SimRng) -> Self {
        ZipTrader {
            core: TraderCore::new(tid, "ZIP", birthtime),
            margin: 0.0,
            beta: rng.uniform_range(0.1, 0.5),
            momentum: rng.uniform_range(0.0, 0.1),
            c_a: 0.05,
            c_r: 0.05,
            prev_change: 0.0,
            side: None,
            last_limit: None,
            active: false,
        }
    }

    fn target_up(&self, price: f64, rng: &mut SimRng) -> f64 {
        let abs = self.c_a * rng.uniform01();
        let rel = price * self.c_r * rng.uniform01();
        price + abs + rel
    }

    fn target_down(&self, price: f64, rng: &mut SimRng) -> f64 {
        let abs = self.c_a * rng.uniform01();
        let rel = price * self.c_r * rng.uniform01();
        price - abs - rel
    }

    fn current_price(&self, limit: Price) -> f64 {
        limit.0 as f64 * (1.0 + self.margin)
    }

    /// Moves `margin` toward `target`, smoothed by momentum against the
    /// previous change (spec §4.6).
    fn adjust_margin(&mut self, target: f64, limit: Price) {
        let current = self.current_price(limit);
        let diff = target - current;
        let change = (1.0 - self.momentum) * (self.beta * diff) + self.momentum * self.prev_change;
        self.prev_change = change;
        let new_price = current + change;
        let mut margin = new_price / limit.0 as f64 - 1.0;
        margin = match self.side {
            Some(Side::Bid) => margin.min(0.0),
            Some(Side::Ask) => margin.max(0.0),
            None => margin,
        };
        self.margin = margin;
    }
}

impl Strategy for ZipTrader {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let (side, limit) = (a.side, a.limit);
        if self.side != Some(side) {
            self.side = Some(side);
            self.margin = match side {
                Side::Bid => -rng.uniform_range(0.05, 0.35),
                Side::Ask => rng.uniform_range(0.05, 0.35),
            };
            self.prev_change = 0.0;
        }
        self.last_limit = Some(limit);
        self.active = true;
        let price = Price::clamp(self.current_price(limit).round() as i32);
        Some(Order::new(self.core.tid.clone(), side, price, time))
    }

    fn respond(&mut self, _time: Timestamp, lob: &Snapshot, last_trade: Option<&Trade>, rng: &mut SimRng) {
        let (Some(limit), Some(side)) = (self.last_limit, self.side) else { return };
        let current = self.current_price(limit);

        let target = match side {
            Side::Ask => {
                if let Some(trade) = last_trade {
                    let trade_price = trade.price.0 as f64;
                    if current <= trade_price {
                        Some(self.target_up(trade_price, rng))
                    } else if let Some(best_bid) = lob.bids.best.filter(|_| self.active) {
                        (best_bid.0 as f64 >= current).then(|| self.target_up(best_bid.0 as f64, rng))
                    } else {
                        None
                    }
                } else if let Some(best_bid) = lob.bids.best.filter(|_| self.active) {
                    (current > best_bid.0 as f64).then(|| self.target_down(best_bid.0 as f64, rng))
                } else {
                    None
                }
            }
            Side::Bid => {
                if let Some(trade) = last_trade {
                    let trade_price = trade.price.0 as f64;
                    if current >= trade_price {
                        Some(self.target_down(trade_price, rng))
                    } else if let Some(best_ask) = lob.asks.best.filter(|_| self.active) {
                        (best_ask.0 as f64 <= current).then(|| self.target_down(best_ask.0 as f64, rng))
                    } else {
                        None
                    }
                } else if let Some(best_ask) = lob.asks.best.filter(|_| self.active) {
                    (current < best_ask.0 as f64).then(|| self.target_up(best_ask.0 as f64, rng))
                } else {
                    None
                }
            }
        };

        if let Some(target) = target {
            self.adjust_margin(target, limit);
        }
    }
}
