//! Inventory-managing strategies: PT1/PT2, TrendFollower, MeanReverter
//! (spec §4.7). Unlike the quote-shading families above, these traders
//! self-issue their own buy/sell decisions in `respond()` rather than
//! waiting on a customer-order assignment — `get_order` simply quotes
//! whatever `respond` last decided.

use super::{Strategy, TraderCore};
use crate::customer::Assignment;
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Price, Timestamp, TraderId};
use std::collections::VecDeque;

const WARMUP_TIME: f64 = 300.0;
const N_PAST_TRADES: usize = 5;
const BID_PERCENT: f64 = 0.9999;
const ASK_DELTA: i32 = 5;

/// Rolling window of the last `N_PAST_TRADES` observed trade prices,
/// shared by PT1 and PT2.
#[derive(Default)]
struct TradeHistory {
    prices: VecDeque<i64>,
}

impl TradeHistory {
    fn push(&mut self, price: Price) {
        if self.prices.len() == N_PAST_TRADES {
            self.prices.pop_front();
        }
        self.prices.push_back(price.0 as i64);
    }

    fn average(&self) -> Option<f64> {
        if self.prices.len() < N_PAST_TRADES {
            return None;
        }
        Some(self.prices.iter().sum::<i64>() as f64 / self.prices.len() as f64)
    }
}

/// Decides the next buy/sell assignment for a PT1/PT2 trader and stores
/// it on `core` for `get_order` to quote verbatim (spec §4.7).
fn pt_respond(core: &mut TraderCore, time: Timestamp, history: &mut TradeHistory, lob: &Snapshot, last_trade: Option<&Trade>) {
    if let Some(trade) = last_trade {
        history.push(trade.price);
    }
    if time < WARMUP_TIME {
        return;
    }

    if let Some(purchase_price) = core.last_purchase_price {
        let ask_price = purchase_price.0 + ASK_DELTA;
        if lob.bids.best.is_some_and(|b| b.0 as i64 > ask_price as i64) {
            core.assignment =
                Some(Assignment { trader_id: core.tid.clone(), side: Side::Ask, limit: Price::clamp(ask_price), issue_time: time });
        }
        return;
    }

    let Some(avg) = history.average() else { return };
    let Some(best_ask) = lob.asks.best else { return };
    if (best_ask.0 as f64 / avg) < BID_PERCENT && (best_ask.0 as i64 + 1) < core.balance {
        core.assignment = Some(Assignment {
            trader_id: core.tid.clone(),
            side: Side::Bid,
            limit: Price::clamp(best_ask.0 + 1),
            issue_time: time,
        });
    }
}

fn quote_self_issued(core: &TraderCore, time: Timestamp) -> Option<Order> {
    let a = core.assignment.as_ref()?;
    Some(Order::new(core.tid.clone(), a.side, a.limit, time))
}

pub struct Pt1 {
    core: TraderCore,
    history: TradeHistory,
}

impl Pt1 {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        Pt1 { core: TraderCore::new(tid, "PT1", birthtime), history: TradeHistory::default() }
    }
}

impl Strategy for Pt1 {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }
    fn is_inventory_managed(&self) -> bool {
        true
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        quote_self_issued(&self.core, time)
    }

    fn respond(&mut self, time: Timestamp, lob: &Snapshot, last_trade: Option<&Trade>, _rng: &mut SimRng) {
        pt_respond(&mut self.core, time, &mut self.history, lob, last_trade);
    }
}

pub struct Pt2 {
    core: TraderCore,
    history: TradeHistory,
}

impl Pt2 {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        Pt2 { core: TraderCore::new(tid, "PT2", birthtime), history: TradeHistory::default() }
    }
}

impl Strategy for Pt2 {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }
    fn is_inventory_managed(&self) -> bool {
        true
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        quote_self_issued(&self.core, time)
    }

    fn respond(&mut self, time: Timestamp, lob: &Snapshot, last_trade: Option<&Trade>, _rng: &mut SimRng) {
        pt_respond(&mut self.core, time, &mut self.history, lob, last_trade);
    }
}

/// Tracks the last few mid-prices to classify a strict trend.
struct MidHistory {
    mids: VecDeque<f64>,
    capacity: usize,
}

impl MidHistory {
    fn new(capacity: usize) -> Self {
        MidHistory { mids: VecDeque::with_capacity(capacity), capacity }
    }

    fn push(&mut self, mid: f64) {
        if self.mids.len() == self.capacity {
            self.mids.pop_front();
        }
        self.mids.push_back(mid);
    }

    fn strictly_increasing(&self) -> bool {
        self.mids.len() == self.capacity && self.mids.iter().zip(self.mids.iter().skip(1)).all(|(a, b)| a < b)
    }

    fn strictly_decreasing(&self) -> bool {
        self.mids.len() == self.capacity && self.mids.iter().zip(self.mids.iter().skip(1)).all(|(a, b)| a > b)
    }
}

/// Buys into a rising market, sells held inventory back out once the
/// trend turns down (spec §4.7).
pub struct TrendFollower {
    core: TraderCore,
    mids: MidHistory,
}

impl TrendFollower {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        TrendFollower { core: TraderCore::new(tid, "TREND", birthtime), mids: MidHistory::new(3) }
    }
}

impl Strategy for TrendFollower {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }
    fn is_inventory_managed(&self) -> bool {
        true
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        quote_self_issued(&self.core, time)
    }

    fn respond(&mut self, time: Timestamp, lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {
        if let Some(mid) = lob.mid_price() {
            self.mids.push(mid);
        }

        if let Some(purchase_price) = self.core.last_purchase_price {
            if self.mids.strictly_decreasing() {
                self.core.assignment = Some(Assignment {
                    trader_id: self.core.tid.clone(),
                    side: Side::Ask,
                    limit: purchase_price,
                    issue_time: time,
                });
            }
            return;
        }

        if self.mids.strictly_increasing() {
            if let Some(best_ask) = lob.asks.best {
                self.core.assignment = Some(Assignment {
                    trader_id: self.core.tid.clone(),
                    side: Side::Bid,
                    limit: best_ask,
                    issue_time: time,
                });
            }
        }
    }
}

/// Buys dips and sells rallies against a 10-point moving average of the
/// mid-price (spec §4.7).
pub struct MeanReverter {
    core: TraderCore,
    window: VecDeque<f64>,
}

impl MeanReverter {
    const WINDOW: usize = 10;

    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        MeanReverter { core: TraderCore::new(tid, "MNRV", birthtime), window: VecDeque::with_capacity(Self::WINDOW) }
    }

    fn moving_average(&self) -> Option<f64> {
        if self.window.len() < Self::WINDOW {
            return None;
        }
        Some(self.window.iter().sum::<f64>() / self.window.len() as f64)
    }
}

impl Strategy for MeanReverter {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }
    fn is_inventory_managed(&self) -> bool {
        true
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        quote_self_issued(&self.core, time)
    }

    fn respond(&mut self, time: Timestamp, lob: &Snapshot, _last_trade: Option<&Trade>, _rng: &mut SimRng) {
        let Some(mid) = lob.mid_price() else { return };
        if self.window.len() == Self::WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(mid);

        let Some(ma) = self.moving_average() else { return };

        if let Some(purchase_price) = self.core.last_purchase_price {
            if mid > 1.02 * ma {
                if let Some(best_bid) = lob.bids.best {
                    let limit = best_bid.max(purchase_price);
                    self.core.assignment =
                        Some(Assignment { trader_id: self.core.tid.clone(), side: Side::Ask, limit, issue_time: time });
                }
            }
            return;
        }

        if mid < 0.98 * ma {
            if let Some(best_ask) = lob.asks.best {
                self.core.assignment =
                    Some(Assignment { trader_id: self.core.tid.clone(), side: Side::Bid, limit: best_ask, issue_time: time });
            }
        }
    }
}
