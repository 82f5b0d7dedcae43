//! Trader contract and strategy dispatch (spec §4.3-§4.7, §9).
//!
//! Grounded in the teacher's sum-type composition style: rather than a
//! Python-style class hierarchy, concrete strategies are variants of
//! `TraderKind`, each wrapping its own state plus a shared `TraderCore`
//! (spec §9, "the Python class hierarchy should become a sum type ...
//! common trader state lives in a shared struct composed into each
//! variant").

pub mod fixed;
pub mod inventory;
pub mod przi;
pub mod prde;
pub mod prsh;
pub mod rl;
pub mod zip;
pub mod zip_opt;

use crate::config::TraderBlueprint;
use crate::customer::Assignment;
use crate::error::SimError;
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Price, Timestamp, TraderId};
use std::collections::VecDeque;

/// Outcome of `Trader::assign`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssignOutcome {
    /// No prior live quote; the driver does nothing further.
    Proceed,
    /// A live quote existed; the driver must cancel it at the exchange.
    LobCancel,
}

/// One executed-trade line in a trader's blotter.
#[derive(Clone, Debug)]
pub struct BlotterEntry {
    pub time: Timestamp,
    pub price: Price,
    pub party1: TraderId,
    pub party2: TraderId,
}

/// Bookkeeping state shared by every concrete strategy (spec §3, §9).
#[derive(Clone, Debug)]
pub struct TraderCore {
    pub tid: TraderId,
    pub ttype: &'static str,
    pub balance: i64,
    pub blotter: VecDeque<BlotterEntry>,
    pub assignment: Option<Assignment>,
    pub lastquote: Option<Order>,
    pub birthtime: Timestamp,
    pub n_trades: u64,
    pub profitpertime: f64,
    /// Price paid on the last Bid fill, while the trader still holds the
    /// unit (inventory-managing strategies only).
    pub last_purchase_price: Option<Price>,
}

impl TraderCore {
    /// Bounded blotter length (spec §6, `blotter_length=100`).
    pub const BLOTTER_CAPACITY: usize = 100;

    pub fn new(tid: TraderId, ttype: &'static str, birthtime: Timestamp) -> Self {
        TraderCore {
            tid,
            ttype,
            balance: 0,
            blotter: VecDeque::with_capacity(Self::BLOTTER_CAPACITY),
            assignment: None,
            lastquote: None,
            birthtime,
            n_trades: 0,
            profitpertime: 0.0,
            last_purchase_price: None,
        }
    }

    pub fn n_quotes(&self) -> usize {
        usize::from(self.lastquote.is_some())
    }

    fn push_blotter(&mut self, entry: BlotterEntry) {
        if self.blotter.len() == Self::BLOTTER_CAPACITY {
            self.blotter.pop_front();
        }
        self.blotter.push_back(entry);
    }

    /// Accepts a customer assignment (spec §4.3 `assign`). Replaces any
    /// pending assignment with `[order]`.
    pub fn assign(&mut self, order: Assignment) -> AssignOutcome {
        let outcome = if self.n_quotes() > 0 { AssignOutcome::LobCancel } else { AssignOutcome::Proceed };
        self.lastquote = None;
        self.assignment = Some(order);
        outcome
    }

    /// Records an executed trade: appends to the blotter, updates
    /// balance/trade count/profit-per-second, and clears the assignment
    /// and live quote. `inventory_managed` strategies may realize a
    /// negative profit (spec §4.3); naive strategies may not.
    ///
    /// Per spec §9's RL reward note, any inventory-price-dependent value
    /// must be read from `last_purchase_price` *before* it is cleared
    /// here; callers needing the realized reward should capture it first.
    pub fn bookkeep(
        &mut self,
        time: Timestamp,
        trade: &Trade,
        my_side: Side,
        inventory_managed: bool,
    ) -> Result<i64, SimError> {
        self.push_blotter(BlotterEntry {
            time,
            price: trade.price,
            party1: trade.party1.clone(),
            party2: trade.party2.clone(),
        });

        let trade_price = trade.price.0 as i64;
        let profit = match (my_side, &self.assignment) {
            (Side::Bid, Some(a)) => a.limit.0 as i64 - trade_price,
            (Side::Ask, Some(a)) => trade_price - a.limit.0 as i64,
            // Inventory-managing strategies self-issue jobs (spec §4.7);
            // profit is cash-flow relative to the last purchase.
            (Side::Bid, None) => -trade_price,
            (Side::Ask, None) => {
                trade_price - self.last_purchase_price.map(|p| p.0 as i64).unwrap_or(trade_price)
            }
        };

        if !inventory_managed && profit < 0 {
            return Err(SimError::NegativeProfitForNaiveTrader { trader_id: self.tid.clone(), profit: profit as i32 });
        }

        self.balance += profit;
        self.n_trades += 1;
        let age = (time - self.birthtime).max(1e-9);
        self.profitpertime = self.balance as f64 / age;

        match my_side {
            Side::Bid => self.last_purchase_price = Some(trade.price),
            Side::Ask => self.last_purchase_price = None,
        }
        self.assignment = None;
        self.lastquote = None;
        Ok(profit)
    }

    /// `balance + last_purchase_price` if holding inventory, else
    /// `balance` (spec §6, average-balances NetWorth column).
    pub fn net_worth(&self) -> i64 {
        self.balance + self.last_purchase_price.map(|p| p.0 as i64).unwrap_or(0)
    }
}

/// The uniform trader contract every strategy implements (spec §4.3).
pub trait Strategy {
    fn core(&self) -> &TraderCore;
    fn core_mut(&mut self) -> &mut TraderCore;

    /// Whether the driver should tolerate a negative realized profit from
    /// this strategy (PT1/PT2/TrendFollower/MeanReverter/RL: spec §4.7).
    fn is_inventory_managed(&self) -> bool {
        false
    }

    /// Produces the next quote, or `None` if the strategy has nothing to
    /// say this tick.
    fn get_order(&mut self, time: Timestamp, countdown: f64, lob: &Snapshot, rng: &mut SimRng) -> Option<Order>;

    /// Observes market state and may update internal strategy state.
    fn respond(&mut self, time: Timestamp, lob: &Snapshot, last_trade: Option<&Trade>, rng: &mut SimRng);
}

/// Sum-type dispatch surface over every concrete strategy (spec §9).
pub enum TraderKind {
    Gvwy(fixed::Gvwy),
    Zic(fixed::Zic),
    Shvr(fixed::Shvr),
    Snpr(fixed::Snpr),
    NoisyZic(fixed::NoisyZic),
    Przi(przi::PrziTrader),
    Prsh(prsh::PrshTrader),
    Prde(prde::PrdeTrader),
    Zip(zip::ZipTrader),
    Zipsh(zip_opt::ZipshTrader),
    Zipde(zip_opt::ZipdeTrader),
    Pt1(inventory::Pt1),
    Pt2(inventory::Pt2),
    TrendFollower(inventory::TrendFollower),
    MeanReverter(inventory::MeanReverter),
    RlAgent(rl::RlAgent),
}

macro_rules! dispatch {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            TraderKind::Gvwy(t) => t.$method($($arg),*),
            TraderKind::Zic(t) => t.$method($($arg),*),
            TraderKind::Shvr(t) => t.$method($($arg),*),
            TraderKind::Snpr(t) => t.$method($($arg),*),
            TraderKind::NoisyZic(t) => t.$method($($arg),*),
            TraderKind::Przi(t) => t.$method($($arg),*),
            TraderKind::Prsh(t) => t.$method($($arg),*),
            TraderKind::Prde(t) => t.$method($($arg),*),
            TraderKind::Zip(t) => t.$method($($arg),*),
            TraderKind::Zipsh(t) => t.$method($($arg),*),
            TraderKind::Zipde(t) => t.$method($($arg),*),
            TraderKind::Pt1(t) => t.$method($($arg),*),
            TraderKind::Pt2(t) => t.$method($($arg),*),
            TraderKind::TrendFollower(t) => t.$method($($arg),*),
            TraderKind::MeanReverter(t) => t.$method($($arg),*),
            TraderKind::RlAgent(t) => t.$method($($arg),*),
        }
    };
}

impl TraderKind {
    pub fn new(blueprint: &TraderBlueprint, tid: TraderId, birthtime: Timestamp, rng: &mut SimRng) -> Self {
        match blueprint {
            TraderBlueprint::Gvwy => TraderKind::Gvwy(fixed::Gvwy::new(tid, birthtime)),
            TraderBlueprint::Zic => TraderKind::Zic(fixed::Zic::new(tid, birthtime)),
            TraderBlueprint::Shvr => TraderKind::Shvr(fixed::Shvr::new(tid, birthtime)),
            TraderBlueprint::Snpr => TraderKind::Snpr(fixed::Snpr::new(tid, birthtime)),
            TraderBlueprint::NoisyZic { sigma } => {
                TraderKind::NoisyZic(fixed::NoisyZic::new(tid, birthtime, *sigma))
            }
            TraderBlueprint::Przi => TraderKind::Przi(przi::PrziTrader::new(tid, birthtime, rng)),
            TraderBlueprint::Prsh { k } => TraderKind::Prsh(prsh::PrshTrader::new(tid, birthtime, rng, *k)),
            TraderBlueprint::Prde { k } => TraderKind::Prde(prde::PrdeTrader::new(tid, birthtime, rng, *k)),
            TraderBlueprint::Zip => TraderKind::Zip(zip::ZipTrader::new(tid, birthtime, rng)),
            TraderBlueprint::Zipsh { k } => TraderKind::Zipsh(zip_opt::ZipshTrader::new(tid, birthtime, rng, *k)),
            TraderBlueprint::Zipde { k } => TraderKind::Zipde(zip_opt::ZipdeTrader::new(tid, birthtime, rng, *k)),
            TraderBlueprint::Pt1 => TraderKind::Pt1(inventory::Pt1::new(tid, birthtime)),
            TraderBlueprint::Pt2 => TraderKind::Pt2(inventory::Pt2::new(tid, birthtime)),
            TraderBlueprint::TrendFollower => {
                TraderKind::TrendFollower(inventory::TrendFollower::new(tid, birthtime))
            }
            TraderBlueprint::MeanReverter => {
                TraderKind::MeanReverter(inventory::MeanReverter::new(tid, birthtime))
            }
            TraderBlueprint::RlAgent => TraderKind::RlAgent(rl::RlAgent::new(tid, birthtime)),
        }
    }

    pub fn core(&self) -> &TraderCore {
        dispatch!(self, core)
    }

    pub fn core_mut(&mut self) -> &mut TraderCore {
        dispatch!(self, core_mut)
    }

    pub fn is_inventory_managed(&self) -> bool {
        dispatch!(self, is_inventory_managed)
    }

    pub fn assign(&mut self, order: Assignment) -> AssignOutcome {
        self.core_mut().assign(order)
    }

    pub fn get_order(&mut self, time: Timestamp, countdown: f64, lob: &Snapshot, rng: &mut SimRng) -> Option<Order> {
        let order = dispatch!(self, get_order, time, countdown, lob, rng);
        if let Some(order) = &order {
            self.core_mut().lastquote = Some(order.clone());
        }
        order
    }

    pub fn respond(&mut self, time: Timestamp, lob: &Snapshot, last_trade: Option<&Trade>, rng: &mut SimRng) {
        dispatch!(self, respond, time, lob, last_trade, rng)
    }

    pub fn bookkeep(&mut self, time: Timestamp, trade: &Trade, my_side: Side) -> Result<i64, SimError> {
        let inventory_managed = self.is_inventory_managed();
        self.core_mut().bookkeep(time, trade, my_side, inventory_managed)
    }
}
