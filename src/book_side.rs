//! One side (Bid or Ask) of the limit order book.
//!
//! Grounded in the teacher's `price_levels.rs` (a `BTreeMap<Price, Level>`
//! with a cached best price), restructured around the spec's at-most-one
//! invariant: the authoritative store is keyed by trader id, not order id
//! (spec §9, "modeled with a mapping keyed by trader id rather than a free
//! list of orders"), and `lob`/`lob_anon`/`best_price` are rebuilt from it
//! on every mutation (spec §9, "reference implementation rebuilds the
//! whole lob").

use crate::level::PriceLevel;
use crate::order::Order;
use crate::side::Side;
use crate::types::{Price, TraderId};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::trace;

/// Outcome of `OrderbookHalf::add`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// The trader had no live order on this side; one was created.
    Addition,
    /// The trader already had a live order on this side; it was replaced.
    Overwrite,
}

/// One side of the book: the set of live orders keyed by trader id, the
/// derived price ladder, and the cached best price.
#[derive(Clone, Debug)]
pub struct OrderbookHalf {
    side: Side,
    orders: FxHashMap<TraderId, Order>,
    lob: BTreeMap<Price, PriceLevel>,
    lob_anon: Vec<(Price, u64)>,
    best_price: Option<Price>,
    best_tid: Option<TraderId>,
    session_extreme: Option<Price>,
    worstprice: Price,
}

impl OrderbookHalf {
    pub fn new(side: Side) -> Self {
        OrderbookHalf {
            side,
            orders: FxHashMap::default(),
            lob: BTreeMap::new(),
            lob_anon: Vec::new(),
            best_price: None,
            best_tid: None,
            session_extreme: None,
            worstprice: Self::sentinel(side),
        }
    }

    fn sentinel(side: Side) -> Price {
        match side {
            Side::Bid => Price::MIN,
            Side::Ask => Price::MAX,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn n_orders(&self) -> usize {
        self.orders.len()
    }

    pub fn best_price(&self) -> Option<Price> {
        self.best_price
    }

    pub fn best_tid(&self) -> Option<&TraderId> {
        self.best_tid.as_ref()
    }

    pub fn worstprice(&self) -> Price {
        self.worstprice
    }

    /// Highest Ask ever posted this session; meaningless (always `None`)
    /// on a Bid side. Used by the PRZI ask-interval construction (spec
    /// §4.5).
    pub fn session_extreme(&self) -> Option<Price> {
        self.session_extreme
    }

    pub fn lob_anon(&self) -> &[(Price, u64)] {
        &self.lob_anon
    }

    pub fn order_of(&self, trader_id: &str) -> Option<&Order> {
        self.orders.get(trader_id)
    }

    /// Stores `order` under its trader id, overwriting any prior order
    /// from the same trader, then rebuilds the derived ladder.
    pub fn add(&mut self, order: Order) -> AddOutcome {
        debug_assert_eq!(order.side, self.side);
        let outcome = if self.orders.contains_key(&order.trader_id) {
            AddOutcome::Overwrite
        } else {
            AddOutcome::Addition
        };
        if self.side == Side::Ask {
            self.session_extreme = Some(match self.session_extreme {
                Some(hi) => hi.max(order.price),
                None => order.price,
            });
        }
        self.orders.insert(order.trader_id.clone(), order);
        self.rebuild();
        trace!(side = ?self.side, outcome = ?outcome, "order added");
        outcome
    }

    /// Removes the trader's order, if any; a no-op if the trader has none.
    pub fn delete(&mut self, trader_id: &str) {
        if self.orders.remove(trader_id).is_some() {
            self.rebuild();
        } else {
            trace!(side = ?self.side, trader_id, "delete: no such order (no-op)");
        }
    }

    /// Removes the time-priority head of the best price level. Returns
    /// the removed order's trader id. Caller must not invoke this on an
    /// empty side.
    pub fn delete_best(&mut self) -> Option<TraderId> {
        let best = self.best_price?;
        let level = self.lob.get(&best)?;
        let head_tid = level.head()?.trader_id.clone();
        self.orders.remove(&head_tid);
        self.rebuild();
        Some(head_tid)
    }

    /// Rebuilds `lob`, `lob_anon`, `best_price`, `best_tid`, `worstprice`
    /// from the authoritative `orders` map.
    fn rebuild(&mut self) {
        self.lob.clear();
        for order in self.orders.values() {
            let level = self.lob.entry(order.price).or_insert_with(PriceLevel::new);
            level.insert_sorted(order.time.0, order.trader_id.clone(), order.qid);
        }

        self.lob_anon = self
            .lob
            .iter()
            .map(|(price, level)| (*price, level.aggregate_qty()))
            .collect();

        self.best_price = match self.side {
            Side::Bid => self.lob.keys().next_back().copied(),
            Side::Ask => self.lob.keys().next().copied(),
        };

        self.best_tid = self.best_price.and_then(|p| {
            self.lob.get(&p).and_then(|lvl| lvl.head()).map(|a| a.trader_id.clone())
        });

        self.worstprice = match self.best_price {
            None => Self::sentinel(self.side),
            Some(_) => match self.side {
                Side::Bid => self.lob.keys().next().copied().unwrap(),
                Side::Ask => self.lob.keys().next_back().copied().unwrap(),
            },
        };
    }
}
