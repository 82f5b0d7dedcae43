//! The exchange: owns both book halves, the tape, and the quote-id
//! counter; resolves crossings with maker-price execution.

use crate::book_side::{AddOutcome, OrderbookHalf};
use crate::error::SimError;
use crate::order::Order;
use crate::side::Side;
use crate::snapshot::{SideSnapshot, Snapshot};
use crate::tape::{Tape, TapeEvent};
use crate::trade::Trade;
use crate::types::{QuoteId, Timestamp};
use tracing::{debug, trace, warn};

/// The central limit order book and matching engine.
#[derive(Clone, Debug)]
pub struct Exchange {
    bids: OrderbookHalf,
    asks: OrderbookHalf,
    tape: Tape,
    next_qid: u64,
}

impl Exchange {
    pub fn new() -> Self {
        Exchange {
            bids: OrderbookHalf::new(Side::Bid),
            asks: OrderbookHalf::new(Side::Ask),
            tape: Tape::new(),
            next_qid: 0,
        }
    }

    fn half(&self, side: Side) -> &OrderbookHalf {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn half_mut(&mut self, side: Side) -> &mut OrderbookHalf {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn bids(&self) -> &OrderbookHalf {
        &self.bids
    }

    pub fn asks(&self) -> &OrderbookHalf {
        &self.asks
    }

    /// Assigns a quote id and routes `order` to its side, without
    /// checking for a cross. Returns the assigned id and whether this was
    /// a fresh addition or an overwrite of the trader's prior order.
    pub fn add_order(&mut self, mut order: Order) -> (QuoteId, AddOutcome) {
        let qid = QuoteId(self.next_qid);
        self.next_qid += 1;
        order.qid = Some(qid);
        let outcome = self.half_mut(order.side).add(order);
        (qid, outcome)
    }

    /// Removes `trader_id`'s order from `side`, if any, and records a
    /// Cancel event, which is also returned so callers can forward it to
    /// an external tape sink. A no-op (with a warning, returning `None`)
    /// if the trader has no live order there.
    pub fn del_order(&mut self, time: Timestamp, side: Side, trader_id: &str) -> Option<TapeEvent> {
        let Some(order) = self.half(side).order_of(trader_id).cloned() else {
            warn!(trader_id, ?side, "del_order: no live order (no-op)");
            return None;
        };
        self.half_mut(side).delete(trader_id);
        trace!(trader_id, ?side, "order deleted");
        let event = TapeEvent::Cancel { time, qid: order.qid, side, price: order.price };
        self.tape.push(event.clone());
        Some(event)
    }

    /// Adds `order` to the book and resolves a cross if one results.
    ///
    /// Pricing rule: the resting order's price sets the trade price
    /// (spec §4.2, "maker-price execution"). Quantity is always 1, so a
    /// single cross fully consumes both the incoming order and the best
    /// resting order on the opposite side.
    pub fn process_order(&mut self, time: Timestamp, order: Order) -> Result<Option<Trade>, SimError> {
        let side = order.side;
        let trader_id = order.trader_id.clone();
        let (_, _) = self.add_order(order);

        let crosses = match side {
            Side::Bid => match (self.bids.best_price(), self.asks.best_price()) {
                (Some(bid), Some(ask)) => bid >= ask,
                _ => false,
            },
            Side::Ask => match (self.asks.best_price(), self.bids.best_price()) {
                (Some(ask), Some(bid)) => ask <= bid,
                _ => false,
            },
        };

        if !crosses {
            return Ok(None);
        }

        let (maker_side, taker_side) = match side {
            Side::Bid => (Side::Ask, Side::Bid),
            Side::Ask => (Side::Bid, Side::Ask),
        };

        let maker_price = self.half(maker_side).best_price().ok_or(SimError::MalformedOrder)?;
        let maker_tid = self
            .half_mut(maker_side)
            .delete_best()
            .ok_or(SimError::MalformedOrder)?;
        self.half_mut(taker_side).delete(&trader_id);

        let (party1, party2) = (maker_tid, trader_id);
        let trade = Trade::new(time, maker_price, party1, party2, taker_side);
        debug!(price = maker_price.0, party1 = %trade.party1, party2 = %trade.party2, "trade executed");
        self.tape.push(TapeEvent::Trade(trade.clone()));
        Ok(Some(trade))
    }

    fn side_snapshot(half: &OrderbookHalf) -> SideSnapshot {
        SideSnapshot {
            best: half.best_price(),
            worst: half.worstprice(),
            n: half.n_orders(),
            lob: half.lob_anon().to_vec(),
        }
    }

    /// Returns a defensive snapshot of the public market state. This is
    /// the only channel through which traders observe the book (spec §5).
    pub fn publish_lob(&self, time: Timestamp) -> Snapshot {
        Snapshot {
            time,
            bids: Self::side_snapshot(&self.bids),
            asks: Self::side_snapshot(&self.asks),
            sess_hi: self.asks.session_extreme(),
            qid: QuoteId(self.next_qid),
            last_tape_event: self.tape.last().cloned(),
        }
    }

    /// Looks up a trader's current live order, if any, on either side.
    pub fn order_of(&self, trader_id: &str) -> Option<&Order> {
        self.bids.order_of(trader_id).or_else(|| self.asks.order_of(trader_id))
    }

    /// Removes a trader's live order on whichever side it rests, if any.
    pub fn cancel_any(&mut self, time: Timestamp, trader_id: &str) -> Option<TapeEvent> {
        if self.bids.order_of(trader_id).is_some() {
            self.del_order(time, Side::Bid, trader_id)
        } else if self.asks.order_of(trader_id).is_some() {
            self.del_order(time, Side::Ask, trader_id)
        } else {
            None
        }
    }
}

impl Default for Exchange {
    fn default() -> Self {
        Self::new()
    }
}
