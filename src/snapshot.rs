//! Public LOB snapshot broadcast to every trader each tick.

use crate::tape::TapeEvent;
use crate::types::{Price, QuoteId, Timestamp};
use std::fmt::Write as _;

/// One side's public view: best/worst price, order count, and the
/// anonymized price-quantity ladder.
#[derive(Clone, Debug, PartialEq)]
pub struct SideSnapshot {
    pub best: Option<Price>,
    pub worst: Price,
    pub n: usize,
    pub lob: Vec<(Price, u64)>,
}

/// Defensive snapshot of the whole market returned by `Exchange::publish_lob`.
/// Traders only ever read this; they never mutate exchange state directly
/// (spec §5).
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub time: Timestamp,
    pub bids: SideSnapshot,
    pub asks: SideSnapshot,
    /// Highest Ask ever posted this session (`sess_hi`), used by PRZI's
    /// ask-interval construction (spec §4.5).
    pub sess_hi: Option<Price>,
    pub qid: QuoteId,
    /// Last event pushed to the tape, if any; traders (ZIP in particular)
    /// inspect this to infer whether the last book change was a trade or
    /// a cancel (spec §4.6).
    pub last_tape_event: Option<TapeEvent>,
}

impl Snapshot {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best
    }

    pub fn spread(&self) -> Option<i32> {
        match (self.asks.best, self.bids.best) {
            (Some(a), Some(b)) => Some(a.0 - b.0),
            _ => None,
        }
    }

    /// The price of the last trade, if the last tape event was a trade.
    pub fn last_trade_price(&self) -> Option<Price> {
        match &self.last_tape_event {
            Some(TapeEvent::Trade(t)) => Some(t.price),
            _ => None,
        }
    }

    pub fn mid_price(&self) -> Option<f64> {
        match (self.asks.best, self.bids.best) {
            (Some(a), Some(b)) => Some((a.0 as f64 + b.0 as f64) / 2.0),
            _ => None,
        }
    }

    /// Canonical compact string for the LOB-frames sink (spec §6): written
    /// only when it differs from the previously emitted frame.
    pub fn to_frame_string(&self) -> String {
        let mut s = String::new();
        write!(s, "{:.3}, Bid:, {}, ", self.time, self.bids.n).unwrap();
        for (p, q) in &self.bids.lob {
            write!(s, "{}, {}, ", p.0, q).unwrap();
        }
        write!(s, "Ask:, {}, ", self.asks.n).unwrap();
        for (p, q) in &self.asks.lob {
            write!(s, "{}, {}, ", p.0, q).unwrap();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_snapshot() -> Snapshot {
        Snapshot {
            time: 0.0,
            bids: SideSnapshot { best: None, worst: Price::MIN, n: 0, lob: vec![] },
            asks: SideSnapshot { best: None, worst: Price::MAX, n: 0, lob: vec![] },
            sess_hi: None,
            qid: QuoteId(0),
            last_tape_event: None,
        }
    }

    #[test]
    fn spread_is_none_when_either_side_empty() {
        assert_eq!(empty_snapshot().spread(), None);
    }

    #[test]
    fn spread_is_ask_minus_bid() {
        let mut snap = empty_snapshot();
        snap.bids.best = Some(Price(98));
        snap.asks.best = Some(Price(102));
        assert_eq!(snap.spread(), Some(4));
        assert_eq!(snap.mid_price(), Some(100.0));
    }

    #[test]
    fn frame_string_changes_with_book_contents() {
        let a = empty_snapshot();
        let mut b = empty_snapshot();
        b.bids.n = 1;
        b.bids.lob.push((Price(100), 1));
        assert_ne!(a.to_frame_string(), b.to_frame_string());
    }
}
