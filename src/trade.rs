//! An executed trade.

use crate::side::Side;
use crate::types::{Price, Timestamp, TraderId};
use std::fmt;

/// A single executed trade. Quantity is always `1` (spec §1 Non-goals).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trade {
    pub time: crate::order::OrderedTimestamp,
    pub price: Price,
    /// The resting order's trader (sets the trade price; spec §4.2
    /// "maker-price execution").
    pub party1: TraderId,
    /// The incoming, crossing order's trader.
    pub party2: TraderId,
    /// The side of the incoming, crossing order (`party2`'s side);
    /// `party1` (the resting maker) traded on the opposite side. Needed
    /// because `party1`/`party2` are maker/taker roles, not a fixed
    /// buyer/seller assignment (spec §4.2 handles a crossing Bid and a
    /// crossing Ask symmetrically).
    pub taker_side: Side,
}

impl Trade {
    pub fn new(time: Timestamp, price: Price, party1: TraderId, party2: TraderId, taker_side: Side) -> Self {
        Trade { time: time.into(), price, party1, party2, taker_side }
    }
}

impl fmt::Display for Trade {
    /// Trade tape CSV line (spec §6): `Trd, <time>, <price>` — the tape
    /// schema carries no party columns; those live in the blotter.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Trd, {:010.3}, {}", self.time.0, self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_tape_format() {
        let t = Trade::new(1.5, Price(100), "S00".into(), "B00".into(), Side::Bid);
        let s = format!("{t}");
        assert_eq!(s, "Trd, 000000001.500, 100");
    }
}
