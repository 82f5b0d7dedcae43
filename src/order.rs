//! Order record: a trader's live quote resting in (or en route to) the book.

use crate::side::Side;
use crate::types::{Price, QuoteId, Timestamp, TraderId};
use std::fmt;

/// A single-unit limit order. Quantity is always `1` (spec §1 Non-goals);
/// there is no partial-fill state because a match always consumes the
/// whole order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    pub trader_id: TraderId,
    pub side: Side,
    pub price: Price,
    pub time: OrderedTimestamp,
    /// Assigned by the exchange on `add_order`; `None` until then.
    pub qid: Option<QuoteId>,
}

/// Wraps `f64` so `Order` can derive `PartialEq`/`Eq` without pretending
/// simulated time supports total ordering in general; equality here is
/// only ever used in tests and round-trip checks on exact arrival times.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderedTimestamp(pub Timestamp);

impl PartialEq for OrderedTimestamp {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for OrderedTimestamp {}

impl From<Timestamp> for OrderedTimestamp {
    fn from(t: Timestamp) -> Self {
        OrderedTimestamp(t)
    }
}

impl Order {
    /// Builds a new, not-yet-quoted order. The exchange assigns `qid`.
    pub fn new(trader_id: impl Into<TraderId>, side: Side, price: Price, time: Timestamp) -> Self {
        Order {
            trader_id: trader_id.into(),
            side,
            price,
            time: time.into(),
            qid: None,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} @ {} (t={:.3}, qid={:?})",
            self.trader_id, self.side, self.price, self.time.0, self.qid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_order_has_no_qid() {
        let o = Order::new("B00", Side::Bid, Price(100), 1.0);
        assert_eq!(o.qid, None);
    }

    #[test]
    fn display_includes_trader_and_price() {
        let o = Order::new("S00", Side::Ask, Price(95), 2.0);
        let s = format!("{o}");
        assert!(s.contains("S00"));
        assert!(s.contains("95"));
    }
}
