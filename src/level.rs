//! Arrival-ordered queue of orders resting at a single price.

use crate::types::{QuoteId, Timestamp, TraderId};
use std::collections::VecDeque;

/// One order's arrival record within a price level. Quantity is always
/// `1` (spec §1 Non-goals), so the level's aggregate quantity is just its
/// arrival count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arrival {
    pub time: TimeBits,
    pub trader_id: TraderId,
    pub qid: Option<QuoteId>,
}

/// Bit-pattern wrapper so arrival records can derive `Eq` over an `f64`
/// timestamp without claiming a total order on floats in general.
#[derive(Clone, Copy, Debug)]
pub struct TimeBits(pub Timestamp);

impl PartialEq for TimeBits {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}
impl Eq for TimeBits {}

/// FIFO queue of orders resting at one price, sorted by arrival time
/// ascending: the front is the time-priority head (spec §4.1).
#[derive(Clone, Debug, Default)]
pub struct PriceLevel {
    pub arrivals: VecDeque<Arrival>,
}

impl PriceLevel {
    pub fn new() -> Self {
        PriceLevel { arrivals: VecDeque::new() }
    }

    /// Aggregate quantity at this level (each arrival contributes 1).
    pub fn aggregate_qty(&self) -> u64 {
        self.arrivals.len() as u64
    }

    /// Inserts an arrival, keeping the queue sorted by time ascending.
    pub fn insert_sorted(&mut self, time: Timestamp, trader_id: TraderId, qid: Option<QuoteId>) {
        let pos = self
            .arrivals
            .iter()
            .position(|a| a.time.0 > time)
            .unwrap_or(self.arrivals.len());
        self.arrivals.insert(
            pos,
            Arrival { time: TimeBits(time), trader_id, qid },
        );
    }

    /// The time-priority head, i.e. the earliest-arrived order.
    pub fn head(&self) -> Option<&Arrival> {
        self.arrivals.front()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sorted_keeps_ascending_time() {
        let mut lvl = PriceLevel::new();
        lvl.insert_sorted(2.0, "B".into(), None);
        lvl.insert_sorted(1.0, "A".into(), None);
        lvl.insert_sorted(3.0, "C".into(), None);
        let times: Vec<f64> = lvl.arrivals.iter().map(|a| a.time.0).collect();
        assert_eq!(times, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn head_is_earliest_arrival() {
        let mut lvl = PriceLevel::new();
        lvl.insert_sorted(5.0, "late".into(), None);
        lvl.insert_sorted(1.0, "early".into(), None);
        assert_eq!(lvl.head().unwrap().trader_id, "early");
    }

    #[test]
    fn aggregate_qty_counts_arrivals() {
        let mut lvl = PriceLevel::new();
        assert_eq!(lvl.aggregate_qty(), 0);
        lvl.insert_sorted(1.0, "A".into(), None);
        lvl.insert_sorted(2.0, "B".into(), None);
        assert_eq!(lvl.aggregate_qty(), 2);
    }
}
