//! The trade tape: a bounded, append-only record of trade and cancel
//! events (spec §3 "Tape").

use crate::side::Side;
use crate::trade::Trade;
use crate::types::{Price, QuoteId, Timestamp};
use std::collections::VecDeque;
use std::fmt;

/// One tape entry.
#[derive(Clone, Debug, PartialEq)]
pub enum TapeEvent {
    Trade(Trade),
    Cancel { time: Timestamp, qid: Option<QuoteId>, side: Side, price: Price },
}

impl fmt::Display for TapeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TapeEvent::Trade(t) => write!(f, "{t}"),
            TapeEvent::Cancel { time, qid, side, price } => write!(
                f,
                "CAN, {time:010.3}, {}, {side}, {price}",
                qid.map(|q| q.0 as i64).unwrap_or(-1)
            ),
        }
    }
}

/// Chronological, right-truncated record of tape events.
#[derive(Clone, Debug)]
pub struct Tape {
    events: VecDeque<TapeEvent>,
}

impl Tape {
    /// Maximum number of events retained (spec §6, `tape_length=10000`).
    pub const CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Tape { events: VecDeque::with_capacity(Self::CAPACITY) }
    }

    /// Appends an event, right-truncating the oldest entry if at capacity.
    pub fn push(&mut self, event: TapeEvent) {
        if self.events.len() == Self::CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TapeEvent> {
        self.events.iter()
    }

    pub fn last(&self) -> Option<&TapeEvent> {
        self.events.back()
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}
