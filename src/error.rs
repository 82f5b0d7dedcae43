//! Error types for configuration and protocol violations.
//!
//! Matches the hand-rolled `Display + std::error::Error` idiom the rest of
//! this crate uses rather than a derive macro: configuration and
//! protocol-violation failures are fatal and abort the session (spec §7),
//! while recoverable book states (deleting an absent order, an empty-side
//! best-price query) are modeled with `Option`, never `Err`.

use std::fmt;

/// Fatal errors the simulator can raise. The session driver aborts on any
/// of these rather than attempting to repair state in place.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// A schedule or CLI configuration named a stepmode the generator does
    /// not recognize.
    UnknownStepMode(String),
    /// A schedule or CLI configuration named a timemode the generator does
    /// not recognize.
    UnknownTimeMode(String),
    /// The session clock has advanced past every zone's `[from, to)` range.
    TimeOutsideSchedule { time: f64 },
    /// PRDE requires a population of at least four strategies.
    PrdeRequiresAtLeastFourStrategies { k: usize },
    /// A trader quoted a Bid above its assignment limit.
    OrderAboveLimit { trader_id: String, price: i32, limit: i32 },
    /// A trader quoted an Ask below its assignment limit.
    OrderBelowLimit { trader_id: String, price: i32, limit: i32 },
    /// An inventory-naive strategy realized a negative profit on a trade.
    NegativeProfitForNaiveTrader { trader_id: String, profit: i32 },
    /// An order carried a side the exchange cannot route.
    MalformedOrder,
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::UnknownStepMode(s) => write!(f, "unknown stepmode: {s}"),
            SimError::UnknownTimeMode(s) => write!(f, "unknown timemode: {s}"),
            SimError::TimeOutsideSchedule { time } => {
                write!(f, "time {time} falls outside every schedule zone")
            }
            SimError::PrdeRequiresAtLeastFourStrategies { k } => {
                write!(f, "PRDE requires k >= 4 strategies, got {k}")
            }
            SimError::OrderAboveLimit { trader_id, price, limit } => write!(
                f,
                "trader {trader_id} quoted bid {price} above its limit {limit}"
            ),
            SimError::OrderBelowLimit { trader_id, price, limit } => write!(
                f,
                "trader {trader_id} quoted ask {price} below its limit {limit}"
            ),
            SimError::NegativeProfitForNaiveTrader { trader_id, profit } => write!(
                f,
                "trader {trader_id} realized negative profit {profit} despite being inventory-naive"
            ),
            SimError::MalformedOrder => write!(f, "order carried an unroutable side"),
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_offending_value() {
        let err = SimError::UnknownStepMode("banana".into());
        assert!(format!("{err}").contains("banana"));
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> =
            Box::new(SimError::PrdeRequiresAtLeastFourStrategies { k: 2 });
        assert!(err.to_string().contains("k >= 4"));
    }
}
