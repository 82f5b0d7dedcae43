//! A deterministic continuous-double-auction market simulator: limit
//! order book, matching engine, exogenous customer-order generator, and
//! a sum-type family of adaptive trading strategies (GVWY/ZIC/SHVR/SNPR,
//! PRZI/PRSH/PRDE, ZIP/ZIPSH/ZIPDE, and a handful of inventory-managing
//! strategies).
//!
//! Grounded in the teacher's module layout — one file per concern,
//! hand-rolled `Display + std::error::Error` types instead of derive
//! macros, `tracing` for structured logging, a single explicit RNG
//! handle threaded through every call rather than a global generator —
//! generalized from a general-purpose order book to this market's
//! trader-keyed, quantity-one, no-partial-fill semantics (spec §9).

pub mod book_side;
pub mod config;
pub mod customer;
pub mod error;
pub mod exchange;
pub mod level;
pub mod order;
pub mod rng;
pub mod schedule;
pub mod session;
pub mod side;
pub mod sinks;
pub mod snapshot;
pub mod tape;
pub mod trade;
pub mod trader;
pub mod types;

pub use config::{Cohort, SimConfig, TraderBlueprint};
pub use customer::{Assignment, CustomerGenerator};
pub use error::SimError;
pub use exchange::Exchange;
pub use order::Order;
pub use rng::SimRng;
pub use session::{Session, SessionSinks, SessionSummary};
pub use side::Side;
pub use snapshot::Snapshot;
pub use tape::{Tape, TapeEvent};
pub use trade::Trade;
pub use trader::{Strategy, TraderCore, TraderKind};
pub use types::{Price, QuoteId, Timestamp, TraderId};
