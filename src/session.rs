//! Single-threaded cooperative session driver (spec §4.9).
//!
//! Grounded in the teacher's exchange-owns-state style: there is no
//! thread pool and no global RNG — a single `SimRng` handle is threaded
//! through every call, so a session seeded identically replays bit for
//! bit (spec §9, "determinism requires a single explicit RNG handle").

use crate::config::{Cohort, SimConfig};
use crate::customer::CustomerGenerator;
use crate::error::SimError;
use crate::exchange::Exchange;
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::sinks::CsvSink;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::trader::{AssignOutcome, TraderKind};
use crate::types::{Timestamp, TraderId};
use rustc_hash::FxHashMap;
use std::io::Write;
use tracing::{info, warn};

/// How often (in simulated seconds) a fresh LOB-frame line is considered
/// for emission (spec §6).
const LOB_FRAME_INTERVAL: f64 = 10.0;

/// Summary printed at the end of a session (spec §6, session-summary log
/// line).
#[derive(Clone, Debug)]
pub struct SessionSummary {
    pub n_trades: u64,
    pub n_traders: usize,
    pub final_time: Timestamp,
}

/// The four append-only output sinks a session writes to (spec §6).
pub struct SessionSinks<W: Write> {
    pub tape: CsvSink<W>,
    pub lob: CsvSink<W>,
    pub balances: CsvSink<W>,
    pub blotter: CsvSink<W>,
}

/// Drives one session to completion against a fixed population and
/// supply/demand schedule.
pub struct Session<W: Write> {
    exchange: Exchange,
    traders: FxHashMap<TraderId, TraderKind>,
    order: Vec<TraderId>,
    generator: CustomerGenerator,
    rng: SimRng,
    time: Timestamp,
    endtime: Timestamp,
    timestep: Timestamp,
    replenish_interval: Timestamp,
    next_replenish: Timestamp,
    last_emitted_frame: Option<String>,
    sinks: SessionSinks<W>,
}

fn expand_cohorts(cohorts: &[Cohort], rng: &mut SimRng) -> Vec<(TraderId, TraderKind)> {
    let mut out = Vec::new();
    for cohort in cohorts {
        for tid in cohort.trader_ids() {
            out.push((tid.clone(), TraderKind::new(&cohort.kind, tid, 0.0, rng)));
        }
    }
    out
}

/// Validates configuration-time invariants that must abort session
/// construction rather than fail mid-run (spec §7): PRDE/ZIPDE require a
/// population of at least four strategies.
fn validate_cohorts(cohorts: &[Cohort]) -> Result<(), SimError> {
    for cohort in cohorts {
        match cohort.kind {
            crate::config::TraderBlueprint::Prde { k } | crate::config::TraderBlueprint::Zipde { k } => {
                crate::trader::prde::validate_k(k)?;
            }
            _ => {}
        }
    }
    Ok(())
}

impl<W: Write> Session<W> {
    pub fn new(config: &SimConfig, mut sinks: SessionSinks<W>) -> Result<Self, SimError> {
        validate_cohorts(&config.buyers)?;
        validate_cohorts(&config.sellers)?;

        let _ = sinks.balances.write_line(crate::sinks::BALANCES_HEADER);
        let _ = sinks.blotter.write_line(crate::sinks::BLOTTER_HEADER);

        let mut rng = SimRng::seeded(config.seed);
        let buyers = expand_cohorts(&config.buyers, &mut rng);
        let sellers = expand_cohorts(&config.sellers, &mut rng);

        let buyer_ids: Vec<TraderId> = buyers.iter().map(|(tid, _)| tid.clone()).collect();
        let seller_ids: Vec<TraderId> = sellers.iter().map(|(tid, _)| tid.clone()).collect();

        let mut traders: FxHashMap<TraderId, TraderKind> = FxHashMap::default();
        let mut order = Vec::with_capacity(buyers.len() + sellers.len());
        for (tid, trader) in buyers.into_iter().chain(sellers) {
            order.push(tid.clone());
            traders.insert(tid, trader);
        }

        let n_total = order.len().max(1);
        let generator = CustomerGenerator {
            demand: config.demand.clone(),
            supply: config.supply.clone(),
            buyer_ids,
            seller_ids,
            shuffle_times: config.shuffle_times,
        };

        Ok(Session {
            exchange: Exchange::new(),
            traders,
            order,
            generator,
            rng,
            time: 0.0,
            endtime: config.endtime,
            timestep: 1.0 / n_total as f64,
            replenish_interval: config.replenish_interval,
            next_replenish: 0.0,
            last_emitted_frame: None,
            sinks,
        })
    }

    /// Runs the session to completion. Any `SimError` aborts the run
    /// immediately — these represent protocol violations, not recoverable
    /// book states (spec §7).
    pub fn run(&mut self) -> Result<SessionSummary, SimError> {
        let mut n_trades = 0u64;
        while self.time < self.endtime {
            n_trades += self.tick()? as u64;
            self.time += self.timestep;
        }
        self.write_no_trades_trailers();
        let _ = self.sinks.tape.flush();
        let _ = self.sinks.lob.flush();
        let _ = self.sinks.balances.flush();
        let _ = self.sinks.blotter.flush();

        let summary = SessionSummary { n_trades, n_traders: self.order.len(), final_time: self.time };
        info!(
            n_trades = summary.n_trades,
            n_traders = summary.n_traders,
            final_time = summary.final_time,
            "session complete"
        );
        Ok(summary)
    }

    /// Runs one discrete timestep: customer-queue drain, cancellations,
    /// a single randomly-polled trader, matching, bookkeeping, broadcast
    /// respond (spec §4.9). Returns whether a trade was executed this tick.
    fn tick(&mut self) -> Result<bool, SimError> {
        self.replenish_if_due()?;

        let polled = self.order[self.rng.index(self.order.len())].clone();
        let snapshot = self.exchange.publish_lob(self.time);
        let trader = self.traders.get_mut(&polled).expect("session trader roster is fixed at construction");
        let countdown = trader
            .core()
            .assignment
            .as_ref()
            .map(|a| (1.0 - (self.time - a.issue_time) / self.replenish_interval.max(1e-9)).clamp(0.0, 1.0))
            .unwrap_or(0.0);

        let mut last_trade: Option<Trade> = None;
        if let Some(quoted) = trader.get_order(self.time, countdown, &snapshot, &mut self.rng) {
            self.validate_against_limit(&quoted)?;
            let trade = self.exchange.process_order(self.time, quoted)?;
            if let Some(trade) = &trade {
                self.settle(trade)?;
                last_trade = Some(trade.clone());
            }
        }

        let final_snapshot = self.exchange.publish_lob(self.time);
        for tid in &self.order {
            let trader = self.traders.get_mut(tid).expect("session trader roster is fixed at construction");
            trader.respond(self.time, &final_snapshot, last_trade.as_ref(), &mut self.rng);
        }

        self.maybe_emit_frame(&final_snapshot);
        Ok(last_trade.is_some())
    }

    /// Writes the blotter trailer for every trader that never executed a
    /// trade this session (spec §6, "a trader with no trades writes a
    /// single `<tid>,No trades` line").
    fn write_no_trades_trailers(&mut self) {
        for tid in &self.order {
            let trader = self.traders.get(tid).expect("session trader roster is fixed at construction");
            if trader.core().n_trades == 0 {
                let _ = self.sinks.blotter.write_line(&format!("{tid},No trades"));
            }
        }
    }

    fn replenish_if_due(&mut self) -> Result<(), SimError> {
        if self.time < self.next_replenish {
            return Ok(());
        }
        let assignments = self.generator.generate(self.time, &mut self.rng)?;
        for assignment in assignments {
            let tid = assignment.trader_id.clone();
            let side = assignment.side;
            if let Some(trader) = self.traders.get_mut(&tid) {
                if trader.assign(assignment) == AssignOutcome::LobCancel {
                    if let Some(event) = self.exchange.del_order(self.time, side, &tid) {
                        let _ = self.sinks.tape.write_line(&event.to_string());
                    }
                }
            }
        }
        self.next_replenish = self.time + self.replenish_interval;
        Ok(())
    }

    fn validate_against_limit(&self, order: &Order) -> Result<(), SimError> {
        let Some(trader) = self.traders.get(&order.trader_id) else { return Ok(()) };
        let Some(a) = trader.core().assignment.as_ref() else { return Ok(()) };
        match order.side {
            Side::Bid if order.price.0 > a.limit.0 => Err(SimError::OrderAboveLimit {
                trader_id: order.trader_id.clone(),
                price: order.price.0,
                limit: a.limit.0,
            }),
            Side::Ask if order.price.0 < a.limit.0 => Err(SimError::OrderBelowLimit {
                trader_id: order.trader_id.clone(),
                price: order.price.0,
                limit: a.limit.0,
            }),
            _ => Ok(()),
        }
    }

    fn settle(&mut self, trade: &Trade) -> Result<(), SimError> {
        let post_trade = self.exchange.publish_lob(self.time);
        let bid = post_trade.best_bid();
        let ask = post_trade.best_ask();
        let mid = match (bid, ask) {
            (Some(b), Some(a)) => Some((b.0 as f64 + a.0 as f64) / 2.0),
            _ => None,
        };
        let spread = post_trade.spread();
        let fmt_opt_i = |v: Option<crate::types::Price>| v.map(|p| p.0.to_string()).unwrap_or_default();
        let fmt_opt_f = |v: Option<f64>| v.map(|p| format!("{p:.2}")).unwrap_or_default();

        // party1 is the resting maker, party2 the incoming taker (spec
        // §4.2) — their sides are opposite, not fixed seller/buyer roles.
        for (tid, my_side) in [(&trade.party1, trade.taker_side.opposite()), (&trade.party2, trade.taker_side)] {
            let Some(trader) = self.traders.get_mut(tid) else {
                warn!(trader_id = tid, "trade settled against an unknown trader id");
                continue;
            };
            let profit = trader.bookkeep(self.time, trade, my_side)?;
            let line = format!(
                "{},{:.3},{},{},{},{}",
                tid, self.time, trade.price.0, 1, trade.party1, trade.party2
            );
            let _ = self.sinks.blotter.write_line(&line);
            let _ = profit;
            let balances_line = format!(
                "S1,{:.3},{},{},{},{},{},{},{}",
                self.time,
                fmt_opt_i(bid),
                fmt_opt_i(ask),
                fmt_opt_f(mid),
                spread.map(|s| s.to_string()).unwrap_or_default(),
                tid,
                trader.core().balance,
                trader.core().net_worth()
            );
            let _ = self.sinks.balances.write_line(&balances_line);
        }
        let _ = self.sinks.tape.write_line(&trade.to_string());
        Ok(())
    }

    fn maybe_emit_frame(&mut self, snapshot: &Snapshot) {
        let due = match self.last_emitted_frame.as_ref() {
            None => true,
            Some(_) => (snapshot.time / LOB_FRAME_INTERVAL).floor()
                > ((snapshot.time - self.timestep) / LOB_FRAME_INTERVAL).floor(),
        };
        if !due {
            return;
        }
        let frame = snapshot.to_frame_string();
        if self.last_emitted_frame.as_deref() != Some(frame.as_str()) {
            let _ = self.sinks.lob.write_line(&frame);
            self.last_emitted_frame = Some(frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TraderBlueprint;
    use crate::schedule::{PriceRange, Schedule, StepMode, TimeMode, Zone};

    fn flat_schedule(lo: i32, hi: i32) -> Schedule {
        Schedule {
            zones: vec![Zone { from: 0.0, to: 100_000.0, ranges: vec![PriceRange::fixed(lo, hi)], stepmode: StepMode::Fixed }],
            timemode: TimeMode::Periodic,
            interval: 1.0,
            fittointerval: false,
            noise_sigma: 0.0,
        }
    }

    fn tiny_config() -> SimConfig {
        SimConfig {
            endtime: 5.0,
            seed: 7,
            buyers: vec![Cohort { prefix: "B".into(), count: 2, kind: TraderBlueprint::Zic }],
            sellers: vec![Cohort { prefix: "S".into(), count: 2, kind: TraderBlueprint::Zic }],
            demand: flat_schedule(100, 150),
            supply: flat_schedule(50, 100),
            shuffle_times: false,
            replenish_interval: 2.0,
        }
    }

    fn sinks() -> SessionSinks<Vec<u8>> {
        SessionSinks {
            tape: CsvSink::new(Vec::new()),
            lob: CsvSink::new(Vec::new()),
            balances: CsvSink::new(Vec::new()),
            blotter: CsvSink::new(Vec::new()),
        }
    }

    #[test]
    fn runs_to_completion_without_error() {
        let config = tiny_config();
        let mut session = Session::new(&config, sinks()).unwrap();
        let summary = session.run().unwrap();
        assert_eq!(summary.n_traders, 4);
        assert!(summary.final_time >= config.endtime);
    }

    #[test]
    fn timestep_matches_reciprocal_of_population() {
        let config = tiny_config();
        let session = Session::new(&config, sinks()).unwrap();
        assert!((session.timestep - 0.25).abs() < 1e-9);
    }

    #[test]
    fn same_seed_reproduces_trade_count() {
        let config = tiny_config();
        let n1 = Session::new(&config, sinks()).unwrap().run().unwrap().n_trades;
        let n2 = Session::new(&config, sinks()).unwrap().run().unwrap().n_trades;
        assert_eq!(n1, n2);
    }

    #[test]
    fn rejects_prde_cohort_with_fewer_than_four_strategies() {
        let mut config = tiny_config();
        config.buyers.push(Cohort { prefix: "D".into(), count: 1, kind: TraderBlueprint::Prde { k: 2 } });
        let err = Session::new(&config, sinks()).unwrap_err();
        assert!(matches!(err, SimError::PrdeRequiresAtLeastFourStrategies { k: 2 }));
    }

    #[test]
    fn blotter_carries_header_and_no_trades_trailer_for_idle_traders() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedBuf(Rc<RefCell<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                self.0.borrow_mut().flush()
            }
        }

        let blotter_buf = Rc::new(RefCell::new(Vec::new()));
        let sinks = SessionSinks {
            tape: CsvSink::new(SharedBuf(Rc::new(RefCell::new(Vec::new())))),
            lob: CsvSink::new(SharedBuf(Rc::new(RefCell::new(Vec::new())))),
            balances: CsvSink::new(SharedBuf(Rc::new(RefCell::new(Vec::new())))),
            blotter: CsvSink::new(SharedBuf(blotter_buf.clone())),
        };

        // Non-overlapping demand/supply ranges mean no ZIC quote can ever
        // cross, so no trader ever trades regardless of how many ticks run.
        let mut config = tiny_config();
        config.demand = flat_schedule(10, 20);
        config.supply = flat_schedule(200, 250);
        let mut session = Session::new(&config, sinks).unwrap();
        session.run().unwrap();

        let contents = String::from_utf8(blotter_buf.borrow().clone()).unwrap();
        assert!(contents.starts_with(crate::sinks::BLOTTER_HEADER));
        assert!(contents.lines().filter(|l| *l != crate::sinks::BLOTTER_HEADER).all(|l| l.ends_with(",No trades")));
        assert_eq!(contents.lines().count(), 1 + config.buyers[0].count + config.sellers[0].count);
    }

    #[test]
    fn reassigning_a_trader_with_a_live_quote_writes_a_cancel_to_the_tape_sink() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct SharedBuf(Rc<RefCell<Vec<u8>>>);
        impl Write for SharedBuf {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.borrow_mut().write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                self.0.borrow_mut().flush()
            }
        }

        let tape_buf = Rc::new(RefCell::new(Vec::new()));
        let sinks = SessionSinks {
            tape: CsvSink::new(SharedBuf(tape_buf.clone())),
            lob: CsvSink::new(SharedBuf(Rc::new(RefCell::new(Vec::new())))),
            balances: CsvSink::new(SharedBuf(Rc::new(RefCell::new(Vec::new())))),
            blotter: CsvSink::new(SharedBuf(Rc::new(RefCell::new(Vec::new())))),
        };

        // Non-crossing demand/supply means B00's quotes never fill, so it
        // keeps a live quote resting between replenishments; with only
        // two traders and ten ticks per 5s replenishment window, it is
        // polled (and so holds a live quote) before the next assignment
        // arrives with overwhelming probability, forcing an
        // `AssignOutcome::LobCancel` and an exchange-side cancel.
        let mut config = tiny_config();
        config.buyers = vec![Cohort { prefix: "B".into(), count: 1, kind: TraderBlueprint::Zic }];
        config.sellers = vec![Cohort { prefix: "S".into(), count: 1, kind: TraderBlueprint::Zic }];
        config.demand = flat_schedule(10, 20);
        config.supply = flat_schedule(200, 250);
        config.replenish_interval = 5.0;
        config.endtime = 60.0;

        let mut session = Session::new(&config, sinks).unwrap();
        session.run().unwrap();

        let contents = String::from_utf8(tape_buf.borrow().clone()).unwrap();
        assert!(
            contents.lines().any(|l| l.trim_start().starts_with("CAN,")),
            "expected at least one CAN line on the tape sink, got:\n{contents}"
        );
    }
}
