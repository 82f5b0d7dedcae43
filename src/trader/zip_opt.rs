//! ZIPSH / ZIPDE: meta-optimizers over a population of ZIP parameter
//! vectors `{m_buy, m_sell, beta, mu, c_a, c_r}` (spec §4.6), mirroring
//! the PRSH/PRDE treatment of PRZI strategy values in `prsh.rs`/`prde.rs`.

use super::{Strategy, TraderCore};
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Price, Timestamp, TraderId};

/// Sequential evaluation window is randomized in this range (spec §4.6).
pub const WAIT_TIME_LO: f64 = 7200.0;
pub const WAIT_TIME_HI: f64 = 10800.0;
pub const MARGIN_MUTATION_SIGMA: f64 = 0.025;
pub const COEFF_MUTATION_SIGMA: f64 = 0.0025;
const F: f64 = 0.8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StratVec {
    pub m_buy: f64,
    pub m_sell: f64,
    pub beta: f64,
    pub mu: f64,
    pub c_a: f64,
    pub c_r: f64,
}

impl StratVec {
    fn random(rng: &mut SimRng) -> Self {
        StratVec {
            m_buy: -rng.uniform_range(0.0, 1.0),
            m_sell: rng.uniform_range(0.0, 1.0),
            beta: rng.uniform_range(0.0, 1.0),
            mu: rng.uniform_range(0.0, 1.0),
            c_a: rng.uniform_range(0.0, 0.05),
            c_r: rng.uniform_range(0.0, 0.05),
        }
    }

    fn mutate(&self, rng: &mut SimRng) -> Self {
        StratVec {
            m_buy: (rng.gauss(self.m_buy, MARGIN_MUTATION_SIGMA)).clamp(-1.0, 0.0),
            m_sell: (rng.gauss(self.m_sell, MARGIN_MUTATION_SIGMA)).clamp(0.0, 1.0),
            beta: (rng.gauss(self.beta, MARGIN_MUTATION_SIGMA)).clamp(0.0, 1.0),
            mu: (rng.gauss(self.mu, MARGIN_MUTATION_SIGMA)).clamp(0.0, 1.0),
            c_a: (rng.gauss(self.c_a, COEFF_MUTATION_SIGMA)).clamp(0.0, 1.0),
            c_r: (rng.gauss(self.c_r, COEFF_MUTATION_SIGMA)).clamp(0.0, 1.0),
        }
    }

    fn differential(a: &StratVec, b: &StratVec, c: &StratVec) -> Self {
        let lerp = |x: f64, y: f64, z: f64, lo: f64, hi: f64| (x + F * (y - z)).clamp(lo, hi);
        StratVec {
            m_buy: lerp(a.m_buy, b.m_buy, c.m_buy, -1.0, 0.0),
            m_sell: lerp(a.m_sell, b.m_sell, c.m_sell, 0.0, 1.0),
            beta: lerp(a.beta, b.beta, c.beta, 0.0, 1.0),
            mu: lerp(a.mu, b.mu, c.mu, 0.0, 1.0),
            c_a: lerp(a.c_a, b.c_a, c.c_a, 0.0, 1.0),
            c_r: lerp(a.c_r, b.c_r, c.c_r, 0.0, 1.0),
        }
    }

    fn seed_margin(&self, side: Side) -> f64 {
        match side {
            Side::Bid => self.m_buy,
            Side::Ask => self.m_sell,
        }
    }
}

fn target_up(price: f64, c_a: f64, c_r: f64, rng: &mut SimRng) -> f64 {
    price + c_a * rng.uniform01() + price * c_r * rng.uniform01()
}

fn target_down(price: f64, c_a: f64, c_r: f64, rng: &mut SimRng) -> f64 {
    price - c_a * rng.uniform01() - price * c_r * rng.uniform01()
}

/// Shared live-trading state: the margin actually being quoted, evolved
/// by whichever strategy vector is currently active.
struct LiveMargin {
    side: Option<Side>,
    last_limit: Option<Price>,
    margin: f64,
    prev_change: f64,
    active: bool,
}

impl LiveMargin {
    fn new() -> Self {
        LiveMargin { side: None, last_limit: None, margin: 0.0, prev_change: 0.0, active: false }
    }

    fn current_price(&self, limit: Price) -> f64 {
        limit.0 as f64 * (1.0 + self.margin)
    }

    fn on_assign(&mut self, side: Side, limit: Price, strat: &StratVec) {
        if self.side != Some(side) {
            self.side = Some(side);
            self.margin = strat.seed_margin(side);
            self.prev_change = 0.0;
        }
        self.last_limit = Some(limit);
        self.active = true;
    }

    fn respond(&mut self, lob: &Snapshot, last_trade: Option<&Trade>, strat: &StratVec, rng: &mut SimRng) {
        let (Some(limit), Some(side)) = (self.last_limit, self.side) else { return };
        let current = self.current_price(limit);
        let target = match side {
            Side::Ask => {
                if let Some(trade) = last_trade {
                    let tp = trade.price.0 as f64;
                    if current <= tp {
                        Some(target_up(tp, strat.c_a, strat.c_r, rng))
                    } else {
                        lob.bids.best.filter(|_| self.active).filter(|b| b.0 as f64 >= current).map(|b| target_up(b.0 as f64, strat.c_a, strat.c_r, rng))
                    }
                } else {
                    lob.bids.best.filter(|_| self.active).filter(|b| current > b.0 as f64).map(|b| target_down(b.0 as f64, strat.c_a, strat.c_r, rng))
                }
            }
            Side::Bid => {
                if let Some(trade) = last_trade {
                    let tp = trade.price.0 as f64;
                    if current >= tp {
                        Some(target_down(tp, strat.c_a, strat.c_r, rng))
                    } else {
                        lob.asks.best.filter(|_| self.active).filter(|a| a.0 as f64 <= current).map(|a| target_down(a.0 as f64, strat.c_a, strat.c_r, rng))
                    }
                } else {
                    lob.asks.best.filter(|_| self.active).filter(|a| current < a.0 as f64).map(|a| target_up(a.0 as f64, strat.c_a, strat.c_r, rng))
                }
            }
        };
        if let Some(target) = target {
            let diff = target - current;
            let change = (1.0 - strat.mu) * (strat.beta * diff) + strat.mu * self.prev_change;
            self.prev_change = change;
            let new_price = current + change;
            let mut margin = new_price / limit.0 as f64 - 1.0;
            margin = match side {
                Side::Bid => margin.min(0.0),
                Side::Ask => margin.max(0.0),
            };
            self.margin = margin;
        }
    }

    fn quote(&self, tid: &TraderId, time: Timestamp) -> Option<Order> {
        let (limit, side) = (self.last_limit?, self.side?);
        let price = Price::clamp(self.current_price(limit).round() as i32);
        Some(Order::new(tid.clone(), side, price, time))
    }
}

struct PopRecord {
    strat: StratVec,
    start_t: Timestamp,
    baseline_balance: i64,
    pps: f64,
    evaluated: bool,
}

/// Sequential elite/mutant cycling over a population of ZIP parameter
/// vectors, analogous to `prsh::PrshTrader`.
pub struct ZipshTrader {
    core: TraderCore,
    pop: Vec<PopRecord>,
    active: usize,
    wait_time: f64,
    live: LiveMargin,
}

impl ZipshTrader {
    pub fn new(tid: TraderId, birthtime: Timestamp, rng: &mut SimRng, k: usize) -> Self {
        let k = k.max(1);
        let elite = StratVec::random(rng);
        let mut pop = Vec::with_capacity(k);
        pop.push(PopRecord { strat: elite, start_t: birthtime, baseline_balance: 0, pps: 0.0, evaluated: false });
        for _ in 1..k {
            pop.push(PopRecord {
                strat: elite.mutate(rng),
                start_t: birthtime,
                baseline_balance: 0,
                pps: 0.0,
                evaluated: false,
            });
        }
        let wait_time = rng.uniform_range(WAIT_TIME_LO, WAIT_TIME_HI);
        ZipshTrader { core: TraderCore::new(tid, "ZIPSH", birthtime), pop, active: 0, wait_time, live: LiveMargin::new() }
    }

    pub fn population(&self) -> Vec<StratVec> {
        self.pop.iter().map(|p| p.strat).collect()
    }

    fn tick(&mut self, time: Timestamp, rng: &mut SimRng) {
        let elapsed = time - self.pop[self.active].start_t;
        if elapsed < self.wait_time {
            return;
        }
        let profit = self.core.balance - self.pop[self.active].baseline_balance;
        self.pop[self.active].pps = profit as f64 / elapsed.max(1e-9);
        self.pop[self.active].evaluated = true;

        if self.pop.iter().all(|p| p.evaluated) {
            let mut ranked: Vec<usize> = (0..self.pop.len()).collect();
            ranked.sort_by(|&a, &b| self.pop[b].pps.partial_cmp(&self.pop[a].pps).unwrap());
            let elite = self.pop[ranked[0]].strat;
            for (i, rec) in self.pop.iter_mut().enumerate() {
                rec.strat = if i == 0 { elite } else { elite.mutate(rng) };
                rec.start_t = time;
                rec.baseline_balance = self.core.balance;
                rec.pps = 0.0;
                rec.evaluated = false;
            }
            self.wait_time = rng.uniform_range(WAIT_TIME_LO, WAIT_TIME_HI);
            self.active = 0;
        } else {
            self.active = (self.active + 1) % self.pop.len();
            self.pop[self.active].start_t = time;
            self.pop[self.active].baseline_balance = self.core.balance;
        }
    }
}

impl Strategy for ZipshTrader {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let (side, limit) = (a.side, a.limit);
        self.live.on_assign(side, limit, &self.pop[self.active].strat);
        self.live.quote(&self.core.tid, time)
    }

    fn respond(&mut self, time: Timestamp, lob: &Snapshot, last_trade: Option<&Trade>, rng: &mut SimRng) {
        self.live.respond(lob, last_trade, &self.pop[self.active].strat, rng);
        self.tick(time, rng);
    }
}

/// Differential-evolution analogue of `prde::PrdeTrader` over
/// `StratVec` populations.
pub struct ZipdeTrader {
    core: TraderCore,
    pop: Vec<StratVec>,
    candidate: StratVec,
    active_index: usize,
    eval_candidate: bool,
    window_start: Timestamp,
    baseline_balance: i64,
    s0_pps: f64,
    wait_time: f64,
    live: LiveMargin,
}

impl ZipdeTrader {
    pub fn new(tid: TraderId, birthtime: Timestamp, rng: &mut SimRng, k: usize) -> Self {
        let k = k.max(4);
        let pop: Vec<StratVec> = (0..k).map(|_| StratVec::random(rng)).collect();
        let candidate = Self::propose(&pop, 0, rng);
        ZipdeTrader {
            core: TraderCore::new(tid, "ZIPDE", birthtime),
            pop,
            candidate,
            active_index: 0,
            eval_candidate: false,
            window_start: birthtime,
            baseline_balance: 0,
            s0_pps: 0.0,
            wait_time: rng.uniform_range(WAIT_TIME_LO, WAIT_TIME_HI),
            live: LiveMargin::new(),
        }
    }

    pub fn population(&self) -> &[StratVec] {
        &self.pop
    }

    fn propose(pop: &[StratVec], exclude: usize, rng: &mut SimRng) -> StratVec {
        let mut idxs: Vec<usize> = (0..pop.len()).filter(|&i| i != exclude).collect();
        rng.shuffle(&mut idxs);
        if idxs.len() < 3 {
            return StratVec::random(rng);
        }
        StratVec::differential(&pop[idxs[0]], &pop[idxs[1]], &pop[idxs[2]])
    }

    fn active_strat(&self) -> StratVec {
        if self.eval_candidate { self.candidate } else { self.pop[self.active_index] }
    }

    fn tick(&mut self, time: Timestamp, rng: &mut SimRng) {
        let elapsed = time - self.window_start;
        if elapsed < self.wait_time {
            return;
        }
        let profit = self.core.balance - self.baseline_balance;
        let pps = profit as f64 / elapsed.max(1e-9);

        if !self.eval_candidate {
            self.s0_pps = pps;
            self.eval_candidate = true;
        } else {
            if pps > self.s0_pps {
                self.pop[self.active_index] = self.candidate;
            }
            self.active_index = (self.active_index + 1) % self.pop.len();
            self.candidate = Self::propose(&self.pop, self.active_index, rng);
            self.eval_candidate = false;
            self.wait_time = rng.uniform_range(WAIT_TIME_LO, WAIT_TIME_HI);
        }
        self.window_start = time;
        self.baseline_balance = self.core.balance;
    }
}

impl Strategy for ZipdeTrader {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        let (side, limit) = (a.side, a.limit);
        let strat = self.active_strat();
        self.live.on_assign(side, limit, &strat);
        self.live.quote(&self.core.tid, time)
    }

    fn respond(&mut self, time: Timestamp, lob: &Snapshot, last_trade: Option<&Trade>, rng: &mut SimRng) {
        let strat = self.active_strat();
        self.live.respond(lob, last_trade, &strat, rng);
        self.tick(time, rng);
    }
}
