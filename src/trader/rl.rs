//! Tabular Q-learning trader (spec §4.7): a small discrete state/action
//! space learned on-line with an epsilon-greedy policy.

use super::{Strategy, TraderCore};
use crate::customer::Assignment;
use crate::order::Order;
use crate::rng::SimRng;
use crate::side::Side;
use crate::snapshot::Snapshot;
use crate::trade::Trade;
use crate::types::{Price, Timestamp, TraderId};
use std::collections::HashMap;

const ALPHA: f64 = 0.1;
const GAMMA: f64 = 0.9;
const EPSILON_DECAY: f64 = 0.999;
const EPSILON_FLOOR: f64 = 0.1;
const TREND_WINDOW: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Action {
    Buy,
    Sell,
    Hold,
}

const ACTIONS: [Action; 3] = [Action::Buy, Action::Sell, Action::Hold];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct State {
    trend_up: bool,
    balance_bin: u8,
}

/// Tabular Q-learning agent trading a single inventory slot (spec §4.7).
/// Self-issues its buy/sell job in `respond`, mirroring the other
/// inventory-managing strategies in `inventory.rs`.
pub struct RlAgent {
    core: TraderCore,
    q: HashMap<(State, Action), f64>,
    epsilon: f64,
    last_mid: Option<f64>,
    last_state_action: Option<(State, Action)>,
    pending_reward_base: Option<i64>,
}

impl RlAgent {
    pub fn new(tid: TraderId, birthtime: Timestamp) -> Self {
        RlAgent {
            core: TraderCore::new(tid, "RL", birthtime),
            q: HashMap::new(),
            epsilon: 0.3,
            last_mid: None,
            last_state_action: None,
            pending_reward_base: None,
        }
    }

    fn balance_bin(&self) -> u8 {
        match self.core.balance {
            b if b < 0 => 0,
            b if b == 0 => 1,
            _ => 2,
        }
    }

    fn state(&self, mid: f64) -> State {
        let trend_up = self.last_mid.map_or(true, |prev| mid >= prev);
        State { trend_up, balance_bin: self.balance_bin() }
    }

    fn q_value(&self, state: State, action: Action) -> f64 {
        *self.q.get(&(state, action)).unwrap_or(&0.0)
    }

    fn best_action(&self, state: State) -> (Action, f64) {
        ACTIONS
            .iter()
            .map(|&a| (a, self.q_value(state, a)))
            .fold((Action::Hold, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    fn choose_action(&self, state: State, rng: &mut SimRng) -> Action {
        if rng.uniform01() < self.epsilon {
            ACTIONS[rng.index(ACTIONS.len())]
        } else {
            self.best_action(state).0
        }
    }

    /// `reward = signed cash-flow of the trade just executed`, read
    /// before `TraderCore::bookkeep` clears `last_purchase_price` (same
    /// reward-before-clear discipline as the generic bookkeeping path,
    /// spec §9).
    fn learn(&mut self, reward: f64, next_state: State) {
        let Some((state, action)) = self.last_state_action else { return };
        let best_next = self.best_action(next_state).1.max(0.0);
        let current = self.q_value(state, action);
        let updated = current + ALPHA * (reward + GAMMA * best_next - current);
        self.q.insert((state, action), updated);
        self.epsilon = (self.epsilon * EPSILON_DECAY).max(EPSILON_FLOOR);
    }
}

impl Strategy for RlAgent {
    fn core(&self) -> &TraderCore {
        &self.core
    }
    fn core_mut(&mut self) -> &mut TraderCore {
        &mut self.core
    }
    fn is_inventory_managed(&self) -> bool {
        true
    }

    fn get_order(&mut self, time: Timestamp, _countdown: f64, _lob: &Snapshot, _rng: &mut SimRng) -> Option<Order> {
        let a = self.core.assignment.as_ref()?;
        Some(Order::new(self.core.tid.clone(), a.side, a.limit, time))
    }

    fn respond(&mut self, time: Timestamp, lob: &Snapshot, _last_trade: Option<&Trade>, rng: &mut SimRng) {
        let Some(mid) = lob.mid_price() else { return };
        let state = self.state(mid);

        if let Some(base) = self.pending_reward_base.take() {
            let reward = (self.core.balance - base) as f64;
            self.learn(reward, state);
        }

        let action = self.choose_action(state, rng);
        self.last_state_action = Some((state, action));
        self.pending_reward_base = Some(self.core.balance);
        self.last_mid = Some(mid);

        self.core.assignment = match (action, self.core.last_purchase_price) {
            (Action::Buy, None) => lob.asks.best.map(|best_ask| Assignment {
                trader_id: self.core.tid.clone(),
                side: Side::Bid,
                limit: best_ask,
                issue_time: time,
            }),
            (Action::Sell, Some(purchase_price)) => lob.bids.best.map(|best_bid| Assignment {
                trader_id: self.core.tid.clone(),
                side: Side::Ask,
                limit: best_bid.max(purchase_price),
                issue_time: time,
            }),
            _ => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(best_bid: Option<Price>, best_ask: Option<Price>) -> Snapshot {
        let mut snap = crate::trader::fixed::tests_support::empty_snapshot();
        snap.bids.best = best_bid;
        snap.asks.best = best_ask;
        snap
    }

    #[test]
    fn epsilon_decays_toward_floor() {
        let mut t = RlAgent::new("RL0".into(), 0.0);
        let mut rng = SimRng::seeded(1);
        let snap = snapshot_with(Some(Price(95)), Some(Price(105)));
        for i in 0..2000 {
            t.respond(i as f64, &snap, None, &mut rng);
        }
        assert!(t.epsilon >= EPSILON_FLOOR);
        assert!(t.epsilon < 0.3);
    }

    #[test]
    fn buy_action_without_inventory_issues_bid_assignment() {
        let mut t = RlAgent::new("RL0".into(), 0.0);
        t.last_state_action = Some((State { trend_up: true, balance_bin: 1 }, Action::Buy));
        t.q.insert((State { trend_up: true, balance_bin: 1 }, Action::Buy), 100.0);
        let mut rng = SimRng::seeded(2);
        let snap = snapshot_with(Some(Price(95)), Some(Price(105)));
        t.respond(1.0, &snap, None, &mut rng);
        if let Some(a) = &t.core.assignment {
            assert_eq!(a.side, Side::Bid);
        }
    }

    #[test]
    fn reward_is_computed_before_bookkeep_would_clear_purchase_price() {
        let mut t = RlAgent::new("RL0".into(), 0.0);
        t.pending_reward_base = Some(0);
        t.core.balance = 20;
        t.last_state_action = Some((State { trend_up: true, balance_bin: 2 }, Action::Sell));
        let snap = snapshot_with(Some(Price(95)), Some(Price(105)));
        let mut rng = SimRng::seeded(3);
        t.respond(1.0, &snap, None, &mut rng);
        assert!(t.q.contains_key(&(State { trend_up: true, balance_bin: 2 }, Action::Sell)));
    }
}
