//! Customer-order generator: turns a supply/demand schedule into
//! per-trader assignments with arrival times (spec §4.8).

use crate::error::SimError;
use crate::rng::SimRng;
use crate::schedule::Schedule;
use crate::side::Side;
use crate::types::{Price, Timestamp, TraderId};

/// An exogenous instruction to a trader to buy or sell at or better than
/// `limit`, delivered to the trader at `issue_time` (spec glossary,
/// "Customer assignment").
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    pub trader_id: TraderId,
    pub side: Side,
    pub limit: Price,
    pub issue_time: Timestamp,
}

/// Produces one replenishment batch of assignments for a fixed buyer and
/// seller population, given the demand/supply schedules that govern
/// their prices and arrival timing.
#[derive(Clone, Debug)]
pub struct CustomerGenerator {
    pub demand: Schedule,
    pub supply: Schedule,
    pub buyer_ids: Vec<TraderId>,
    pub seller_ids: Vec<TraderId>,
    /// Whether to shuffle the assignment of issue times to traders
    /// within each side (spec §4.8 step 3).
    pub shuffle_times: bool,
}

impl CustomerGenerator {
    /// Generates one batch of assignments for all buyers and sellers,
    /// with issue times relative to `base_time`.
    pub fn generate(
        &self,
        base_time: Timestamp,
        rng: &mut SimRng,
    ) -> Result<Vec<Assignment>, SimError> {
        let mut out = Vec::with_capacity(self.buyer_ids.len() + self.seller_ids.len());
        out.extend(self.generate_side(
            &self.demand,
            &self.buyer_ids,
            Side::Bid,
            base_time,
            rng,
        )?);
        out.extend(self.generate_side(
            &self.supply,
            &self.seller_ids,
            Side::Ask,
            base_time,
            rng,
        )?);
        Ok(out)
    }

    fn generate_side(
        &self,
        schedule: &Schedule,
        trader_ids: &[TraderId],
        side: Side,
        base_time: Timestamp,
        rng: &mut SimRng,
    ) -> Result<Vec<Assignment>, SimError> {
        let n = trader_ids.len();
        let mut times = schedule.issue_times(n, base_time, rng);
        if self.shuffle_times {
            rng.shuffle(&mut times);
        }

        let mut out = Vec::with_capacity(n);
        for (i, trader_id) in trader_ids.iter().enumerate() {
            let limit = schedule.price_for(i, n, base_time, rng)?;
            out.push(Assignment {
                trader_id: trader_id.clone(),
                side,
                limit,
                issue_time: times[i],
            });
        }
        Ok(out)
    }
}
