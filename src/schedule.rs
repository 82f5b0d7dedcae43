//! The supply/demand schedule DSL (spec §3, §4.8, §6).
//!
//! Modeled as ordinary Rust data per SPEC_FULL §6: zones carry price
//! ranges with optional dynamic-offset closures, grounded in spec §9's
//! guidance to "represent as a small closure type ... two-valued offsets
//! are a distinct variant of the same interface."

use crate::error::SimError;
use crate::rng::SimRng;
use crate::types::{Price, Timestamp};
use std::fmt;
use std::sync::Arc;

/// A time-varying price offset, `t -> delta`. Not serializable: always
/// supplied by calling Rust code (SPEC_FULL §6).
pub type OffsetClosure = Arc<dyn Fn(Timestamp) -> i32 + Send + Sync>;

/// Per-range dynamic offset: none, one shared offset applied to both
/// bounds, or independent offsets for the low/high bound.
#[derive(Clone)]
pub enum Offset {
    None,
    Shared(OffsetClosure),
    MinMax(OffsetClosure, OffsetClosure),
}

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::None => write!(f, "Offset::None"),
            Offset::Shared(_) => write!(f, "Offset::Shared(<fn>)"),
            Offset::MinMax(..) => write!(f, "Offset::MinMax(<fn>, <fn>)"),
        }
    }
}

impl Offset {
    fn apply_lo(&self, t: Timestamp) -> i32 {
        match self {
            Offset::None => 0,
            Offset::Shared(f) => f(t),
            Offset::MinMax(lo, _) => lo(t),
        }
    }

    fn apply_hi(&self, t: Timestamp) -> i32 {
        match self {
            Offset::None => 0,
            Offset::Shared(f) => f(t),
            Offset::MinMax(_, hi) => hi(t),
        }
    }
}

/// One price interval within a zone, plus its optional dynamic offset.
#[derive(Clone, Debug)]
pub struct PriceRange {
    pub p_lo: i32,
    pub p_hi: i32,
    pub offset: Offset,
}

impl PriceRange {
    pub fn fixed(p_lo: i32, p_hi: i32) -> Self {
        PriceRange { p_lo, p_hi, offset: Offset::None }
    }

    /// Effective `(lo, hi)` bounds at `t`, after applying the offset.
    fn effective(&self, t: Timestamp) -> (i32, i32) {
        (self.p_lo + self.offset.apply_lo(t), self.p_hi + self.offset.apply_hi(t))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepMode {
    Fixed,
    Jittered,
    Random,
}

impl StepMode {
    pub fn parse(s: &str) -> Result<Self, SimError> {
        match s {
            "fixed" => Ok(StepMode::Fixed),
            "jittered" => Ok(StepMode::Jittered),
            "random" => Ok(StepMode::Random),
            other => Err(SimError::UnknownStepMode(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeMode {
    Periodic,
    DripFixed,
    DripJitter,
    DripPoisson,
}

impl TimeMode {
    pub fn parse(s: &str) -> Result<Self, SimError> {
        match s {
            "periodic" => Ok(TimeMode::Periodic),
            "drip-fixed" => Ok(TimeMode::DripFixed),
            "drip-jitter" => Ok(TimeMode::DripJitter),
            "drip-poisson" => Ok(TimeMode::DripPoisson),
            other => Err(SimError::UnknownTimeMode(other.to_string())),
        }
    }
}

/// A time-bounded region of the schedule with its own price ranges and
/// stepmode.
#[derive(Clone, Debug)]
pub struct Zone {
    pub from: Timestamp,
    pub to: Timestamp,
    pub ranges: Vec<PriceRange>,
    pub stepmode: StepMode,
}

impl Zone {
    pub fn contains(&self, t: Timestamp) -> bool {
        t >= self.from && t < self.to
    }
}

/// The full supply (or demand) schedule driving the customer-order
/// generator.
#[derive(Clone, Debug)]
pub struct Schedule {
    pub zones: Vec<Zone>,
    pub timemode: TimeMode,
    pub interval: f64,
    pub fittointerval: bool,
    /// Gaussian relative price-noise sigma; `0.0` disables noise.
    pub noise_sigma: f64,
}

impl Schedule {
    pub fn zone_at(&self, t: Timestamp) -> Result<&Zone, SimError> {
        self.zones
            .iter()
            .find(|z| z.contains(t))
            .ok_or(SimError::TimeOutsideSchedule { time: t })
    }

    /// Computes the price for assignment index `i` of `n` at time `t`,
    /// per the active zone's stepmode (spec §4.8 step 4).
    pub fn price_for(&self, i: usize, n: usize, t: Timestamp, rng: &mut SimRng) -> Result<Price, SimError> {
        let zone = self.zone_at(t)?;
        let range = match zone.stepmode {
            StepMode::Random if zone.ranges.len() > 1 => {
                &zone.ranges[rng.index(zone.ranges.len())]
            }
            _ => &zone.ranges[0],
        };
        let (lo, hi) = range.effective(t);

        let raw_price = match zone.stepmode {
            StepMode::Fixed | StepMode::Jittered => {
                let step = if n > 1 { (hi - lo) as f64 / (n - 1) as f64 } else { 0.0 };
                let mut p = lo as f64 + (i as f64) * step;
                if zone.stepmode == StepMode::Jittered && step > 0.0 {
                    let half = (step / 2.0).floor() as i32;
                    if half > 0 {
                        p += rng.uniform_int(-half, half) as f64;
                    }
                }
                p.round() as i32
            }
            StepMode::Random => rng.uniform_int(lo, hi),
        };

        let noisy_price = if self.noise_sigma > 0.0 {
            let noise = rng.gauss(0.0, self.noise_sigma * raw_price as f64);
            (raw_price as f64 + noise).round() as i32
        } else {
            raw_price
        };

        Ok(Price::clamp(noisy_price))
    }

    /// Issue times for `n` assignments replenished over `self.interval`,
    /// starting at `base_time` (spec §4.8 step 1-2).
    pub fn issue_times(&self, n: usize, base_time: Timestamp, rng: &mut SimRng) -> Vec<Timestamp> {
        if n == 0 {
            return Vec::new();
        }
        let mut times: Vec<f64> = match self.timemode {
            TimeMode::Periodic => vec![self.interval; n],
            TimeMode::DripFixed => {
                let delta = if n > 1 { self.interval / (n - 1) as f64 } else { 0.0 };
                (0..n).map(|i| i as f64 * delta).collect()
            }
            TimeMode::DripJitter => {
                let delta = if n > 1 { self.interval / (n - 1) as f64 } else { 0.0 };
                (0..n).map(|i| i as f64 * delta + delta * rng.uniform01()).collect()
            }
            TimeMode::DripPoisson => {
                let rate = n as f64 / self.interval;
                let mut t = 0.0;
                (0..n)
                    .map(|_| {
                        t += rng.exponential_gap(rate);
                        t
                    })
                    .collect()
            }
        };

        if self.fittointerval {
            if let Some(&last) = times.last() {
                if last > 0.0 {
                    let scale = self.interval / last;
                    for t in times.iter_mut() {
                        *t *= scale;
                    }
                }
            }
        }

        for t in times.iter_mut() {
            *t += base_time;
        }
        times
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(stepmode: StepMode, timemode: TimeMode) -> Schedule {
        Schedule {
            zones: vec![Zone {
                from: 0.0,
                to: 1000.0,
                ranges: vec![PriceRange::fixed(100, 200)],
                stepmode,
            }],
            timemode,
            interval: 10.0,
            fittointerval: false,
            noise_sigma: 0.0,
        }
    }

    #[test]
    fn zone_lookup_outside_schedule_errors() {
        let sched = schedule(StepMode::Fixed, TimeMode::Periodic);
        assert_eq!(
            sched.zone_at(2000.0),
            Err(SimError::TimeOutsideSchedule { time: 2000.0 })
        );
    }

    #[test]
    fn fixed_stepmode_is_linear() {
        let sched = schedule(StepMode::Fixed, TimeMode::Periodic);
        let mut rng = SimRng::seeded(1);
        let p0 = sched.price_for(0, 5, 0.0, &mut rng).unwrap();
        let p4 = sched.price_for(4, 5, 0.0, &mut rng).unwrap();
        assert_eq!(p0, Price(100));
        assert_eq!(p4, Price(200));
    }

    #[test]
    fn random_stepmode_stays_in_range() {
        let sched = schedule(StepMode::Random, TimeMode::Periodic);
        let mut rng = SimRng::seeded(7);
        for i in 0..20 {
            let p = sched.price_for(i, 20, 0.0, &mut rng).unwrap();
            assert!((100..=200).contains(&p.0));
        }
    }

    #[test]
    fn fittointerval_rescales_last_arrival_to_interval() {
        let mut sched = schedule(StepMode::Fixed, TimeMode::DripFixed);
        sched.fittointerval = true;
        sched.interval = 10.0;
        let mut rng = SimRng::seeded(3);
        let times = sched.issue_times(5, 0.0, &mut rng);
        assert!((times.last().unwrap() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn periodic_timemode_arrives_at_t_plus_interval() {
        let sched = schedule(StepMode::Fixed, TimeMode::Periodic);
        let mut rng = SimRng::seeded(1);
        let times = sched.issue_times(3, 5.0, &mut rng);
        assert_eq!(times, vec![15.0, 15.0, 15.0]);
    }

    #[test]
    fn dynamic_offset_shifts_effective_bounds() {
        let offset: OffsetClosure = Arc::new(|t: Timestamp| (t / 10.0) as i32);
        let range = PriceRange { p_lo: 100, p_hi: 200, offset: Offset::Shared(offset) };
        assert_eq!(range.effective(50.0), (105, 205));
    }
}
