//! Analysis cycles and assimilation windows.
//!
//! Cycles use the workflow's `CDATE` convention, `YYYYMMDDHH` in UTC.

use crate::registry::Window;
use anyhow::{Context, bail};
use chrono::{NaiveDateTime, TimeDelta};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const CYCLE_FORMAT: &str = "%Y%m%d%H";

/// Upper bound on `back + forward`; a window this wide is a registry typo.
pub const MAX_WINDOW_CYCLES: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle(NaiveDateTime);

impl Cycle {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        if s.len() != 10 || !s.bytes().all(|b| b.is_ascii_digit()) {
            bail!("cycle must be YYYYMMDDHH, got {:?}", s);
        }
        // chrono wants minutes to build a datetime.
        let time = NaiveDateTime::parse_from_str(&format!("{}00", s), "%Y%m%d%H%M")
            .with_context(|| format!("invalid cycle {:?}", s))?;
        Ok(Self(time))
    }

    pub fn time(&self) -> NaiveDateTime {
        self.0
    }

    /// The cycle `hours` later (earlier when negative). Fails when the
    /// result leaves chrono's date range.
    pub fn offset_hours(&self, hours: i64) -> anyhow::Result<Self> {
        TimeDelta::try_hours(hours)
            .and_then(|d| self.0.checked_add_signed(d))
            .map(Self)
            .with_context(|| format!("{} offset by {}h is out of range", self, hours))
    }
}

impl From<NaiveDateTime> for Cycle {
    fn from(time: NaiveDateTime) -> Self {
        Self(time)
    }
}

impl FromStr for Cycle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CYCLE_FORMAT))
    }
}

impl Serialize for Cycle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Dump cycles considered for one observation space at one analysis cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssimWindow {
    pub cycle: Cycle,
    pub interval_hours: i64,
    pub back: u32,
    pub forward: u32,
}

impl AssimWindow {
    pub fn new(cycle: Cycle, interval_hours: i64, window: Window) -> anyhow::Result<Self> {
        if interval_hours <= 0 {
            bail!("cycle interval must be positive, got {}h", interval_hours);
        }
        let back = u32::try_from(window.back)
            .with_context(|| format!("window back must be non-negative, got {}", window.back))?;
        let forward = u32::try_from(window.forward).with_context(|| {
            format!("window forward must be non-negative, got {}", window.forward)
        })?;
        if back.saturating_add(forward) > MAX_WINDOW_CYCLES {
            bail!(
                "window back {} + forward {} exceeds {} cycles",
                back,
                forward,
                MAX_WINDOW_CYCLES
            );
        }
        let window = Self {
            cycle,
            interval_hours,
            back,
            forward,
        };
        window.first()?;
        window.last()?;
        Ok(window)
    }

    /// `cycle + steps * interval_hours`.
    fn step(&self, steps: i64) -> anyhow::Result<Cycle> {
        let hours = steps.checked_mul(self.interval_hours).with_context(|| {
            format!("{} cycles of {}h overflow", steps, self.interval_hours)
        })?;
        self.cycle.offset_hours(hours)
    }

    pub fn first(&self) -> anyhow::Result<Cycle> {
        self.step(-i64::from(self.back))
    }

    pub fn last(&self) -> anyhow::Result<Cycle> {
        self.step(i64::from(self.forward))
    }

    /// Every cycle from `first()` to `last()` inclusive, oldest first.
    pub fn cycles(&self) -> anyhow::Result<Vec<Cycle>> {
        (-i64::from(self.back)..=i64::from(self.forward))
            .map(|k| self.step(k))
            .collect()
    }
}

/// Start of the assimilation window: half the assimilation frequency before
/// the analysis cycle.
pub fn window_begin(cycle: Cycle, assim_freq_hours: i64) -> anyhow::Result<NaiveDateTime> {
    if assim_freq_hours <= 0 {
        bail!("assim_freq must be positive, got {}h", assim_freq_hours);
    }
    assim_freq_hours
        .checked_mul(30)
        .and_then(TimeDelta::try_minutes)
        .and_then(|half| cycle.time().checked_sub_signed(half))
        .with_context(|| {
            format!(
                "window begin of {} with assim_freq {}h is out of range",
                cycle, assim_freq_hours
            )
        })
}
