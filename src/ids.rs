//!
//! src/ids.rs
//!
//! Injectable wall clock and track identifier generators. Identifiers
//! are never handed out twice by the same store, even when two tracks
//! are added within the same second
//!

use std::collections::BTreeMap;

use crate::config::IdStrategy;
use crate::errors::CatalogError;
use crate::types::{Track, TrackId};

pub trait Clock {
    /// Current time as epoch seconds
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

pub trait IdGenerator {
    /// Returns an identifier that is not a key of `existing`
    fn next_id(
        &mut self,
        now: i64,
        existing: &BTreeMap<TrackId, Track>
    ) -> Result<TrackId, CatalogError>;
}

/// Creation time in epoch seconds, pushed forward past anything already
/// issued or stored
#[derive(Debug, Default)]
pub struct TimestampIds {
    last: Option<i64>,
}

impl IdGenerator for TimestampIds {
    fn next_id(
        &mut self,
        now: i64,
        existing: &BTreeMap<TrackId, Track>
    ) -> Result<TrackId, CatalogError> {
        let mut candidate = match self.last {
            Some(last) if last >= now => successor(last)?,
            _ => now,
        };
        while existing.contains_key(&TrackId(candidate)) {
            candidate = successor(candidate)?;
        }
        self.last = Some(candidate);
        Ok(TrackId(candidate))
    }
}

/// 1, 2, 3, ... continuing after the highest stored identifier
#[derive(Debug, Default)]
pub struct SequentialIds {
    last: i64,
}

impl IdGenerator for SequentialIds {
    fn next_id(
        &mut self,
        _now: i64,
        existing: &BTreeMap<TrackId, Track>
    ) -> Result<TrackId, CatalogError> {
        let highest = existing.keys().next_back().map_or(0, |id| id.0);
        self.last = successor(self.last.max(highest))?;
        Ok(TrackId(self.last))
    }
}

fn successor(id: i64) -> Result<i64, CatalogError> {
    id.checked_add(1).ok_or(CatalogError::IdsExhausted(TrackId(id)))
}

pub fn generator_for(strategy: IdStrategy) -> Box<dyn IdGenerator> {
    match strategy {
        IdStrategy::Timestamp  => Box::new(TimestampIds::default()),
        IdStrategy::Sequential => Box::new(SequentialIds::default()),
    }
}

/// Hand-driven clock shared between a test and the store it feeds
#[cfg(test)]
#[derive(Debug, Clone)]
pub(crate) struct ManualClock(std::rc::Rc<std::cell::Cell<i64>>);

#[cfg(test)]
impl ManualClock {
    pub(crate) fn at(now: i64) -> Self {
        Self(std::rc::Rc::new(std::cell::Cell::new(now)))
    }

    pub(crate) fn set(&self, now: i64) {
        self.0.set(now);
    }

    pub(crate) fn advance(&self, secs: i64) {
        self.0.set(self.0.get() + secs);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.get()
    }
}
