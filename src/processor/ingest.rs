// Beacon - a location tracker for messaging-bot reporters
// Copyright (C) 2017-2018  Datong Sun (dndx@idndx.com)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Drives one position report from validation to storage and fan-out.

use super::movement::MovementFilter;
use super::{Event, InvalidInput, PositionReport};
use chrono::prelude::*;
use chrono::Duration;
use fanout::Fanout;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use store::{LocationRecord, LocationStore, StorageError};

#[derive(Debug)]
pub enum Rejection {
    InvalidInput(InvalidInput),
    /// Valid, but within the movement threshold of the last stored position
    TooClose,
    Storage(StorageError),
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match *self {
            Rejection::InvalidInput(_) => "invalid_input",
            Rejection::TooClose => "too_close",
            Rejection::Storage(_) => "storage_error",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Rejection::InvalidInput(ref e) => write!(f, "invalid_input: {}", e),
            Rejection::TooClose => write!(f, "too_close"),
            Rejection::Storage(ref e) => write!(f, "storage_error: {}", e),
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Accepted(LocationRecord),
    Rejected(Rejection),
}

#[cfg(test)]
impl Outcome {
    pub fn is_accepted(&self) -> bool {
        match *self {
            Outcome::Accepted(_) => true,
            Outcome::Rejected(_) => false,
        }
    }
}

pub struct Pipeline {
    store: Arc<dyn LocationStore>,
    fanout: Arc<Fanout<Event>>,
    filter: MovementFilter,
    /// One lock per reporter, held across lookup and append
    reporters: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn LocationStore>, fanout: Arc<Fanout<Event>>) -> Self {
        Self::with_filter(store, fanout, MovementFilter::default())
    }

    pub fn with_filter(
        store: Arc<dyn LocationStore>,
        fanout: Arc<Fanout<Event>>,
        filter: MovementFilter,
    ) -> Self {
        Self {
            store,
            fanout,
            filter,
            reporters: Mutex::new(HashMap::new()),
        }
    }

    pub fn ingest(&self, report: PositionReport) -> Outcome {
        self.ingest_at(report, Utc::now())
    }

    /// Like `ingest`, with `now` used to stamp the record.
    pub fn ingest_at(&self, report: PositionReport, now: DateTime<Utc>) -> Outcome {
        if let Err(e) = report.validate() {
            debug!("dropping report from {:?}: {}", report.reporter_id, e);
            return Outcome::Rejected(Rejection::InvalidInput(e));
        }

        let lock = self.reporter_lock(&report.reporter_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let previous = match self.store.most_recent(&report.reporter_id) {
            Ok(p) => p,
            Err(e) => {
                error!("looking up last position of {} failed: {}", report.reporter_id, e);
                return Outcome::Rejected(Rejection::Storage(e));
            }
        };

        if !self.filter.should_accept(previous.as_ref(), &report) {
            trace!(
                "{} moved less than {} m, skipped",
                report.reporter_id,
                self.filter.threshold()
            );
            return Outcome::Rejected(Rejection::TooClose);
        }

        // keep per-reporter records strictly ordered even if the wall clock steps back
        let recorded_at = match previous {
            Some(ref p) if p.recorded_at >= now => p.recorded_at + Duration::microseconds(1),
            _ => now,
        };

        let record = LocationRecord::new(&report, recorded_at);
        if let Err(e) = self.store.append(&record) {
            error!("storing position of {} failed: {}", report.reporter_id, e);
            return Outcome::Rejected(Rejection::Storage(e));
        }

        info!(
            "{} ({}) moved to {:.6},{:.6}",
            record.display_name, record.reporter_id, record.position.latitude, record.position.longitude
        );
        debug!(
            "report from {} arrived {}ms after it was sent",
            record.reporter_id,
            (now - report.reported_at).num_milliseconds()
        );

        let delivered = self.fanout.publish(&Event::Accepted(record.clone()));
        trace!("accepted position delivered to {} observers", delivered);

        Outcome::Accepted(record)
    }

    fn reporter_lock(&self, reporter_id: &str) -> Arc<Mutex<()>> {
        let mut reporters = self.reporters.lock().unwrap_or_else(PoisonError::into_inner);

        reporters
            .entry(reporter_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
