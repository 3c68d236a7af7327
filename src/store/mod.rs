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

//! Durable, append-only history of accepted positions.
//!
//! Records are never updated or removed once appended. A record is identified
//! by `(reporter_id, recorded_at)` and each reporter's records are kept in
//! ascending `recorded_at` order.

pub mod journal;
pub mod memory;

use chrono::prelude::*;
use processor::{Coordinate, PositionReport};
use serde_json;
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::io;
use std::slice::Iter;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LocationRecord {
    pub reporter_id: String,
    pub display_name: String,
    pub position: Coordinate,
    pub recorded_at: DateTime<Utc>,
}

impl LocationRecord {
    pub fn new(report: &PositionReport, recorded_at: DateTime<Utc>) -> Self {
        Self {
            reporter_id: report.reporter_id.clone(),
            display_name: report.display_name.clone(),
            position: report.position,
            recorded_at,
        }
    }
}

#[derive(Debug)]
pub enum StorageError {
    Io(io::Error),
    /// A journal line that could not be decoded, 1-based
    Corrupt { line: usize, reason: String },
    Duplicate {
        reporter_id: String,
        recorded_at: DateTime<Utc>,
    },
    OutOfRange(Coordinate),
    Poisoned,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StorageError::Io(ref e) => write!(f, "storage I/O error: {}", e),
            StorageError::Corrupt { line, ref reason } => {
                write!(f, "corrupt journal at line {}: {}", line, reason)
            }
            StorageError::Duplicate {
                ref reporter_id,
                recorded_at,
            } => write!(
                f,
                "record for {} at {} already exists",
                reporter_id,
                recorded_at.to_rfc3339()
            ),
            StorageError::OutOfRange(c) => write!(
                f,
                "position {},{} out of range",
                c.latitude, c.longitude
            ),
            StorageError::Poisoned => write!(f, "store lock poisoned"),
        }
    }
}

impl error::Error for StorageError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            StorageError::Io(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> StorageError {
        StorageError::Io(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> StorageError {
        StorageError::Io(err.into())
    }
}

/// Movement history of a single reporter, oldest first.
///
/// A `History` is a snapshot taken at query time; it can be walked
/// any number of times.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct History {
    records: Vec<LocationRecord>,
}

impl History {
    pub fn new(records: Vec<LocationRecord>) -> Self {
        Self { records }
    }

    pub fn iter(&self) -> Iter<LocationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_vec(self) -> Vec<LocationRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a LocationRecord;
    type IntoIter = Iter<'a, LocationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A `LocationStore` is the single source of truth for movement history.
///
/// Looking up a reporter that never reported is not an error, it yields
/// `None` or an empty history.
pub trait LocationStore: Send + Sync {
    fn append(&self, record: &LocationRecord) -> Result<(), StorageError>;

    fn most_recent(&self, reporter_id: &str) -> Result<Option<LocationRecord>, StorageError>;

    fn history_for(&self, reporter_id: &str) -> Result<History, StorageError>;

    /// The most recent record of every reporter, keyed by reporter id
    fn all_latest(&self) -> Result<HashMap<String, LocationRecord>, StorageError>;
}
