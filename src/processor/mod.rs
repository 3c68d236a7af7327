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

pub mod distance;
pub mod ingest;
pub mod movement;

use chrono::prelude::*;
use std::error;
use std::fmt;
use store::LocationRecord;

/// A point on the globe in degrees
#[derive(PartialEq, Debug, Copy, Clone, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in deg, -90 to 90
    pub latitude: f64,
    /// Longitude in deg, -180 to 180
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// NaN fails both range checks, so it is never valid either.
    pub fn is_valid(&self) -> bool {
        (-90_f64..=90_f64).contains(&self.latitude) && (-180_f64..=180_f64).contains(&self.longitude)
    }
}

/// A raw position report as delivered by an inbound source.
#[derive(PartialEq, Debug, Clone)]
pub struct PositionReport {
    pub reporter_id: String,
    pub display_name: String,
    pub position: Coordinate,
    /// When the reporter sent it, as claimed by the source
    pub reported_at: DateTime<Utc>,
}

#[derive(PartialEq, Debug, Clone)]
pub enum InvalidInput {
    MissingReporterId,
    MissingDisplayName,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
    MissingField(&'static str),
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            InvalidInput::MissingReporterId => write!(f, "reporter id is required"),
            InvalidInput::MissingDisplayName => write!(f, "display name is required"),
            InvalidInput::LatitudeOutOfRange(l) => write!(f, "latitude {} out of range", l),
            InvalidInput::LongitudeOutOfRange(l) => write!(f, "longitude {} out of range", l),
            InvalidInput::MissingField(name) => write!(f, "{} is required", name),
        }
    }
}

impl error::Error for InvalidInput {}

impl PositionReport {
    pub fn new(
        reporter_id: &str,
        display_name: &str,
        latitude: f64,
        longitude: f64,
        reported_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reporter_id: reporter_id.to_string(),
            display_name: display_name.to_string(),
            position: Coordinate::new(latitude, longitude),
            reported_at,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidInput> {
        if self.reporter_id.trim().is_empty() {
            return Err(InvalidInput::MissingReporterId);
        }

        if self.display_name.trim().is_empty() {
            return Err(InvalidInput::MissingDisplayName);
        }

        if !(-90_f64..=90_f64).contains(&self.position.latitude) {
            return Err(InvalidInput::LatitudeOutOfRange(self.position.latitude));
        }

        if !(-180_f64..=180_f64).contains(&self.position.longitude) {
            return Err(InvalidInput::LongitudeOutOfRange(self.position.longitude));
        }

        Ok(())
    }
}

/// Emitted to observers whenever a report is durably stored
#[derive(PartialEq, Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    Accepted(LocationRecord),
}
