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

//! Decides whether a new report is real movement or GPS noise.

use super::distance::distance;
use super::PositionReport;
use store::LocationRecord;

/// Minimum distance between consecutive stored positions of a reporter, in meters
pub const MOVEMENT_THRESHOLD_M: f64 = 10_f64;

#[derive(Debug, Copy, Clone)]
pub struct MovementFilter {
    threshold: f64,
}

impl MovementFilter {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The first report of a reporter is always accepted. After that,
    /// a report is accepted when it is at least `threshold` meters away
    /// from the last stored position, the boundary itself included.
    pub fn should_accept(&self, previous: Option<&LocationRecord>, incoming: &PositionReport) -> bool {
        match previous {
            None => true,
            Some(p) => distance(p.position, incoming.position) >= self.threshold,
        }
    }
}

impl Default for MovementFilter {
    fn default() -> Self {
        MovementFilter::new(MOVEMENT_THRESHOLD_M)
    }
}
