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

//! Great-circle distance on a spherical Earth.

use super::Coordinate;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000_f64;

/// Haversine distance between `a` and `b` in meters.
///
/// Differences are taken as absolute values so that swapping the arguments
/// yields a bit-for-bit identical result.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).abs().to_radians();
    let d_lon = (b.longitude - a.longitude).abs().to_radians();

    let h = (d_lat / 2_f64).sin().powi(2) +
            lat1.cos() * lat2.cos() * (d_lon / 2_f64).sin().powi(2);
    // rounding can push h a hair past 1 for antipodal points
    let h = h.min(1_f64);

    2_f64 * EARTH_RADIUS_M * h.sqrt().atan2((1_f64 - h).sqrt())
}
