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

use super::*;
use std::collections::VecDeque;

/// Replays a scripted list of reports, `per_run` of them each time it runs.
pub struct FakeSource {
    reports: VecDeque<PositionReport>,
    per_run: usize,
}

impl FakeSource {
    pub fn new(reports: Vec<PositionReport>, per_run: usize) -> Self {
        Self {
            reports: reports.into_iter().collect(),
            per_run,
        }
    }
}

impl Source for FakeSource {
    fn run(&mut self, h: &mut dyn Pushable<PositionReport>) {
        for _ in 0..self.per_run {
            match self.reports.pop_front() {
                Some(r) => h.push_data(r),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon::handle::{BasicHandle, PushableHandle};
    use chrono::prelude::*;

    #[test]
    fn test_fake_source() {
        let t = Utc.with_ymd_and_hms(2014, 7, 8, 9, 10, 11).unwrap();
        let mut p = FakeSource::new(
            vec![
                PositionReport::new("1", "Ann", 1_f64, 2_f64, t),
                PositionReport::new("2", "Bob", 3_f64, 4_f64, t),
                PositionReport::new("3", "Cid", 5_f64, 6_f64, t),
            ],
            2,
        );
        let mut q = VecDeque::<PositionReport>::new();

        for expected in &[2, 3, 3] {
            {
                let b = BasicHandle::new(t);
                let mut h = PushableHandle::new(&b, &mut q);
                p.run(&mut h);
            }

            assert_eq!(q.len(), *expected);
        }

        assert_eq!(q[2], PositionReport::new("3", "Cid", 5_f64, 6_f64, t));
    }
}
