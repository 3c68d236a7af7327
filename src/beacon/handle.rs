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

use chrono::prelude::*;
use std::collections::VecDeque;

/// What a source can see of the loop while it runs.
pub trait Handle {
    /// Wall clock at the start of the current tick
    fn get_utc(&self) -> DateTime<Utc>;
}

pub trait Pushable<D>: Handle {
    fn push_data(&mut self, d: D);
}

pub struct BasicHandle {
    utc: DateTime<Utc>,
}

impl Handle for BasicHandle {
    fn get_utc(&self) -> DateTime<Utc> {
        self.utc
    }
}

impl BasicHandle {
    pub fn new(utc: DateTime<Utc>) -> Self {
        Self { utc }
    }
}

pub struct PushableHandle<'a, H, D>
    where D: 'a,
          H: 'a + Handle
{
    handle: &'a H,
    queue: &'a mut VecDeque<D>,
}

impl<'a, H, D> Handle for PushableHandle<'a, H, D>
    where H: 'a + Handle
{
    fn get_utc(&self) -> DateTime<Utc> {
        self.handle.get_utc()
    }
}

impl<'a, H, D> Pushable<D> for PushableHandle<'a, H, D>
    where H: 'a + Handle
{
    fn push_data(&mut self, d: D) {
        self.queue.push_back(d);
    }
}

impl<'a, H, D> PushableHandle<'a, H, D>
    where H: 'a + Handle
{
    pub fn new(handle: &'a H, queue: &'a mut VecDeque<D>) -> Self {
        Self { handle, queue }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pushable_handle() {
        let t = Utc.with_ymd_and_hms(2018, 3, 1, 12, 0, 0).unwrap();
        let b = BasicHandle::new(t);
        let mut q = VecDeque::new();

        {
            let mut h = PushableHandle::new(&b, &mut q);
            h.push_data(1);
            h.push_data(2);
            assert_eq!(h.get_utc(), t);
        }

        assert_eq!(q, vec![1, 2]);
    }
}
