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

pub mod handle;

use self::handle::{BasicHandle, PushableHandle};
use chrono::prelude::*;
use processor::ingest::{Outcome, Pipeline};
use processor::PositionReport;
use source::Source;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// Ingestion counters are logged this often, in Hz
const STATS_FREQ: f32 = 1_f32 / 60_f32;

pub struct Beacon {
    sources: Vec<Box<dyn Source>>,
    pipeline: Arc<Pipeline>,
    interval: Duration,
    frequency: u16,
    report_queue: VecDeque<PositionReport>,
    stats: BTreeMap<&'static str, u64>,
    stats_counter: u32,
}

impl Beacon {
    pub fn new(freq: u16, pipeline: Arc<Pipeline>) -> Self {
        Beacon {
            sources: vec![],
            pipeline,
            report_queue: VecDeque::new(),
            frequency: freq,
            interval: Duration::from_millis((1000 / freq) as u64),
            stats: BTreeMap::new(),
            stats_counter: 0,
        }
    }

    pub fn link_source(&mut self, s: Box<dyn Source>) {
        self.sources.push(s);
    }

    fn run_sources(&mut self, now: DateTime<Utc>) {
        let clock = BasicHandle::new(now);
        let mut handle = PushableHandle::new(&clock, &mut self.report_queue);

        for s in self.sources.iter_mut() {
            s.run(&mut handle);
        }
    }

    fn run_pipeline(&mut self) {
        if !self.report_queue.is_empty() {
            debug!("total {} reports to ingest", self.report_queue.len());
        }

        // one bad report never stops the ones queued behind it
        while let Some(r) = self.report_queue.pop_front() {
            let key = match self.pipeline.ingest(r) {
                Outcome::Accepted(_) => "accepted",
                Outcome::Rejected(ref rej) => rej.reason(),
            };

            *self.stats.entry(key).or_insert(0) += 1;
        }

        run_every!(STATS_FREQ, self.stats_counter, self.frequency, {
            if !self.stats.is_empty() {
                info!("ingestion so far: {:?}", self.stats);
            }
        });
    }

    /// Runs the sources once and ingests everything they produced.
    pub fn tick(&mut self) {
        self.run_sources(Utc::now());
        self.run_pipeline();
    }

    #[cfg(test)]
    pub fn stats(&self) -> &BTreeMap<&'static str, u64> {
        &self.stats
    }

    pub fn run(&mut self) {
        loop {
            // main event loop
            let before = Instant::now();

            self.tick();

            let elapsed = before.elapsed();

            if elapsed < self.interval {
                sleep(self.interval - elapsed);
            } else {
                warn!("loop unable to keep up with the set frequency");
            }
        }
    }
}
