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
use beacon::handle::Handle;
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::{sleep, spawn, JoinHandle};
use std::time::Duration;
use transport::telegram::{TelegramBot, Update};

const RETRY_DELAY_SECS: u64 = 5;

/// Location messages sent to the bot. Polling happens on its own thread,
/// `run` only drains what arrived since the last call.
pub struct TelegramSource {
    _handle: JoinHandle<()>,
    rx: Receiver<Update>,
}

impl TelegramSource {
    pub fn new(bot: Arc<TelegramBot>) -> Self {
        let (tx, rx) = channel();

        let handle = spawn(move || {
            let mut offset = 0;

            loop {
                let updates = match bot.get_updates(offset) {
                    Ok(u) => u,
                    Err(e) => {
                        warn!("polling for updates failed: {}", e);
                        sleep(Duration::from_secs(RETRY_DELAY_SECS));
                        continue;
                    }
                };

                trace!("got {} updates", updates.len());

                for u in updates {
                    offset = offset.max(u.update_id + 1);

                    if tx.send(u).is_err() {
                        debug!("source dropped, stop polling");
                        return;
                    }
                }
            }
        });
        info!("bot poller started");

        TelegramSource {
            _handle: handle,
            rx,
        }
    }
}

impl Source for TelegramSource {
    fn run(&mut self, h: &mut dyn Pushable<PositionReport>) {
        let now = h.get_utc();

        for u in self.rx.try_iter() {
            if let Some(r) = u.into_report(now) {
                h.push_data(r);
            }
        }
    }
}
