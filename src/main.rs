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

#[macro_use]
extern crate log;
extern crate chrono;
extern crate env_logger;
#[macro_use]
extern crate serde_json;
#[macro_use]
extern crate serde_derive;
extern crate ureq;
extern crate ws;

#[cfg(test)]
#[macro_use]
extern crate proptest;
#[cfg(test)]
extern crate tempfile;

#[macro_use]
mod utils;
mod beacon;
mod config;
mod fanout;
mod gateway;
mod processor;
mod protocol;
mod source;
mod store;
mod transport;

use beacon::Beacon;
use config::Config;
use fanout::Fanout;
use gateway::Gateway;
use processor::ingest::Pipeline;
use source::telegram::TelegramSource;
use std::process::exit;
use std::sync::Arc;
use store::journal::JournalStore;
use store::LocationStore;
use transport::telegram::TelegramBot;

fn main() {
    env_logger::init();

    let config = Config::from_env().unwrap_or_else(|e| {
        error!("{}", e);
        exit(1);
    });

    let store: Arc<dyn LocationStore> = match JournalStore::open(&config.journal_path) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("unable to open {}: {}", config.journal_path.display(), e);
            exit(1);
        }
    };

    let fanout = Arc::new(Fanout::new(config.observer_queue));
    let bot = Arc::new(TelegramBot::new(&config.bot_token));
    let gateway = Arc::new(Gateway::new(bot.clone()));

    let _ws = protocol::websocket::WebSocket::new(
        config.listen_addr.clone(),
        store.clone(),
        fanout.clone(),
        gateway,
    ).unwrap_or_else(|e| {
        error!("unable to start WebSocket server: {}", e);
        exit(1);
    });
    info!("serving observers on {}", config.listen_addr);

    let pipeline = Arc::new(Pipeline::new(store, fanout));

    let mut b = Beacon::new(config.frequency, pipeline);
    b.link_source(Box::new(TelegramSource::new(bot)));

    b.run();
}
