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

//! Settings read from the process environment at startup.

use std::env;
use std::error;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_LISTEN: &str = "0.0.0.0:9001";
const DEFAULT_JOURNAL: &str = "locations.jsonl";
const DEFAULT_FREQ: u16 = 10;
const MAX_FREQ: u16 = 1000;
const DEFAULT_OBSERVER_QUEUE: usize = 64;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, ref value } => write!(f, "invalid value for {}: {:?}", key, value),
        }
    }
}

impl error::Error for ConfigError {}

#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    pub bot_token: String,
    pub listen_addr: String,
    pub journal_path: PathBuf,
    /// Main loop frequency in Hz
    pub frequency: u16,
    pub observer_queue: usize,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bot_token = get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let listen_addr = get("BEACON_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let journal_path = PathBuf::from(get("BEACON_JOURNAL").unwrap_or_else(|| DEFAULT_JOURNAL.to_string()));

        let frequency = parse(get("BEACON_FREQ"), "BEACON_FREQ", DEFAULT_FREQ)?;
        if frequency == 0 || frequency > MAX_FREQ {
            return Err(ConfigError::Invalid {
                key: "BEACON_FREQ",
                value: frequency.to_string(),
            });
        }

        let observer_queue = parse(get("BEACON_OBSERVER_QUEUE"), "BEACON_OBSERVER_QUEUE", DEFAULT_OBSERVER_QUEUE)?;
        if observer_queue == 0 {
            return Err(ConfigError::Invalid {
                key: "BEACON_OBSERVER_QUEUE",
                value: observer_queue.to_string(),
            });
        }

        Ok(Config {
            bot_token,
            listen_addr,
            journal_path,
            frequency,
            observer_queue,
        })
    }
}

fn parse<T: FromStr>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v.clone() }),
    }
}
