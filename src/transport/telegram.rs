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

//! Minimal client for the Telegram Bot API, just enough to long-poll
//! location updates and send text messages back.

use super::*;
use chrono::prelude::*;
use processor::PositionReport;
use serde_json::Value;
use std::io;
use std::time::Duration;
use ureq;

const API_BASE: &str = "https://api.telegram.org";
/// Server side long-poll timeout for `getUpdates`
pub const POLL_TIMEOUT_SECS: u64 = 30;
const WRITE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    /// Live location sharing arrives as edits of the original message
    pub edited_message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub date: i64,
    pub edit_date: Option<i64>,
    pub from: Option<User>,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Update {
    /// Turns the update into a position report if it carries a location
    /// and a sender, `None` otherwise. An edit is reported as of when it
    /// was made; `now` stands in for a timestamp that does not parse.
    pub fn into_report(self, now: DateTime<Utc>) -> Option<PositionReport> {
        let message = self.message.or(self.edited_message)?;
        let from = message.from?;
        let location = message.location?;
        let reported_at = Utc.timestamp_opt(message.edit_date.unwrap_or(message.date), 0)
            .single()
            .unwrap_or(now);

        Some(PositionReport::new(
            &from.id.to_string(),
            &from.first_name,
            location.latitude,
            location.longitude,
            reported_at,
        ))
    }
}

pub struct TelegramBot {
    agent: ureq::Agent,
    base: String,
}

impl TelegramBot {
    pub fn new(token: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_read(Duration::from_secs(POLL_TIMEOUT_SECS + WRITE_TIMEOUT_SECS))
            .timeout_write(Duration::from_secs(WRITE_TIMEOUT_SECS))
            .build();

        Self {
            agent,
            base: format!("{}/bot{}", API_BASE, token),
        }
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }

    /// Long-polls for updates newer than `offset`.
    pub fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let resp = self.agent
            .get(&self.url("getUpdates"))
            .query("offset", &offset.to_string())
            .query("timeout", &POLL_TIMEOUT_SECS.to_string())
            .query("allowed_updates", r#"["message","edited_message"]"#)
            .call()?;

        unwrap_response(resp.into_json::<ApiResponse<Vec<Update>>>())
    }
}

fn unwrap_response<T>(resp: io::Result<ApiResponse<T>>) -> Result<T, TransportError> {
    let resp = resp.map_err(|e| TransportError::Decode(e.to_string()))?;

    if !resp.ok {
        return Err(TransportError::Rejected {
            status: 200,
            description: resp.description.unwrap_or_default(),
        });
    }

    resp.result
        .ok_or_else(|| TransportError::Decode("missing result".to_string()))
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> TransportError {
        match err {
            ureq::Error::Status(status, resp) => {
                let description = resp.into_json::<ApiResponse<Value>>()
                    .ok()
                    .and_then(|r| r.description)
                    .unwrap_or_default();

                TransportError::Rejected {
                    status,
                    description,
                }
            }
            ureq::Error::Transport(t) => TransportError::Network(t.to_string()),
        }
    }
}

impl Courier for TelegramBot {
    fn send(&self, reporter_id: &str, text: &str) -> Result<(), TransportError> {
        let resp = self.agent
            .post(&self.url("sendMessage"))
            .send_json(json!({
                "chat_id": reporter_id,
                "text": text,
            }))?;

        unwrap_response(resp.into_json::<ApiResponse<Value>>()).map(|_| ())
    }
}
