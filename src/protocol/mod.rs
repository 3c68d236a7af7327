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

//! Wire messages exchanged with observers and operators.

pub mod websocket;

use gateway::{Gateway, SendError};
use processor::InvalidInput;
use serde_json;
use std::sync::Arc;
use std::thread::spawn;
use store::{LocationRecord, LocationStore, StorageError};

#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    History {
        #[serde(default)]
        user_id: String,
    },
    SendMessage {
        #[serde(default)]
        user_id: String,
        #[serde(default)]
        text: String,
    },
}

#[derive(Debug, PartialEq, Copy, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    StorageError,
    TransportError,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Response {
    Snapshot { locations: Vec<LocationRecord> },
    History {
        user_id: String,
        locations: Vec<LocationRecord>,
    },
    MessageSent { user_id: String },
    Error { code: ErrorCode, message: String },
}

impl Response {
    pub fn to_text(&self) -> String {
        // only plain strings, numbers and timestamps in here
        serde_json::to_string(self).unwrap_or_default()
    }

    fn storage_error(e: StorageError) -> Self {
        error!("query failed: {}", e);

        Response::Error {
            code: ErrorCode::StorageError,
            message: e.to_string(),
        }
    }
}

/// Latest position of every reporter, ordered by reporter id
pub fn snapshot(store: &dyn LocationStore) -> Response {
    match store.all_latest() {
        Ok(latest) => {
            let mut locations: Vec<LocationRecord> = latest.into_iter().map(|(_, v)| v).collect();
            locations.sort_by(|a, b| a.reporter_id.cmp(&b.reporter_id));

            Response::Snapshot { locations }
        }
        Err(e) => Response::storage_error(e),
    }
}

fn history(user_id: String, store: &dyn LocationStore) -> Response {
    if user_id.trim().is_empty() {
        return Response::Error {
            code: ErrorCode::InvalidInput,
            message: InvalidInput::MissingField("user_id").to_string(),
        };
    }

    match store.history_for(&user_id) {
        Ok(h) => Response::History {
            user_id,
            locations: h.into_vec(),
        },
        Err(e) => Response::storage_error(e),
    }
}

fn send_message(user_id: String, text: &str, gateway: &Gateway) -> Response {
    match gateway.send_message(&user_id, text) {
        Ok(()) => Response::MessageSent { user_id },
        Err(e) => Response::Error {
            code: match e {
                SendError::InvalidInput(_) => ErrorCode::InvalidInput,
                SendError::Transport(_) => ErrorCode::TransportError,
            },
            message: e.to_string(),
        },
    }
}

/// Answers one text frame sent by a client through `reply`.
///
/// Queries are answered before this returns. Message requests wait on the
/// courier, so they are answered later from a thread of their own.
pub fn dispatch<F>(text: &str, store: &dyn LocationStore, gateway: &Arc<Gateway>, reply: F)
    where F: FnOnce(Response) + Send + 'static
{
    let req = match serde_json::from_str::<Request>(text) {
        Ok(r) => r,
        Err(e) => {
            debug!("malformed request: {}", e);

            return reply(Response::Error {
                code: ErrorCode::InvalidInput,
                message: format!("invalid request: {}", e),
            });
        }
    };

    match req {
        Request::History { user_id } => reply(history(user_id, store)),
        Request::SendMessage { user_id, text } => {
            let gateway = gateway.clone();

            spawn(move || reply(send_message(user_id, &text, &gateway)));
        }
    }
}
