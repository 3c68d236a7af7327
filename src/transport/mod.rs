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

pub mod telegram;

use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The request never got a usable answer
    Network(String),
    /// The remote API refused the request
    Rejected { status: u16, description: String },
    /// The remote API answered with something we could not make sense of
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            TransportError::Network(ref e) => write!(f, "network error: {}", e),
            TransportError::Rejected {
                status,
                ref description,
            } => write!(f, "rejected with status {}: {}", status, description),
            TransportError::Decode(ref e) => write!(f, "undecodable response: {}", e),
        }
    }
}

impl error::Error for TransportError {}

/// Delivers a text message to a reporter.
pub trait Courier: Send + Sync {
    fn send(&self, reporter_id: &str, text: &str) -> Result<(), TransportError>;
}
