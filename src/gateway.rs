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

//! Validates operator messages and hands them to the outbound courier.

use processor::InvalidInput;
use std::error;
use std::fmt;
use std::sync::Arc;
use transport::{Courier, TransportError};

#[derive(Debug, Clone, PartialEq)]
pub enum SendError {
    InvalidInput(InvalidInput),
    Transport(TransportError),
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SendError::InvalidInput(ref e) => write!(f, "{}", e),
            SendError::Transport(ref e) => write!(f, "could not send message: {}", e),
        }
    }
}

impl error::Error for SendError {}

impl From<TransportError> for SendError {
    fn from(err: TransportError) -> SendError {
        SendError::Transport(err)
    }
}

pub struct Gateway {
    courier: Arc<dyn Courier>,
}

impl Gateway {
    pub fn new(courier: Arc<dyn Courier>) -> Self {
        Self { courier }
    }

    /// Failed deliveries are reported, never retried.
    pub fn send_message(&self, reporter_id: &str, text: &str) -> Result<(), SendError> {
        if reporter_id.trim().is_empty() {
            return Err(SendError::InvalidInput(InvalidInput::MissingField("user_id")));
        }

        if text.trim().is_empty() {
            return Err(SendError::InvalidInput(InvalidInput::MissingField("text")));
        }

        info!("sending message to {}: {}", reporter_id, text);

        if let Err(e) = self.courier.send(reporter_id, text) {
            error!("failed to send message to {}: {}", reporter_id, e);
            return Err(e.into());
        }

        info!("message sent to {}", reporter_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::mock::RecordingCourier;

    #[test]
    fn test_send_message() {
        let c = Arc::new(RecordingCourier::default());
        let g = Gateway::new(c.clone());

        assert_eq!(g.send_message("1234", "come home"), Ok(()));
        assert_eq!(c.sent(), vec![("1234".to_string(), "come home".to_string())]);
    }

    #[test]
    fn test_empty_fields_never_reach_courier() {
        let c = Arc::new(RecordingCourier::default());
        let g = Gateway::new(c.clone());

        let e = g.send_message("1234", "").unwrap_err();
        assert_eq!(e, SendError::InvalidInput(InvalidInput::MissingField("text")));

        let e = g.send_message("1234", " \n\t ").unwrap_err();
        assert_eq!(e, SendError::InvalidInput(InvalidInput::MissingField("text")));

        let e = g.send_message("  ", "hello").unwrap_err();
        assert_eq!(e, SendError::InvalidInput(InvalidInput::MissingField("user_id")));

        let e = g.send_message("", "hello").unwrap_err();
        assert_eq!(e, SendError::InvalidInput(InvalidInput::MissingField("user_id")));

        assert!(c.sent().is_empty());
    }

    #[test]
    fn test_transport_error_is_surfaced() {
        let failure = TransportError::Rejected {
            status: 400,
            description: "Bad Request: chat not found".to_string(),
        };
        let c = Arc::new(RecordingCourier::failing(failure.clone()));
        let g = Gateway::new(c.clone());

        let e = g.send_message("1234", "hello").unwrap_err();
        assert_eq!(e, SendError::Transport(failure));
        // tried exactly once
        assert_eq!(c.sent().len(), 1);
    }
}
