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
use fanout::{Fanout, Observer, ObserverId};
use processor::Event;
use std::thread::{spawn, JoinHandle};
use ws;

/// Feeds map clients: a snapshot on connect, then every accepted position.
/// Clients may also ask for a reporter's history or send a reporter a message.
pub struct WebSocket {
    _handle: JoinHandle<()>,
}

/// The client end a connection writes to.
pub trait Outlet {
    /// Returns false once the client is gone.
    fn send_text(&self, text: String) -> bool;
    /// Closes the connection, asking the client to come back.
    fn hang_up(&self);
}

impl Outlet for ws::Sender {
    fn send_text(&self, text: String) -> bool {
        self.send(text).is_ok()
    }

    fn hang_up(&self) {
        if let Err(e) = self.close(ws::CloseCode::Again) {
            debug!("unable to close connection: {}", e);
        }
    }
}

struct Connection {
    out: ws::Sender,
    store: Arc<dyn LocationStore>,
    fanout: Arc<Fanout<Event>>,
    gateway: Arc<Gateway>,
    observer: Option<ObserverId>,
}

impl WebSocket {
    pub fn new(
        addr: String,
        store: Arc<dyn LocationStore>,
        fanout: Arc<Fanout<Event>>,
        gateway: Arc<Gateway>,
    ) -> ws::Result<Self> {
        let socket = ws::WebSocket::new(move |out| Connection {
            out,
            store: store.clone(),
            fanout: fanout.clone(),
            gateway: gateway.clone(),
            observer: None,
        })?;

        let handle = spawn(move || {
            if let Err(e) = socket.listen(addr) {
                error!("WebSocket server stopped: {}", e);
            }
        });
        debug!("spawned WebSocket thread");

        Ok(Self { _handle: handle })
    }
}

/// Subscribes `out`, sends it the snapshot, then starts forwarding.
///
/// Events accepted while the snapshot is taken wait in the observer's
/// queue, so they always reach the client after it.
fn greet<O>(store: &dyn LocationStore, fanout: &Fanout<Event>, out: O) -> ObserverId
    where O: Outlet + Send + 'static
{
    let observer = fanout.subscribe();
    let id = observer.id();

    out.send_text(snapshot(store).to_text());
    spawn(move || forward(observer, out));

    id
}

/// Copies events from `observer` into `out` until either side goes away.
fn forward<O: Outlet>(observer: Observer<Event>, out: O) {
    while let Some(event) = observer.recv() {
        let js = match serde_json::to_string(&event) {
            Ok(js) => js,
            Err(e) => {
                error!("unable to encode event: {}", e);
                continue;
            }
        };

        if !out.send_text(js) {
            trace!("client of observer {} is gone", observer.id());
            return;
        }
    }

    // dropped for falling behind, or unsubscribed on close
    debug!("observer {} ended, closing its connection", observer.id());
    out.hang_up();
}

impl ws::Handler for Connection {
    fn on_open(&mut self, _: ws::Handshake) -> ws::Result<()> {
        let id = greet(&*self.store, &self.fanout, self.out.clone());
        self.observer = Some(id);

        debug!("client connected, {} observers", self.fanout.observer_count());
        Ok(())
    }

    fn on_message(&mut self, msg: ws::Message) -> ws::Result<()> {
        match msg {
            ws::Message::Text(ref t) => {
                let out = self.out.clone();

                dispatch(t, &*self.store, &self.gateway, move |resp| {
                    out.send_text(resp.to_text());
                });
            }
            ws::Message::Binary(_) => {
                let resp = Response::Error {
                    code: ErrorCode::InvalidInput,
                    message: "binary frames are not supported".to_string(),
                };
                self.out.send(resp.to_text())?;
            }
        }

        Ok(())
    }

    fn on_close(&mut self, code: ws::CloseCode, reason: &str) {
        debug!("WebSocket client left ({:?}) {}", code, reason);

        if let Some(id) = self.observer.take() {
            self.fanout.unsubscribe(id);
        }
    }
}
