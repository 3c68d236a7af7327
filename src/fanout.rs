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

//! Pushes events to every subscribed observer.
//!
//! Each observer owns a bounded queue. `publish` never blocks: an observer
//! whose queue is full or whose receiving end went away is dropped on the
//! spot, everyone else still gets the event.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::{Mutex, PoisonError};

pub type ObserverId = usize;

pub struct Fanout<E> {
    observers: Mutex<Vec<(ObserverId, SyncSender<E>)>>,
    next_id: AtomicUsize,
    capacity: usize,
}

/// Receiving end of a subscription. Only events published after
/// `subscribe` returned are seen.
pub struct Observer<E> {
    id: ObserverId,
    rx: Receiver<E>,
}

impl<E> Observer<E> {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Blocks until the next event, `None` once unsubscribed
    pub fn recv(&self) -> Option<E> {
        self.rx.recv().ok()
    }

    #[cfg(test)]
    pub fn try_recv(&self) -> Result<E, ::std::sync::mpsc::TryRecvError> {
        self.rx.try_recv()
    }
}

impl<E: Clone> Fanout<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(0),
            // a zero sized sync_channel would only deliver to a blocked receiver
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Observer<E> {
        let (tx, rx) = sync_channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, tx));
        debug!("observer {} subscribed", id);

        Observer { id, rx }
    }

    /// Returns false if `id` was not subscribed (or was already dropped).
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();

        observers.retain(|&(i, _)| i != id);
        debug!("observer {} unsubscribed", id);

        observers.len() != before
    }

    /// Delivers `event` to every observer, returns how many got it.
    pub fn publish(&self, event: &E) -> usize {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut delivered = 0;

        observers.retain(|&(id, ref tx)| match tx.try_send(event.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("observer {} is not keeping up, dropping it", id);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("observer {} went away", id);
                false
            }
        });

        delivered
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
