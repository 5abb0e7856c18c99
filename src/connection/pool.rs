//! A free-list of idle session slots.
//!
//! Slots move out on `acquire` and back in on `release`; a slot is never
//! leased twice because the pool only ever holds it by value.
//!
//! 空闲会话槽位的空闲链表。槽位在 `acquire` 时移出、在 `release` 时移回；
//! 由于池只按值持有槽位，同一槽位不会被重复租用。

use super::session::Session;
use tracing::trace;

#[derive(Debug)]
pub(crate) struct SessionPool {
    free: Vec<Session>,
    capacity: usize,
    outbound_capacity: usize,
}

impl SessionPool {
    pub(crate) fn new(capacity: usize, outbound_capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
            outbound_capacity,
        }
    }

    /// Takes an idle slot, allocating one when the free-list is empty.
    pub(crate) fn acquire(&mut self) -> Session {
        match self.free.pop() {
            Some(session) => session,
            None => {
                trace!("Session pool empty, allocating new slot");
                Session::new(self.outbound_capacity)
            }
        }
    }

    /// Cleans a slot and keeps it for reuse, unless the pool is full.
    pub(crate) fn release(&mut self, mut session: Session) {
        session.reset();
        if self.free.len() < self.capacity {
            self.free.push(session);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.free.len()
    }
}
