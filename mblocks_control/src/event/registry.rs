//! Generation-tagged handler registrations.
//!
//! One slot per [`Source`]. Arming bumps the slot's generation and stores the
//! handler in one step, which invalidates every event still carrying the old
//! token. Delivery takes the handler out of the slot, so a registration is
//! consumed exactly once.

use mblocks_common::actuator::event::{CompletionEvent, Source, Token};
use mblocks_common::consts::EVENT_SOURCES;

#[derive(Debug, Clone, Copy)]
struct Slot<H> {
    generation: Token,
    handler: Option<H>,
}

/// Handler table, generic over the handler type (a function pointer in
/// practice).
#[derive(Debug, Clone)]
pub struct HandlerRegistry<H: Copy> {
    slots: [Slot<H>; EVENT_SOURCES],
}

impl<H: Copy> Default for HandlerRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Copy> HandlerRegistry<H> {
    pub const fn new() -> Self {
        Self {
            slots: [Slot {
                generation: Token(0),
                handler: None,
            }; EVENT_SOURCES],
        }
    }

    /// Register `handler` for the next outcome of `source`.
    ///
    /// Returns the token the outcome must carry to be delivered.
    pub fn arm(&mut self, source: Source, handler: H) -> Token {
        let slot = &mut self.slots[source.index()];
        slot.generation = slot.generation.next();
        slot.handler = Some(handler);
        slot.generation
    }

    /// Drop any registration for `source` and invalidate its pending events.
    pub fn cancel(&mut self, source: Source) {
        let slot = &mut self.slots[source.index()];
        slot.generation = slot.generation.next();
        slot.handler = None;
    }

    /// Current generation of `source`.
    #[inline]
    pub fn generation(&self, source: Source) -> Token {
        self.slots[source.index()].generation
    }

    #[inline]
    pub fn is_armed(&self, source: Source) -> bool {
        self.slots[source.index()].handler.is_some()
    }

    /// Whether any source still owes a delivery.
    pub fn any_armed(&self) -> bool {
        self.slots.iter().any(|s| s.handler.is_some())
    }

    /// Take the handler for `event` if its token is current.
    ///
    /// `None` means the event is stale (superseded) or already delivered.
    pub fn take(&mut self, event: &CompletionEvent) -> Option<H> {
        let slot = &mut self.slots[event.source.index()];
        if slot.generation != event.token {
            return None;
        }
        slot.handler.take()
    }
}
