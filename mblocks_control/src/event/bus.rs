//! Completion event ring.
//!
//! Detection posts, dispatch drains in FIFO order. Every source has at most
//! one primitive in flight, so the ring never holds more than one event per
//! source plus whatever handlers post while chaining; the capacity is checked
//! against the source count at compile time.

use heapless::Deque;
use mblocks_common::actuator::event::CompletionEvent;
use mblocks_common::consts::{EVENT_BUS_CAPACITY, EVENT_SOURCES};
use static_assertions::const_assert;
use thiserror::Error;

const_assert!(EVENT_BUS_CAPACITY >= EVENT_SOURCES);

/// Posting failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventBusError {
    /// Ring full; the event was not queued.
    #[error("event bus full, dropped {0:?}")]
    Full(CompletionEvent),
}

/// FIFO of pending completion events.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: Deque<CompletionEvent, EVENT_BUS_CAPACITY>,
    overflows: u32,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event behind all pending ones.
    pub fn post(&mut self, event: CompletionEvent) -> Result<(), EventBusError> {
        self.queue.push_back(event).map_err(|e| {
            self.overflows = self.overflows.saturating_add(1);
            EventBusError::Full(e)
        })
    }

    /// Oldest pending event.
    #[inline]
    pub fn pop(&mut self) -> Option<CompletionEvent> {
        self.queue.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Events refused because the ring was full.
    #[inline]
    pub const fn overflows(&self) -> u32 {
        self.overflows
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionEvent> {
        self.queue.iter()
    }
}
