//! The run's single FIFO event queue.

use super::{Event, EventKind};
use std::collections::VecDeque;

/// FIFO queue shared by every collaborator of one run.
///
/// Insertion order is processing order; nothing is reprioritised. The
/// orchestrator owns the queue and lends it out by `&mut` for each callback,
/// so a fresh run always starts with a fresh queue.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: impl Into<Event>) {
        self.events.push_back(event.into());
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Kinds of the events queued at or after position `from`.
    pub(crate) fn kinds_from(&self, from: usize) -> impl Iterator<Item = EventKind> + '_ {
        self.events.iter().skip(from).map(Event::kind)
    }
}
