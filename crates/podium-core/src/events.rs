//! # Event Queue
//!
//! Tick-scoped queue of slide and custom events. The engine enqueues during
//! slide transitions; the queue is flushed once per tick, before timeline
//! advancement, routing each event to every registered handler.

use std::collections::VecDeque;

use podium_data::ObjectId;

use crate::slides::TimelineScope;

/// Identifier returned by [`EventQueue::register`].
pub type HandlerId = usize;

/// An event emitted by the playback core.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SlideEntered {
        scope: TimelineScope,
        index: usize,
        name: String,
    },
    SlideExited {
        scope: TimelineScope,
        index: usize,
        name: String,
    },
    /// Host-defined event targeted at a graph object (actions, behaviors).
    Custom {
        target: ObjectId,
        name: String,
    },
}

type Handler = Box<dyn FnMut(&Event)>;

/// Queue plus handler registry. Events enqueued during a tick are delivered
/// at the start of the next tick's flush.
#[derive(Default)]
pub struct EventQueue {
    queue: VecDeque<Event>,
    handlers: Vec<(HandlerId, Handler)>,
    next_handler: HandlerId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn register(&mut self, handler: impl FnMut(&Event) + 'static) -> HandlerId {
        let id = self.next_handler;
        self.next_handler += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unregister(&mut self, id: HandlerId) {
        self.handlers.retain(|(hid, _)| *hid != id);
    }

    /// Drains the queue, routing every event to every handler in
    /// registration order.
    pub fn flush(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            for (_, handler) in self.handlers.iter_mut() {
                handler(&event);
            }
        }
    }
}
