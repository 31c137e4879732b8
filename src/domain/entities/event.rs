//! Gateway events extensions can subscribe to

use super::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ready,
    Message,
}

#[derive(Debug, Clone)]
pub enum Event {
    /// Startup pass finished and the gateway is accepting messages
    Ready { bot: String },
    /// A plain (non-command) message arrived
    Message(Message),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Ready { .. } => EventKind::Ready,
            Event::Message(_) => EventKind::Message,
        }
    }
}
