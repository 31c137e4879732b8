//! Event subscriptions owned by extensions

use crate::domain::entities::{Event, EventKind};
use crate::domain::traits::Listener;

struct Subscription {
    owner: String,
    kind: EventKind,
    listener: Listener,
}

/// Listeners registered by active extensions
#[derive(Default)]
pub struct Subscriptions {
    entries: Vec<Subscription>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, owner: impl Into<String>, kind: EventKind, listener: Listener) {
        self.entries.push(Subscription {
            owner: owner.into(),
            kind,
            listener,
        });
    }

    /// Drop every listener of `owner`, returning how many were removed
    pub fn remove_owned_by(&mut self, owner: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|s| s.owner != owner);
        before - self.entries.len()
    }

    /// Listeners interested in `event`, cloned so callers can release their lock
    pub fn matching(&self, event: &Event) -> Vec<Listener> {
        let kind = event.kind();
        self.entries
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.listener.clone())
            .collect()
    }

    pub fn count_owned_by(&self, owner: &str) -> usize {
        self.entries.iter().filter(|s| s.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_matching_filters_by_kind_and_removal_by_owner() {
        let mut subs = Subscriptions::new();
        subs.subscribe("general", EventKind::Ready, Arc::new(|_: &Event| Some("ready".to_string())));
        subs.subscribe("general", EventKind::Message, Arc::new(|_: &Event| None));
        subs.subscribe("fun", EventKind::Ready, Arc::new(|_: &Event| None));

        let ready = Event::Ready { bot: "powi".to_string() };
        assert_eq!(subs.matching(&ready).len(), 2);

        assert_eq!(subs.remove_owned_by("general"), 2);
        assert_eq!(subs.count_owned_by("general"), 0);
        assert_eq!(subs.matching(&ready).len(), 1);
    }
}
