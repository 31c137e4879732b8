//! Registry - the set of extension descriptors known in this run

use chrono::Utc;
use std::collections::BTreeMap;

use super::discovery::Candidate;
use crate::domain::entities::{ExtensionDescriptor, ExtensionState, Snapshot};

/// Single source of truth for extension state.
///
/// Read access is public; state transitions are reserved to the lifecycle
/// components in this module.
#[derive(Debug, Default)]
pub struct Registry {
    descriptors: BTreeMap<String, ExtensionDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a discovered candidate. Known names keep their state.
    pub(super) fn observe(&mut self, candidate: &Candidate) -> bool {
        if self.descriptors.contains_key(&candidate.name) {
            return false;
        }
        self.descriptors.insert(
            candidate.name.clone(),
            ExtensionDescriptor::new(candidate.name.clone(), candidate.import_path()),
        );
        true
    }

    pub(super) fn transition(&mut self, name: &str, state: ExtensionState) {
        if let Some(descriptor) = self.descriptors.get_mut(name) {
            tracing::debug!(
                extension = %name,
                from = %descriptor.status(),
                to = %state.status(),
                "State transition"
            );
            descriptor.state = state;
            descriptor.updated_at = Utc::now();
        }
    }

    pub fn get(&self, name: &str) -> Option<&ExtensionDescriptor> {
        self.descriptors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ExtensionDescriptor> {
        self.descriptors.values()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.descriptors.values().collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
