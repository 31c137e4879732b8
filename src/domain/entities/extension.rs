//! Extension descriptor and snapshot types

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Why an activation left an extension in the failed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The runtime or the entry point returned an error
    Error,
    /// The entry point did not return in time
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    /// Full rendered cause chain
    pub message: String,
}

impl FailureReason {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Error,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FailureKind::Error => write!(f, "{}", self.message),
            FailureKind::Timeout => write!(f, "timed out: {}", self.message),
        }
    }
}

/// Live state of one extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionState {
    Unloaded,
    Loaded,
    Failed(FailureReason),
    /// Discovered but structurally invalid; never handed to the runtime
    Invalid(String),
}

impl ExtensionState {
    pub fn status(&self) -> ExtensionStatus {
        match self {
            ExtensionState::Unloaded => ExtensionStatus::Unloaded,
            ExtensionState::Loaded => ExtensionStatus::Loaded,
            ExtensionState::Failed(_) => ExtensionStatus::Failed,
            ExtensionState::Invalid(_) => ExtensionStatus::Invalid,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ExtensionState::Loaded)
    }
}

/// State without its payload, for messages and comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionStatus {
    Unloaded,
    Loaded,
    Failed,
    Invalid,
}

impl ExtensionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExtensionStatus::Unloaded => "not loaded",
            ExtensionStatus::Loaded => "loaded",
            ExtensionStatus::Failed => "failed",
            ExtensionStatus::Invalid => "invalid",
        }
    }
}

impl fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle operation an operator can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Unload,
    Reload,
}

impl Operation {
    pub fn as_str(&self) -> &str {
        match self {
            Operation::Load => "load",
            Operation::Unload => "unload",
            Operation::Reload => "reload",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity and state of one extension
#[derive(Debug, Clone)]
pub struct ExtensionDescriptor {
    pub name: String,
    pub import_path: String,
    pub state: ExtensionState,
    pub updated_at: DateTime<Utc>,
}

impl ExtensionDescriptor {
    pub fn new(name: impl Into<String>, import_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            import_path: import_path.into(),
            state: ExtensionState::Unloaded,
            updated_at: Utc::now(),
        }
    }

    pub fn status(&self) -> ExtensionStatus {
        self.state.status()
    }
}

/// Point-in-time view of every known extension, partitioned by state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub loaded: BTreeSet<String>,
    pub unloaded: BTreeSet<String>,
    pub failed: BTreeMap<String, FailureReason>,
    pub invalid: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.contains(name)
    }

    /// Everything that is known but not currently active
    pub fn not_loaded(&self) -> BTreeSet<&str> {
        self.unloaded
            .iter()
            .chain(self.failed.keys())
            .chain(self.invalid.keys())
            .map(String::as_str)
            .collect()
    }

    pub fn total(&self) -> usize {
        self.loaded.len() + self.unloaded.len() + self.failed.len() + self.invalid.len()
    }
}

impl<'a> FromIterator<&'a ExtensionDescriptor> for Snapshot {
    fn from_iter<I: IntoIterator<Item = &'a ExtensionDescriptor>>(iter: I) -> Self {
        let mut snapshot = Snapshot::default();
        for descriptor in iter {
            let name = descriptor.name.clone();
            match &descriptor.state {
                ExtensionState::Loaded => {
                    snapshot.loaded.insert(name);
                }
                ExtensionState::Unloaded => {
                    snapshot.unloaded.insert(name);
                }
                ExtensionState::Failed(reason) => {
                    snapshot.failed.insert(name, reason.clone());
                }
                ExtensionState::Invalid(reason) => {
                    snapshot.invalid.insert(name, reason.clone());
                }
            }
        }
        snapshot
    }
}
