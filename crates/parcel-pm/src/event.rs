//! Progress events emitted by the distributor.
//!
//! Events are delivered synchronously, in the order the work happens, to
//! every registered listener. Listeners observe; they cannot stop a command.

use std::path::Path;
use std::sync::Arc;

use crate::archive::ArchiveHandle;
use crate::json::{DependencyRef, Manifest};

/// Lifecycle events of the `create` and `update` commands
#[derive(Debug, Clone, Copy)]
pub enum DistributionEvent<'a> {
    /// The manifest was parsed and an archive is about to be built
    CreateStarted { manifest: &'a Manifest },

    /// The archive is complete on disk
    ArchiveBuilt { handle: &'a ArchiveHandle, path: &'a Path },

    /// The archive was stored on the remote
    Uploaded { handle: &'a ArchiveHandle, endpoint: &'a str },

    /// The manifest was parsed and `total` dependencies will be processed
    UpdateStarted { manifest: &'a Manifest, total: usize },

    /// About to request a dependency archive
    Fetching { index: usize, total: usize, dependency: &'a DependencyRef },

    /// The dependency archive was stored locally
    Fetched { index: usize, total: usize, dependency: &'a DependencyRef, bytes: u64 },

    /// The dependency archive was unpacked into the working directory
    Extracted { index: usize, total: usize, dependency: &'a DependencyRef, entries: usize },

    /// Every dependency was applied
    UpdateFinished { applied: usize },
}

/// Trait for event listeners.
pub trait EventListener: Send + Sync {
    fn handle(&self, event: &DistributionEvent<'_>);
}

/// Event dispatcher that forwards events to its listeners in registration order.
#[derive(Default, Clone)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    pub fn dispatch(&self, event: DistributionEvent<'_>) {
        for listener in &self.listeners {
            listener.handle(&event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
