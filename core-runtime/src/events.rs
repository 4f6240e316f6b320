//! # In-Process Event Channel
//!
//! A name-keyed listener table implementing
//! [`EventChannel`](bridge_traits::EventChannel). Hosts whose native layer
//! pushes notifications into Rust (rather than through a platform emitter)
//! create one of these, hand it to the filesystem core, and call
//! [`LocalEventChannel::emit`] when the native side reports an event.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  emit("DownloadProgress-3")  ┌───────────────────┐
//! │ Native layer ├─────────────────────────────>│ LocalEventChannel │
//! └──────────────┘                              │  name -> [cb, ..] │
//!                                               └─────────┬─────────┘
//!                                                         │ invoke
//!                                               ┌─────────▼─────────┐
//!                                               │ listeners for "3" │
//!                                               └───────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::EventChannel;
//! use core_runtime::events::LocalEventChannel;
//! use std::sync::Arc;
//!
//! let channel = LocalEventChannel::new("device");
//! let subscription = channel.add_listener(
//!     "DownloadBegin-1",
//!     Arc::new(|payload| println!("begin: {}", payload)),
//! );
//!
//! assert_eq!(channel.emit("DownloadBegin-1", &serde_json::json!({ "jobId": 1 })), 1);
//! subscription.remove();
//! assert_eq!(channel.listener_count("DownloadBegin-1"), 0);
//! ```
//!
//! ## Delivery
//!
//! Listeners run synchronously on the emitting thread, in registration order.
//! The table lock is released before any listener runs, so a listener may add
//! or remove subscriptions without deadlocking.

use bridge_traits::events::{EventCallback, EventChannel, Subscription};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Per-event-name bookkeeping, used by hosts for diagnostics and by tests
/// to assert that every listener that was added was also removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub added: usize,
    pub removed: usize,
}

impl ListenerStats {
    pub fn active(&self) -> usize {
        self.added - self.removed
    }
}

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    listeners: HashMap<String, Vec<(u64, EventCallback)>>,
    stats: HashMap<String, ListenerStats>,
}

impl ListenerTable {
    fn insert(&mut self, event_name: &str, callback: EventCallback) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.listeners
            .entry(event_name.to_string())
            .or_default()
            .push((id, callback));
        self.stats.entry(event_name.to_string()).or_default().added += 1;
        id
    }

    fn remove(&mut self, event_name: &str, id: u64) -> bool {
        let Some(entries) = self.listeners.get_mut(event_name) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            self.listeners.remove(event_name);
        }
        if removed {
            self.stats.entry(event_name.to_string()).or_default().removed += 1;
        }
        removed
    }
}

/// Listener table shared between the channel and its subscription handles.
#[derive(Clone)]
pub struct LocalEventChannel {
    name: Arc<str>,
    active: bool,
    table: Arc<Mutex<ListenerTable>>,
}

impl LocalEventChannel {
    /// Creates an active channel.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            active: true,
            table: Arc::new(Mutex::new(ListenerTable::default())),
        }
    }

    /// Creates a channel that reports no listener support, standing in for
    /// the other platform's emitter.
    pub fn inactive(name: impl Into<String>) -> Self {
        Self {
            active: false,
            ..Self::new(name)
        }
    }

    /// Delivers `payload` to every listener of `event_name`.
    ///
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event_name: &str, payload: &Value) -> usize {
        let callbacks: Vec<EventCallback> = {
            let table = self.table.lock();
            match table.listeners.get(event_name) {
                Some(entries) => entries.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
                None => Vec::new(),
            }
        };

        trace!(channel = %self.name, event = event_name, listeners = callbacks.len(), "Emitting event");

        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    /// Returns the number of listeners currently attached to `event_name`.
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.table
            .lock()
            .listeners
            .get(event_name)
            .map_or(0, Vec::len)
    }

    /// Returns the number of listeners attached across all event names.
    pub fn total_listener_count(&self) -> usize {
        self.table.lock().listeners.values().map(Vec::len).sum()
    }

    /// Add/remove counters for `event_name` over the channel's lifetime.
    pub fn stats(&self, event_name: &str) -> ListenerStats {
        self.table
            .lock()
            .stats
            .get(event_name)
            .copied()
            .unwrap_or_default()
    }
}

impl EventChannel for LocalEventChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_listeners(&self) -> bool {
        self.active
    }

    fn add_listener(&self, event_name: &str, callback: EventCallback) -> Box<dyn Subscription> {
        let id = self.table.lock().insert(event_name, callback);
        trace!(channel = %self.name, event = event_name, id, "Listener added");
        Box::new(LocalSubscription {
            table: Arc::downgrade(&self.table),
            event_name: event_name.to_string(),
            id,
        })
    }
}

impl fmt::Debug for LocalEventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalEventChannel")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("listener_count", &self.total_listener_count())
            .finish()
    }
}

/// Handle returned by [`LocalEventChannel::add_listener`].
///
/// Holds only a weak reference; removing after the channel is gone is a no-op.
struct LocalSubscription {
    table: Weak<Mutex<ListenerTable>>,
    event_name: String,
    id: u64,
}

impl Subscription for LocalSubscription {
    fn remove(self: Box<Self>) {
        if let Some(table) = self.table.upgrade() {
            table.lock().remove(&self.event_name, self.id);
        }
    }
}
