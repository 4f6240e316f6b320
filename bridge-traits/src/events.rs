//! Event Channel Abstraction
//!
//! A platform delivers asynchronous notifications (download begin/progress)
//! through a publish/subscribe channel keyed by event name. Platforms ship
//! different channel implementations; a given host usually has exactly one
//! active, and the core subscribes on every channel it was handed that
//! reports [`EventChannel::supports_listeners`].

use serde_json::Value;
use std::sync::Arc;

/// Listener invoked synchronously, in delivery order, for each emitted event.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle to a registered listener.
pub trait Subscription: Send {
    /// Detach the listener. Consumes the handle so removal happens once.
    fn remove(self: Box<Self>);
}

/// Publish/subscribe mechanism provided by the host platform.
pub trait EventChannel: Send + Sync {
    /// Short name used in logs (e.g. `"device"`, `"app"`).
    fn name(&self) -> &str;

    /// Whether listeners can be attached on this platform.
    ///
    /// A channel that returns `false` belongs to another platform and is
    /// skipped without error.
    fn supports_listeners(&self) -> bool {
        true
    }

    /// Attach `callback` to events named `event_name`.
    fn add_listener(&self, event_name: &str, callback: EventCallback) -> Box<dyn Subscription>;
}
