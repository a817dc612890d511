//! Channel-scoped publish/subscribe
//!
//! Every participating unit owns a bus with a finite set of registered
//! channels; the container owns one whose channel set is the union of all
//! units' declarations. Emitting on an unregistered channel is silently
//! dropped. The wildcard channel `*` is implicitly registered and receives
//! every delivered event together with its channel name.
//!
//! Listener lists are snapshot-copied before dispatch so a listener may
//! remove itself (or others) while an emit is in flight.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[cfg(feature = "logging")]
use tracing::trace;

/// The implicit catch-all channel.
pub const WILDCARD: &str = "*";

/// Type-erased event payload.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A delivered event: the channel it was emitted on plus its payload.
pub struct Event {
    channel: String,
    payload: Payload,
}

impl Event {
    /// Channel the event was emitted on.
    #[inline]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Downcast the payload to a shared `T`.
    #[inline]
    pub fn payload<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.payload).downcast::<T>().ok()
    }

    /// Borrow the payload as a `T`.
    #[inline]
    pub fn payload_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// The raw payload, for re-emission.
    #[inline]
    pub fn payload_any(&self) -> Payload {
        Arc::clone(&self.payload)
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event").field("channel", &self.channel).finish()
    }
}

/// Handle identifying a registered listener, returned by `on`/`once`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

struct ListenerEntry {
    id: ListenerId,
    once: bool,
    callback: Listener,
}

struct BusInner {
    /// Registered channels in declaration order (`*` is implicit)
    channels: Mutex<Vec<String>>,
    /// Channel name to ordered listener list
    listeners: Mutex<HashMap<String, Vec<ListenerEntry>>>,
    next_id: AtomicU64,
}

/// A channel-scoped event bus.
///
/// Cloning yields another handle to the same bus.
///
/// ```rust
/// use assemblage::EventBus;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// let bus = EventBus::new();
/// bus.add_channels(["ready"]);
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&hits);
/// bus.on("ready", move |_event| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// assert!(bus.emit_value("ready", true));
/// assert!(!bus.emit_value("unknown", true)); // silently dropped
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for BusInner {
    fn default() -> Self {
        Self {
            channels: Mutex::new(Vec::new()),
            listeners: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl EventBus {
    /// Create a bus with no registered channels.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a bus with an initial channel set.
    pub fn with_channels<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bus = Self::new();
        bus.add_channels(channels);
        bus
    }

    /// Register channels. Already-registered names are ignored.
    pub fn add_channels<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registered = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for channel in channels {
            let channel = channel.into();
            if channel != WILDCARD && !registered.contains(&channel) {
                registered.push(channel);
            }
        }
    }

    /// Unregister channels and drop their listeners.
    pub fn remove_channels<'a, I>(&self, channels: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut registered = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for channel in channels {
            registered.retain(|name| name != channel);
            listeners.remove(channel);
        }
    }

    /// Registered channels in declaration order, wildcard excluded.
    pub fn channels(&self) -> Vec<String> {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Whether a channel is registered. The wildcard always is.
    pub fn has_channel(&self, channel: &str) -> bool {
        channel == WILDCARD
            || self
                .inner
                .channels
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .any(|name| name == channel)
    }

    /// Subscribe to a channel (or `*`). Delivery requires the channel to be
    /// registered at emit time; the listener itself may be installed early.
    pub fn on<F>(&self, channel: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(channel.into(), callback, false)
    }

    /// Subscribe for a single delivery; the listener is removed after its
    /// first invocation.
    pub fn once<F>(&self, channel: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe(channel.into(), callback, true)
    }

    fn subscribe<F>(&self, channel: String, callback: F, once: bool) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(channel)
            .or_default()
            .push(ListenerEntry {
                id,
                once,
                callback: Arc::new(callback),
            });
        id
    }

    /// Remove a listener. Returns whether it was present.
    pub fn off(&self, channel: &str, id: ListenerId) -> bool {
        let mut listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        match listeners.get_mut(channel) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|entry| entry.id != id);
                before != entries.len()
            }
            None => false,
        }
    }

    /// Emit a payload on a channel.
    ///
    /// Returns `false` without invoking anything when the channel is not
    /// registered. Wildcard listeners receive the event after the channel's
    /// own listeners, in registration order.
    pub fn emit(&self, channel: &str, payload: Payload) -> bool {
        if channel == WILDCARD || !self.has_channel(channel) {
            #[cfg(feature = "logging")]
            trace!(
                target: "assemblage",
                channel,
                "emit on unregistered channel dropped"
            );
            return false;
        }
        let event = Event {
            channel: channel.to_string(),
            payload,
        };
        self.dispatch(channel, &event);
        self.dispatch(WILDCARD, &event);
        true
    }

    /// Emit an owned value, wrapping it into a payload.
    #[inline]
    pub fn emit_value<T: Send + Sync + 'static>(&self, channel: &str, value: T) -> bool {
        self.emit(channel, Arc::new(value))
    }

    fn dispatch(&self, key: &str, event: &Event) {
        // Snapshot before invoking so listeners can mutate the list.
        let snapshot: Vec<(ListenerId, bool, Listener)> = {
            let listeners = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            match listeners.get(key) {
                Some(entries) => entries
                    .iter()
                    .map(|entry| (entry.id, entry.once, Arc::clone(&entry.callback)))
                    .collect(),
                None => return,
            }
        };
        for (id, once, callback) in snapshot {
            callback(event);
            if once {
                self.off(key, id);
            }
        }
    }

    /// Number of listeners currently registered on a channel.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Drop all channels and listeners.
    pub fn dispose(&self) {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("channels", &self.channels())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_listeners_in_order() {
        let bus = EventBus::with_channels(["tick"]);
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&log);
        bus.on("tick", move |_| first.lock().unwrap().push("first"));
        let second = Arc::clone(&log);
        bus.on("tick", move |_| second.lock().unwrap().push("second"));

        assert!(bus.emit_value("tick", ()));
        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    }

    #[test]
    fn test_emit_unregistered_is_noop() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.on("ghost", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!bus.emit_value("ghost", ()));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        // The channel was not implicitly created either.
        assert!(!bus.has_channel("ghost"));
    }

    #[test]
    fn test_wildcard_receives_channel_name() {
        let bus = EventBus::with_channels(["init"]);
        let seen = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&seen);
        bus.on(WILDCARD, move |event| {
            *slot.lock().unwrap() =
                Some((event.channel().to_string(), *event.payload_ref::<bool>().unwrap()));
        });

        bus.emit_value("init", true);
        assert_eq!(*seen.lock().unwrap(), Some(("init".to_string(), true)));
    }

    #[test]
    fn test_once_fires_a_single_time() {
        let bus = EventBus::with_channels(["pulse"]);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.once("pulse", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit_value("pulse", ());
        bus.emit_value("pulse", ());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count("pulse"), 0);
    }

    #[test]
    fn test_listener_can_remove_itself_mid_dispatch() {
        let bus = EventBus::with_channels(["evt"]);
        let hits = Arc::new(AtomicUsize::new(0));

        let self_removing = Arc::new(Mutex::new(None::<ListenerId>));
        let bus_handle = bus.clone();
        let slot = Arc::clone(&self_removing);
        let counter = Arc::clone(&hits);
        let id = bus.on("evt", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *slot.lock().unwrap() {
                bus_handle.off("evt", id);
            }
        });
        *self_removing.lock().unwrap() = Some(id);

        let counter = Arc::clone(&hits);
        bus.on("evt", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Both listeners run for the first emit, only the survivor after.
        bus.emit_value("evt", ());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        bus.emit_value("evt", ());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_off_removes_listener() {
        let bus = EventBus::with_channels(["evt"]);
        let id = bus.on("evt", |_| {});
        assert!(bus.off("evt", id));
        assert!(!bus.off("evt", id));
    }

    #[test]
    fn test_remove_channels_drops_listeners() {
        let bus = EventBus::with_channels(["a", "b"]);
        bus.on("a", |_| {});
        bus.remove_channels(["a"]);
        assert!(!bus.has_channel("a"));
        assert!(bus.has_channel("b"));
        assert_eq!(bus.listener_count("a"), 0);
    }

    #[test]
    fn test_dispose_clears_everything() {
        let bus = EventBus::with_channels(["a"]);
        bus.on("a", |_| {});
        bus.dispose();
        assert!(bus.channels().is_empty());
        assert!(!bus.emit_value("a", ()));
    }

    #[test]
    fn test_payload_downcast() {
        let bus = EventBus::with_channels(["msg"]);
        let seen = Arc::new(Mutex::new(String::new()));
        let slot = Arc::clone(&seen);
        bus.on("msg", move |event| {
            if let Some(text) = event.payload_ref::<String>() {
                *slot.lock().unwrap() = text.clone();
            }
        });
        bus.emit_value("msg", "hello".to_string());
        assert_eq!(*seen.lock().unwrap(), "hello");
    }
}
