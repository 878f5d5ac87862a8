//! Synchronous in-process pub/sub with a bounded introspection ring.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::event::{EmittedEvent, HubEvent};

/// A subscribed handler. A panic inside a handler is caught and logged; it
/// never aborts the emission or blocks sibling handlers.
pub type Handler = Arc<dyn Fn(&EmittedEvent) + Send + Sync>;

/// Default capacity of the recent-events ring.
pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Clone)]
struct Subscription {
    /// `None` means wildcard: receives every event.
    event_type: Option<&'static str>,
    handler: Handler,
}

struct Inner {
    subscriptions: Vec<Subscription>,
    ring: VecDeque<EmittedEvent>,
    capacity: usize,
}

/// In-process typed pub/sub bus with a bounded recent-events ring.
///
/// Subscriptions fire synchronously, in the order they were registered, on
/// the emitter's own call stack — there is no queue or background dispatch
/// thread. A handler that panics is isolated: the panic is caught, logged,
/// and the remaining handlers still run.
pub struct EventBus {
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates a bus with the default ring capacity (1000).
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus whose recent-events ring holds at most `capacity`
    /// events, evicting the oldest once full.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                subscriptions: Vec::new(),
                ring: VecDeque::with_capacity(capacity.min(64)),
                capacity,
            }),
        }
    }

    /// Subscribes `handler` to every event of `event_type`.
    pub fn subscribe(&self, event_type: &'static str, handler: impl Fn(&EmittedEvent) + Send + Sync + 'static) {
        self.inner.lock().subscriptions.push(Subscription {
            event_type: Some(event_type),
            handler: Arc::new(handler),
        });
    }

    /// Subscribes `handler` to every event regardless of type.
    pub fn subscribe_all(&self, handler: impl Fn(&EmittedEvent) + Send + Sync + 'static) {
        self.inner.lock().subscriptions.push(Subscription {
            event_type: None,
            handler: Arc::new(handler),
        });
    }

    /// Assigns an id and timestamp to `event`, records it in the ring, and
    /// invokes matching handlers synchronously in subscription order.
    /// Returns the emitted, stamped event.
    pub fn emit(&self, event: HubEvent) -> EmittedEvent {
        let emitted = EmittedEvent {
            id: Uuid::new_v4().to_string(),
            at: Utc::now().to_rfc3339(),
            event,
        };

        let type_name = emitted.event.type_name();
        let matching: Vec<Handler> = {
            let mut guard = self.inner.lock();
            guard.ring.push_back(emitted.clone());
            while guard.ring.len() > guard.capacity {
                guard.ring.pop_front();
            }
            guard
                .subscriptions
                .iter()
                .filter(|sub| sub.event_type.is_none_or(|t| t == type_name))
                .map(|sub| Arc::clone(&sub.handler))
                .collect()
        };

        for handler in matching {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(&emitted)));
            if result.is_err() {
                tracing::error!(event_type = type_name, "event handler panicked");
            }
        }

        emitted
    }

    /// Returns recent events, optionally filtered by `type_name`, oldest
    /// first, newest-`limit` if given.
    #[must_use]
    pub fn recent(&self, type_name: Option<&str>, limit: Option<usize>) -> Vec<EmittedEvent> {
        let guard = self.inner.lock();
        let filtered: Vec<EmittedEvent> = guard
            .ring
            .iter()
            .filter(|e| type_name.is_none_or(|t| e.event.type_name() == t))
            .cloned()
            .collect();
        apply_limit(filtered, limit)
    }

    /// Returns recent events concerning `task_id`, oldest first.
    #[must_use]
    pub fn recent_for_task(&self, task_id: &str, limit: Option<usize>) -> Vec<EmittedEvent> {
        let guard = self.inner.lock();
        let filtered: Vec<EmittedEvent> = guard
            .ring
            .iter()
            .filter(|e| e.event.task_id() == Some(task_id))
            .cloned()
            .collect();
        apply_limit(filtered, limit)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_limit(events: Vec<EmittedEvent>, limit: Option<usize>) -> Vec<EmittedEvent> {
    match limit {
        Some(n) if n < events.len() => events[events.len() - n..].to_vec(),
        _ => events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn handlers_fire_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let order = Arc::clone(&order);
            bus.subscribe("TASK_STARTED", move |_| order.lock().push(1));
        }
        {
            let order = Arc::clone(&order);
            bus.subscribe_all(move |_| order.lock().push(2));
        }
        bus.emit(HubEvent::TaskStarted {
            task_id: "t1".to_string(),
        });
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[test]
    fn wildcard_receives_every_type() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        {
            let count = Arc::clone(&count);
            bus.subscribe_all(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }
        bus.emit(HubEvent::TaskStarted {
            task_id: "t1".to_string(),
        });
        bus.emit(HubEvent::TrustUpdate {
            account: "a".to_string(),
            delta: 5,
            new_score: 55,
        });
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_handler_does_not_block_siblings() {
        let bus = EventBus::new();
        let ran = Arc::new(AtomicUsize::new(0));
        bus.subscribe_all(|_| panic!("boom"));
        {
            let ran = Arc::clone(&ran);
            bus.subscribe_all(move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
            });
        }
        bus.emit(HubEvent::TaskStarted {
            task_id: "t1".to_string(),
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ring_buffer_evicts_oldest_past_capacity() {
        let bus = EventBus::with_capacity(2);
        for i in 0..5 {
            bus.emit(HubEvent::ProgressUpdate {
                task_id: "t1".to_string(),
                message: format!("m{i}"),
            });
        }
        let recent = bus.recent(None, None);
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn recent_for_task_filters_by_task_id() {
        let bus = EventBus::new();
        bus.emit(HubEvent::TaskStarted {
            task_id: "t1".to_string(),
        });
        bus.emit(HubEvent::TaskStarted {
            task_id: "t2".to_string(),
        });
        let for_t1 = bus.recent_for_task("t1", None);
        assert_eq!(for_t1.len(), 1);
    }
}
