//! Application-wide publish/subscribe bus.
//!
//! Listeners are kept per event name, ordered by descending priority
//! (registration order among equal priorities). A failing listener is logged
//! and never prevents the remaining listeners from running.

use futures::future::LocalBoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub type Payload = Value;

type SyncHandler = Arc<dyn Fn(&Payload) -> anyhow::Result<()> + Send + Sync>;
type AsyncHandler = Arc<dyn Fn(Payload) -> LocalBoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Handle returned by every registration, used with [`EventBus::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    pub priority: i32,
    pub once: bool,
}

impl ListenerOptions {
    pub fn priority(priority: i32) -> Self {
        Self {
            priority,
            once: false,
        }
    }
}

#[derive(Clone)]
enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
}

#[derive(Clone)]
struct Listener {
    id: ListenerId,
    priority: i32,
    once: bool,
    handler: Handler,
}

struct Inner {
    listeners: HashMap<String, Vec<Listener>>,
    next_id: u64,
    max_listeners: usize,
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                listeners: HashMap::new(),
                next_id: 1,
                max_listeners: DEFAULT_MAX_LISTENERS,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, event: &str, options: ListenerOptions, handler: Handler) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        let max = inner.max_listeners;

        let list = inner.listeners.entry(event.to_string()).or_default();
        // first slot whose priority is strictly lower keeps equal priorities in FIFO order
        let pos = list
            .iter()
            .position(|l| l.priority < options.priority)
            .unwrap_or(list.len());
        list.insert(
            pos,
            Listener {
                id,
                priority: options.priority,
                once: options.once,
                handler,
            },
        );

        if list.len() > max {
            log::warn!(
                "EventBus: event '{}' has {} listeners (max {}), possible leak",
                event,
                list.len(),
                max
            );
        }
        id
    }

    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_with(event, ListenerOptions::default(), handler)
    }

    pub fn on_with<F>(&self, event: &str, options: ListenerOptions, handler: F) -> ListenerId
    where
        F: Fn(&Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(event, options, Handler::Sync(Arc::new(handler)))
    }

    pub fn once<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_with(
            event,
            ListenerOptions {
                priority: 0,
                once: true,
            },
            handler,
        )
    }

    /// Registers a listener that is only invoked by [`EventBus::emit_async`].
    pub fn on_async<F>(&self, event: &str, options: ListenerOptions, handler: F) -> ListenerId
    where
        F: Fn(Payload) -> LocalBoxFuture<'static, anyhow::Result<()>> + Send + Sync + 'static,
    {
        self.register(event, options, Handler::Async(Arc::new(handler)))
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let mut removed = false;
        inner.listeners.retain(|_, list| {
            let before = list.len();
            list.retain(|l| l.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Takes the listeners to run for one emission and drops `once` entries
    /// from the registry before any of them is invoked.
    fn take_snapshot(&self, event: &str, include_async: bool) -> Vec<Listener> {
        let mut inner = self.lock();
        let Some(list) = inner.listeners.get_mut(event) else {
            return Vec::new();
        };
        let snapshot: Vec<Listener> = list
            .iter()
            .filter(|l| include_async || matches!(l.handler, Handler::Sync(_)))
            .cloned()
            .collect();
        list.retain(|l| !(l.once && snapshot.iter().any(|s| s.id == l.id)));
        if list.is_empty() {
            inner.listeners.remove(event);
        }
        snapshot
    }

    /// Invokes the synchronous listeners of `event` in priority order and
    /// returns how many ran. Async listeners are left for `emit_async`.
    pub fn emit(&self, event: &str, payload: Payload) -> usize {
        let snapshot = self.take_snapshot(event, false);
        for listener in &snapshot {
            if let Handler::Sync(handler) = &listener.handler {
                if let Err(e) = handler(&payload) {
                    log::error!("EventBus: listener for '{}' failed: {:#}", event, e);
                }
            }
        }
        snapshot.len()
    }

    /// Invokes every listener of `event`, awaiting async ones one by one.
    pub async fn emit_async(&self, event: &str, payload: Payload) -> usize {
        let snapshot = self.take_snapshot(event, true);
        for listener in &snapshot {
            let result = match &listener.handler {
                Handler::Sync(handler) => handler(&payload),
                Handler::Async(handler) => handler(payload.clone()).await,
            };
            if let Err(e) = result {
                log::error!("EventBus: listener for '{}' failed: {:#}", event, e);
            }
        }
        snapshot.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().listeners.get(event).map_or(0, Vec::len)
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().listeners.keys().cloned().collect();
        names.sort();
        names
    }

    /// Removes listeners of one event, or of every event when `event` is `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        let mut inner = self.lock();
        match event {
            Some(event) => {
                inner.listeners.remove(event);
            }
            None => inner.listeners.clear(),
        }
    }

    pub fn set_max_listeners(&self, max: usize) {
        self.lock().max_listeners = max;
    }

    pub fn namespace(&self, prefix: &str) -> NamespacedBus {
        NamespacedBus {
            bus: self.clone(),
            prefix: prefix.to_string(),
        }
    }
}

/// View of the bus that prefixes every event name with `"{prefix}:"`.
#[derive(Clone)]
pub struct NamespacedBus {
    bus: EventBus,
    prefix: String,
}

impl NamespacedBus {
    fn full(&self, event: &str) -> String {
        format!("{}:{}", self.prefix, event)
    }

    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(&self.full(event), handler)
    }

    pub fn once<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.once(&self.full(event), handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.bus.off(id)
    }

    pub fn emit(&self, event: &str, payload: Payload) -> usize {
        self.bus.emit(&self.full(event), payload)
    }

    pub async fn emit_async(&self, event: &str, payload: Payload) -> usize {
        self.bus.emit_async(&self.full(event), payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> SyncHandler) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |tag: &str| -> SyncHandler {
                let log = log.clone();
                let tag = tag.to_string();
                Arc::new(move |_: &Payload| {
                    log.lock().unwrap().push(tag.clone());
                    Ok(())
                })
            }
        };
        (log, make)
    }

    #[test]
    fn test_priority_order_is_descending_and_stable() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        for (tag, priority) in [("a", 0), ("b", 5), ("c", 0), ("d", 5), ("e", -1)] {
            let handler = make(tag);
            bus.on_with("evt", ListenerOptions::priority(priority), move |p| handler(p));
        }
        assert_eq!(bus.emit("evt", Payload::Null), 5);
        assert_eq!(*log.lock().unwrap(), vec!["b", "d", "a", "c", "e"]);
    }

    #[test]
    fn test_once_listener_runs_once() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        let handler = make("once");
        bus.once("evt", move |p| handler(p));
        bus.emit("evt", json!(1));
        bus.emit("evt", json!(2));
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(bus.listener_count("evt"), 0);
        assert!(bus.event_names().is_empty());
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on_with("evt", ListenerOptions::priority(10), |_| {
            Err(anyhow::anyhow!("boom"))
        });
        let handler = make("after");
        bus.on("evt", move |p| handler(p));
        assert_eq!(bus.emit("evt", Payload::Null), 2);
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_off_removes_only_that_listener() {
        let bus = EventBus::new();
        let first = bus.on("evt", |_| Ok(()));
        bus.on("evt", |_| Ok(()));
        assert!(bus.off(first));
        assert!(!bus.off(first));
        assert_eq!(bus.listener_count("evt"), 1);
    }

    #[test]
    fn test_listener_may_register_during_emit() {
        let bus = EventBus::new();
        let inner_bus = bus.clone();
        bus.on("evt", move |_| {
            inner_bus.on("other", |_| Ok(()));
            Ok(())
        });
        bus.emit("evt", Payload::Null);
        assert_eq!(bus.listener_count("other"), 1);
    }

    #[test]
    fn test_namespace_prefixes_events() {
        let bus = EventBus::new();
        let ns = bus.namespace("ai");
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        ns.on("complete", move |p| {
            *sink.lock().unwrap() = Some(p.clone());
            Ok(())
        });
        assert_eq!(bus.emit("ai:complete", json!({"text": "ok"})), 1);
        assert_eq!(*seen.lock().unwrap(), Some(json!({"text": "ok"})));
        assert_eq!(bus.event_names(), vec!["ai:complete".to_string()]);
    }

    #[test]
    fn test_remove_all_listeners() {
        let bus = EventBus::new();
        bus.on("a", |_| Ok(()));
        bus.on("b", |_| Ok(()));
        bus.remove_all_listeners(Some("a"));
        assert_eq!(bus.event_names(), vec!["b".to_string()]);
        bus.remove_all_listeners(None);
        assert!(bus.event_names().is_empty());
    }

    #[tokio::test]
    async fn test_emit_async_awaits_in_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let slow = log.clone();
        bus.on_async("evt", ListenerOptions::priority(1), move |payload| {
            let slow = slow.clone();
            Box::pin(async move {
                tokio::task::yield_now().await;
                slow.lock().unwrap().push(format!("async:{}", payload));
                Ok(())
            })
        });
        let fast = log.clone();
        bus.on("evt", move |_| {
            fast.lock().unwrap().push("sync".to_string());
            Ok(())
        });

        assert_eq!(bus.emit("evt", json!(1)), 1);
        assert_eq!(bus.emit_async("evt", json!(2)).await, 2);
        assert_eq!(*log.lock().unwrap(), vec!["sync", "async:2", "sync"]);
    }
}
