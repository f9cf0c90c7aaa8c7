//! Toast notifications: a bounded queue with auto-dismiss.

pub mod host;

pub use host::ToastHost;

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const MAX_VISIBLE: usize = 3;
pub const DEFAULT_DURATION_MS: u32 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn css_class(&self) -> &'static str {
        match self {
            ToastKind::Success => "toast toast--success",
            ToastKind::Error => "toast toast--error",
            ToastKind::Warning => "toast toast--warning",
            ToastKind::Info => "toast toast--info",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ToastKind::Success => "check-circle",
            ToastKind::Error => "x-circle",
            ToastKind::Warning => "alert",
            ToastKind::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Runs a task after a delay. The browser implementation uses a JS timer.
pub trait DismissScheduler: Send + Sync {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce() + Send>);
}

pub struct TimeoutScheduler;

impl DismissScheduler for TimeoutScheduler {
    fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce() + Send>) {
        gloo_timers::callback::Timeout::new(delay_ms, task).forget();
    }
}

type Subscriber = Arc<dyn Fn(&[Toast]) + Send + Sync>;

struct State {
    toasts: VecDeque<Toast>,
    next_id: u64,
    subscribers: Vec<(u64, Subscriber)>,
}

#[derive(Clone)]
pub struct NotificationManager {
    state: Arc<Mutex<State>>,
    scheduler: Arc<dyn DismissScheduler>,
}

impl NotificationManager {
    pub fn new(scheduler: Arc<dyn DismissScheduler>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                toasts: VecDeque::new(),
                next_id: 1,
                subscribers: Vec::new(),
            })),
            scheduler,
        }
    }

    pub fn browser() -> Self {
        Self::new(Arc::new(TimeoutScheduler))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribers are called outside the lock so they may call back into the manager.
    fn notify(&self) {
        let (toasts, subscribers) = {
            let state = self.lock();
            let toasts: Vec<Toast> = state.toasts.iter().cloned().collect();
            let subscribers: Vec<Subscriber> =
                state.subscribers.iter().map(|(_, s)| s.clone()).collect();
            (toasts, subscribers)
        };
        for subscriber in subscribers {
            subscriber(&toasts);
        }
    }

    /// Shows a toast. `duration_ms == 0` keeps it until dismissed.
    pub fn show(&self, kind: ToastKind, message: impl Into<String>, duration_ms: u32) -> u64 {
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.toasts.push_back(Toast {
                id,
                kind,
                message: message.into(),
                created_at: Utc::now(),
            });
            while state.toasts.len() > MAX_VISIBLE {
                state.toasts.pop_front();
            }
            id
        };
        self.notify();

        if duration_ms > 0 {
            let manager = self.clone();
            self.scheduler.schedule(
                duration_ms,
                Box::new(move || {
                    manager.dismiss(id);
                }),
            );
        }
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Success, message, DEFAULT_DURATION_MS)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Error, message, DEFAULT_DURATION_MS)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Warning, message, DEFAULT_DURATION_MS)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.show(ToastKind::Info, message, DEFAULT_DURATION_MS)
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let removed = {
            let mut state = self.lock();
            let before = state.toasts.len();
            state.toasts.retain(|t| t.id != id);
            state.toasts.len() != before
        };
        if removed {
            self.notify();
        }
        removed
    }

    pub fn clear(&self) {
        self.lock().toasts.clear();
        self.notify();
    }

    pub fn visible(&self) -> Vec<Toast> {
        self.lock().toasts.iter().cloned().collect()
    }

    /// Registers a renderer; it immediately receives the current toasts.
    pub fn subscribe<F>(&self, subscriber: F) -> u64
    where
        F: Fn(&[Toast]) + Send + Sync + 'static,
    {
        let subscriber: Subscriber = Arc::new(subscriber);
        let (id, toasts) = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, subscriber.clone()));
            (id, state.toasts.iter().cloned().collect::<Vec<_>>())
        };
        subscriber(&toasts);
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        self.lock().subscribers.retain(|(sid, _)| *sid != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Collects scheduled tasks so tests decide when timers fire.
    #[derive(Default)]
    struct ManualScheduler {
        tasks: Mutex<Vec<(u32, Box<dyn FnOnce() + Send>)>>,
    }

    impl DismissScheduler for ManualScheduler {
        fn schedule(&self, delay_ms: u32, task: Box<dyn FnOnce() + Send>) {
            self.tasks.lock().unwrap().push((delay_ms, task));
        }
    }

    impl ManualScheduler {
        fn fire_all(&self) {
            let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
            for (_, task) in tasks {
                task();
            }
        }

        fn delays(&self) -> Vec<u32> {
            self.tasks.lock().unwrap().iter().map(|(d, _)| *d).collect()
        }
    }

    fn manager() -> (NotificationManager, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::default());
        (NotificationManager::new(scheduler.clone()), scheduler)
    }

    #[test]
    fn test_at_most_three_visible_oldest_evicted() {
        let (manager, _) = manager();
        for i in 0..5 {
            manager.info(format!("msg {}", i));
        }
        let messages: Vec<String> = manager.visible().into_iter().map(|t| t.message).collect();
        assert_eq!(messages, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn test_auto_dismiss_after_default_duration() {
        let (manager, scheduler) = manager();
        manager.success("saved");
        assert_eq!(scheduler.delays(), vec![DEFAULT_DURATION_MS]);
        scheduler.fire_all();
        assert!(manager.visible().is_empty());
    }

    #[test]
    fn test_zero_duration_is_sticky() {
        let (manager, scheduler) = manager();
        manager.show(ToastKind::Warning, "offline", 0);
        assert!(scheduler.delays().is_empty());
        assert_eq!(manager.visible().len(), 1);
    }

    #[test]
    fn test_manual_dismiss_and_late_timer() {
        let (manager, scheduler) = manager();
        let id = manager.error("failed");
        assert!(manager.dismiss(id));
        assert!(!manager.dismiss(id));
        scheduler.fire_all();
        assert!(manager.visible().is_empty());
    }

    #[test]
    fn test_subscriber_sees_every_change() {
        let (manager, _) = manager();
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = sizes.clone();
        let sub = manager.subscribe(move |toasts| sink.lock().unwrap().push(toasts.len()));
        manager.info("a");
        manager.info("b");
        manager.clear();
        manager.unsubscribe(sub);
        manager.info("c");
        assert_eq!(*sizes.lock().unwrap(), vec![0, 1, 2, 0]);
    }
}
