//! Path-to-page router driving the page lifecycle.
//!
//! The router owns the current page, destroys it before the next one is
//! initialised and reports every transition on the event bus
//! (`route:before-change`, `route:after-change`, `route:change`,
//! `route:error`). History access goes through [`HistoryPort`] so the
//! transition rules are testable outside a browser.

use super::pages::{PageComponent, PageError};
use crate::shared::event_bus::EventBus;
use serde_json::json;
use std::cell::{Cell, RefCell};

pub const ROOT_PATH: &str = "/";

/// Browser history as seen by the router.
pub trait HistoryPort {
    fn current_path(&self) -> String;
    /// Adds an entry without triggering a route change.
    fn push(&self, path: &str);
    /// Rewrites the current entry without triggering a route change.
    fn replace(&self, path: &str);
    fn back(&self);
    fn forward(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Idle,
    Navigating,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome<V> {
    Rendered { path: String, view: V },
    NotFound { path: String },
    Failed { path: String, error: PageError },
    /// A transition was already in progress.
    Ignored,
}

type PageFactory<P> = Box<dyn Fn() -> P>;

pub struct Router<P: PageComponent, H: HistoryPort> {
    routes: RefCell<Vec<(String, PageFactory<P>)>>,
    history: H,
    bus: EventBus,
    state: Cell<RouterState>,
    started: Cell<bool>,
    current_path: RefCell<Option<String>>,
    current_page: RefCell<Option<P>>,
}

pub fn normalize_path(path: &str) -> String {
    let path = path.trim().trim_start_matches('#');
    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path.is_empty() {
        ROOT_PATH.to_string()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

impl<P: PageComponent, H: HistoryPort> Router<P, H> {
    pub fn new(history: H, bus: EventBus) -> Self {
        Self {
            routes: RefCell::new(Vec::new()),
            history,
            bus,
            state: Cell::new(RouterState::Idle),
            started: Cell::new(false),
            current_path: RefCell::new(None),
            current_page: RefCell::new(None),
        }
    }

    pub fn register(&self, path: &str, factory: impl Fn() -> P + 'static) {
        let path = normalize_path(path);
        let mut routes = self.routes.borrow_mut();
        routes.retain(|(p, _)| *p != path);
        routes.push((path, Box::new(factory)));
    }

    pub fn is_registered(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.routes.borrow().iter().any(|(p, _)| *p == path)
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn state(&self) -> RouterState {
        self.state.get()
    }

    pub fn current_path(&self) -> Option<String> {
        self.current_path.borrow().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.started.get() && self.state.get() != RouterState::Navigating
    }

    fn build(&self, path: &str) -> Option<P> {
        self.routes
            .borrow()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, factory)| factory())
    }

    fn destroy_current(&self) {
        let page = self.current_page.borrow_mut().take();
        if let Some(mut page) = page {
            page.destroy();
        }
    }

    /// Resolves the history's current path and renders its page.
    pub fn handle_route_change(&self) -> RouteOutcome<P::View> {
        if self.state.get() == RouterState::Navigating {
            log::warn!("router: navigation already in progress, ignoring");
            return RouteOutcome::Ignored;
        }
        self.state.set(RouterState::Navigating);

        let mut path = normalize_path(&self.history.current_path());
        if !self.is_registered(&path) {
            log::warn!("router: no route for {}", path);
            if path == ROOT_PATH || !self.is_registered(ROOT_PATH) {
                return self.not_found(path);
            }
            self.history.replace(ROOT_PATH);
            path = ROOT_PATH.to_string();
        }

        let from = self.current_path();
        self.destroy_current();
        self.bus.emit("route:before-change", json!({"from": from, "to": path}));

        let Some(mut page) = self.build(&path) else {
            return self.not_found(path);
        };
        let view = match page.init().and_then(|_| page.render()) {
            Ok(view) => view,
            Err(error) => return self.fail(path, error),
        };

        *self.current_page.borrow_mut() = Some(page);
        *self.current_path.borrow_mut() = Some(path.clone());
        self.state.set(RouterState::Idle);

        let payload = json!({"from": from, "to": path});
        self.bus.emit("route:after-change", payload.clone());
        self.bus.emit("route:change", payload);
        RouteOutcome::Rendered { path, view }
    }

    fn not_found(&self, path: String) -> RouteOutcome<P::View> {
        self.destroy_current();
        *self.current_path.borrow_mut() = None;
        self.state.set(RouterState::Idle);
        RouteOutcome::NotFound { path }
    }

    fn fail(&self, path: String, error: PageError) -> RouteOutcome<P::View> {
        log::error!("router: {} failed: {}", path, error);
        *self.current_path.borrow_mut() = None;
        self.state.set(RouterState::Error);
        self.bus.emit(
            "route:error",
            json!({"path": path, "error": error.to_string()}),
        );
        RouteOutcome::Failed { path, error }
    }

    /// Pushes `path` and renders it. Refuses unknown paths, the current
    /// path, and calls made while a transition is running.
    pub fn navigate(&self, path: &str) -> Option<RouteOutcome<P::View>> {
        let path = normalize_path(path);
        if !self.is_ready() {
            log::warn!("router: not ready, cannot navigate to {}", path);
            return None;
        }
        if !self.is_registered(&path) {
            log::error!("router: route {} is not registered", path);
            return None;
        }
        if self.current_path().as_deref() == Some(path.as_str()) {
            log::debug!("router: already at {}", path);
            return None;
        }
        self.history.push(&path);
        Some(self.handle_route_change())
    }

    pub fn replace(&self, path: &str) -> Option<RouteOutcome<P::View>> {
        if !self.is_ready() {
            return None;
        }
        self.history.replace(&normalize_path(path));
        Some(self.handle_route_change())
    }

    pub fn back(&self) {
        self.history.back();
    }

    pub fn forward(&self) {
        self.history.forward();
    }

    pub fn start(&self) -> Option<RouteOutcome<P::View>> {
        if self.started.replace(true) {
            return None;
        }
        log::info!("router: started with {} routes", self.routes.borrow().len());
        Some(self.handle_route_change())
    }

    pub fn stop(&self) {
        self.started.set(false);
        self.destroy_current();
        *self.current_path.borrow_mut() = None;
        self.state.set(RouterState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::{Rc, Weak};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct TestHistory {
        entries: RefCell<Vec<String>>,
        ops: RefCell<Vec<String>>,
    }

    impl TestHistory {
        fn at(path: &str) -> Self {
            let history = Self::default();
            history.entries.borrow_mut().push(path.to_string());
            history
        }

        fn ops(&self) -> Vec<String> {
            self.ops.borrow().clone()
        }
    }

    impl HistoryPort for TestHistory {
        fn current_path(&self) -> String {
            self.entries.borrow().last().cloned().unwrap_or_default()
        }

        fn push(&self, path: &str) {
            self.ops.borrow_mut().push(format!("push {}", path));
            self.entries.borrow_mut().push(path.to_string());
        }

        fn replace(&self, path: &str) {
            self.ops.borrow_mut().push(format!("replace {}", path));
            let mut entries = self.entries.borrow_mut();
            entries.pop();
            entries.push(path.to_string());
        }

        fn back(&self) {
            self.ops.borrow_mut().push("back".to_string());
        }

        fn forward(&self) {
            self.ops.borrow_mut().push("forward".to_string());
        }
    }

    type Log = Rc<RefCell<Vec<String>>>;
    type TestRouter = Router<TestPage, TestHistory>;

    struct TestPage {
        name: &'static str,
        log: Log,
        fail_init: bool,
        reenter: Option<Weak<TestRouter>>,
    }

    impl TestPage {
        fn new(name: &'static str, log: &Log) -> Self {
            Self {
                name,
                log: log.clone(),
                fail_init: false,
                reenter: None,
            }
        }
    }

    impl PageComponent for TestPage {
        type View = &'static str;

        fn init(&mut self) -> Result<(), PageError> {
            self.log.borrow_mut().push(format!("init {}", self.name));
            if let Some(router) = self.reenter.as_ref().and_then(Weak::upgrade) {
                let nested = router.handle_route_change();
                self.log.borrow_mut().push(format!("nested {:?}", nested));
            }
            if self.fail_init {
                return Err(PageError::Init("boom".to_string()));
            }
            Ok(())
        }

        fn render(&self) -> Result<&'static str, PageError> {
            self.log.borrow_mut().push(format!("render {}", self.name));
            Ok(self.name)
        }

        fn destroy(&mut self) {
            self.log.borrow_mut().push(format!("destroy {}", self.name));
        }
    }

    fn router_at(path: &str, log: &Log, with_root: bool) -> Rc<TestRouter> {
        let router = Rc::new(Router::new(TestHistory::at(path), EventBus::new()));
        if with_root {
            let l = log.clone();
            router.register("/", move || TestPage::new("home", &l));
        }
        let l = log.clone();
        router.register("/ai", move || TestPage::new("ai", &l));
        router
    }

    fn record(bus: &EventBus, events: &[&'static str]) -> Arc<Mutex<Vec<String>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        for &event in events {
            let sink = seen.clone();
            bus.on(event, move |payload| {
                sink.lock().unwrap().push(format!("{} {}", event, payload["to"]));
                Ok(())
            });
        }
        seen
    }

    #[test]
    fn test_start_renders_current_path() {
        let log = Log::default();
        let router = router_at("/ai", &log, true);
        let outcome = router.start().unwrap();
        assert_eq!(
            outcome,
            RouteOutcome::Rendered {
                path: "/ai".to_string(),
                view: "ai"
            }
        );
        assert_eq!(router.current_path().as_deref(), Some("/ai"));
        assert!(router.is_ready());
        assert!(router.start().is_none());
    }

    #[test]
    fn test_navigate_destroys_previous_page_and_emits() {
        let log = Log::default();
        let router = router_at("/", &log, true);
        let seen = record(&router.bus, &["route:before-change", "route:after-change", "route:change"]);
        router.start();
        seen.lock().unwrap().clear();

        let outcome = router.navigate("/ai").unwrap();
        assert!(matches!(outcome, RouteOutcome::Rendered { view: "ai", .. }));
        assert_eq!(
            *log.borrow(),
            vec!["init home", "render home", "destroy home", "init ai", "render ai"]
        );
        assert_eq!(router.history().ops(), vec!["push /ai"]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                "route:before-change \"/ai\"",
                "route:after-change \"/ai\"",
                "route:change \"/ai\""
            ]
        );
    }

    #[test]
    fn test_navigate_refuses_unknown_and_current() {
        let log = Log::default();
        let router = router_at("/", &log, true);
        assert!(router.navigate("/ai").is_none(), "not started");
        router.start();
        assert!(router.navigate("/nope").is_none());
        assert!(router.navigate("/").is_none());
        assert!(router.history().ops().is_empty());
    }

    #[test]
    fn test_unknown_path_redirects_to_root_once() {
        let log = Log::default();
        let router = router_at("/xyz", &log, true);
        let outcome = router.start().unwrap();
        assert!(matches!(outcome, RouteOutcome::Rendered { ref path, view: "home" } if path == "/"));
        assert_eq!(router.history().ops(), vec!["replace /"]);
        assert_eq!(*log.borrow(), vec!["init home", "render home"]);
    }

    #[test]
    fn test_unknown_path_without_root_is_not_found_once() {
        let log = Log::default();
        let router = router_at("/xyz", &log, false);
        let outcome = router.start().unwrap();
        assert_eq!(
            outcome,
            RouteOutcome::NotFound {
                path: "/xyz".to_string()
            }
        );
        assert!(router.history().ops().is_empty());
        assert!(log.borrow().is_empty());
        assert_eq!(router.state(), RouterState::Idle);
    }

    #[test]
    fn test_init_failure_enters_error_state_and_recovers() {
        let log = Log::default();
        let router = router_at("/", &log, true);
        let l = log.clone();
        router.register("/broken", move || TestPage {
            fail_init: true,
            ..TestPage::new("broken", &l)
        });
        let errors = record(&router.bus, &["route:error"]);
        router.start();

        let outcome = router.navigate("/broken").unwrap();
        assert_eq!(
            outcome,
            RouteOutcome::Failed {
                path: "/broken".to_string(),
                error: PageError::Init("boom".to_string())
            }
        );
        assert_eq!(router.state(), RouterState::Error);
        assert_eq!(errors.lock().unwrap().len(), 1);

        assert!(matches!(router.navigate("/ai"), Some(RouteOutcome::Rendered { .. })));
        assert_eq!(router.state(), RouterState::Idle);
    }

    #[test]
    fn test_reentrant_change_is_ignored() {
        let log = Log::default();
        let router = router_at("/loop", &log, true);
        let weak = Rc::downgrade(&router);
        let l = log.clone();
        router.register("/loop", move || TestPage {
            reenter: Some(weak.clone()),
            ..TestPage::new("loop", &l)
        });

        let outcome = router.start().unwrap();
        assert!(matches!(outcome, RouteOutcome::Rendered { view: "loop", .. }));
        assert_eq!(
            *log.borrow(),
            vec!["init loop", "nested Ignored", "render loop"]
        );
    }

    #[test]
    fn test_stop_destroys_page() {
        let log = Log::default();
        let router = router_at("/", &log, true);
        router.start();
        router.stop();
        assert!(!router.is_ready());
        assert_eq!(router.current_path(), None);
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy home"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("#"), "/");
        assert_eq!(normalize_path("#/ai?x=1"), "/ai");
        assert_eq!(normalize_path("mind"), "/mind");
    }
}
