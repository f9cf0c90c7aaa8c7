use crate::domain::a002_ai_chat::transport::{BrowserTransport, FetchBackend};
use crate::shared::config_store::ConfigStore;
use crate::shared::event_bus::EventBus;
use crate::shared::notifications::NotificationManager;
use contracts::shared::app_config::{ChatConfig, Theme, ViewMode};
use leptos::prelude::*;

/// Long-lived services, constructed once in `App` and shared through context.
#[derive(Clone)]
pub struct AppServices {
    pub bus: EventBus,
    pub config: ConfigStore,
    pub notifications: NotificationManager,
}

impl AppServices {
    pub fn browser() -> Self {
        let bus = EventBus::new();
        let config = ConfigStore::browser(bus.clone());
        config.load();
        Self {
            notifications: NotificationManager::browser(),
            config,
            bus,
        }
    }

    /// Transport bound to the current AI settings. Built per request so a
    /// committed endpoint takes effect on the next send.
    pub fn chat_transport(&self) -> BrowserTransport {
        BrowserTransport::new(FetchBackend, self.config.ai_config(), self.bus.clone())
    }

    pub fn ai_config(&self) -> ChatConfig {
        self.config.ai_config()
    }
}

pub fn use_services() -> AppServices {
    use_context::<AppServices>().expect("AppServices not provided")
}

/// Reactive mirror of the persisted settings the layout depends on.
#[derive(Clone, Copy)]
pub struct AppGlobalContext {
    /// Bumped on every config event; views that read the store track it.
    pub config_rev: RwSignal<u64>,
    pub theme: RwSignal<Theme>,
    pub view_mode: RwSignal<ViewMode>,
    pub online: RwSignal<bool>,
    /// Page views opened since the app started.
    pub visits: RwSignal<u32>,
}

impl AppGlobalContext {
    pub fn new(services: &AppServices) -> Self {
        let snapshot = services.config.snapshot();
        let online = web_sys::window()
            .map(|w| w.navigator().on_line())
            .unwrap_or(true);
        Self {
            config_rev: RwSignal::new(0),
            theme: RwSignal::new(snapshot.ui.theme),
            view_mode: RwSignal::new(snapshot.ui.view_mode),
            online: RwSignal::new(online),
            visits: RwSignal::new(0),
        }
    }

    /// Keeps the signals in step with the store.
    pub fn bind(&self, services: &AppServices) {
        let this = *self;
        for event in ["config:change", "config:reset", "config:import", "config:migrate"] {
            let config = services.config.clone();
            services.bus.on(event, move |_| {
                let snapshot = config.snapshot();
                this.theme.set(snapshot.ui.theme);
                this.view_mode.set(snapshot.ui.view_mode);
                this.config_rev.update(|rev| *rev += 1);
                Ok(())
            });
        }
    }
}
