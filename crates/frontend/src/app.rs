use crate::layout::global_context::{AppGlobalContext, AppServices};
use crate::layout::Shell;
use crate::routes::routes::AppRoutes;
use crate::shared::notifications::ToastHost;
use crate::shared::theme::apply_language;
use leptos::prelude::*;
use wasm_bindgen::prelude::*;

/// Toasts on connectivity changes and mirrors them into `ctx.online`.
fn watch_connectivity(ctx: AppGlobalContext, services: &AppServices) {
    let Some(window) = web_sys::window() else {
        return;
    };
    for (event, online) in [("online", true), ("offline", false)] {
        let notifications = services.notifications.clone();
        let handler = Closure::wrap(Box::new(move |_: web_sys::Event| {
            ctx.online.set(online);
            if online {
                notifications.success("网络连接已恢复");
            } else {
                notifications.warning("网络连接已断开");
            }
        }) as Box<dyn FnMut(_)>);
        let _ = window.add_event_listener_with_callback(event, handler.as_ref().unchecked_ref());
        handler.forget();
    }
}

fn set_root_class(class: &str, enabled: bool) {
    if let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    {
        let list = root.class_list();
        let _ = if enabled { list.add_1(class) } else { list.remove_1(class) };
    }
}

#[component]
pub fn App() -> impl IntoView {
    let services = AppServices::browser();
    let ctx = AppGlobalContext::new(&services);
    ctx.bind(&services);
    watch_connectivity(ctx, &services);
    log::info!(
        "portal: started (config v{}, endpoint {})",
        services.config.version(),
        services.ai_config().base_url
    );

    let config = StoredValue::new(services.config.clone());
    Effect::new(move |_| {
        ctx.config_rev.track();
        let ui = config.with_value(|c| c.snapshot().ui);
        apply_language(ui.language);
        set_root_class("no-animations", !ui.enable_animations);
    });

    provide_context(services);
    provide_context(ctx);

    view! {
        <Shell>
            <AppRoutes />
        </Shell>
        <ToastHost />
    }
}
