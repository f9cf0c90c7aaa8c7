use super::pages::{Page, PageView};
use super::router::{HistoryPort, RouteOutcome, Router};
use crate::domain::a001_portal_system::ui::list::PortalPage;
use crate::domain::a002_ai_chat::ui::chat_panel::ChatPanel;
use crate::layout::global_context::{use_services, AppGlobalContext};
use crate::system::pages::placeholder::ComingSoon;
use crate::system::pages::route_status::{NotFoundView, RouteErrorView};
use leptos::prelude::*;
use wasm_bindgen::prelude::*;

const APP_TITLE: &str = "神农集团数字化平台";

/// Hash-based history (`#/path`) on top of `window.history`.
pub struct HashHistory;

impl HashHistory {
    fn url(path: &str) -> String {
        format!("#{}", path)
    }
}

impl HistoryPort for HashHistory {
    fn current_path(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().hash().ok())
            .unwrap_or_default()
    }

    fn push(&self, path: &str) {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            let _ = history.push_state_with_url(&JsValue::NULL, "", Some(&Self::url(path)));
        }
    }

    fn replace(&self, path: &str) {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            let _ = history.replace_state_with_url(&JsValue::NULL, "", Some(&Self::url(path)));
        }
    }

    fn back(&self) {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            let _ = history.back();
        }
    }

    fn forward(&self) {
        if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
            let _ = history.forward();
        }
    }
}

pub type AppRouter = Router<Page, HashHistory>;

/// What the content area currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteView {
    Loading,
    Page(PageView),
    NotFound(String),
    Error { path: String, message: String },
}

fn set_document_title(title: &str) {
    if let Some(document) = web_sys::window().and_then(|w| w.document()) {
        if title == APP_TITLE {
            document.set_title(title);
        } else {
            document.set_title(&format!("{} - {}", title, APP_TITLE));
        }
    }
}

fn apply_outcome(outcome: RouteOutcome<PageView>, view: RwSignal<RouteView>, ctx: AppGlobalContext) {
    match outcome {
        RouteOutcome::Rendered { view: page, .. } => {
            set_document_title(page.title);
            ctx.visits.update(|v| *v += 1);
            view.set(RouteView::Page(page));
        }
        RouteOutcome::NotFound { path } => {
            set_document_title("页面未找到");
            view.set(RouteView::NotFound(path));
        }
        RouteOutcome::Failed { path, error } => view.set(RouteView::Error {
            path,
            message: error.to_string(),
        }),
        RouteOutcome::Ignored => {}
    }
}

fn shortcut_target(ev: &web_sys::KeyboardEvent) -> Option<Page> {
    if !ev.alt_key() {
        return None;
    }
    match ev.key().to_lowercase().as_str() {
        "h" => Some(Page::Portal),
        "a" => Some(Page::Assistant),
        "m" => Some(Page::MindMap),
        _ => None,
    }
}

#[component]
pub fn AppRoutes() -> impl IntoView {
    let services = use_services();
    let ctx = use_context::<AppGlobalContext>().expect("AppGlobalContext not found");
    let view = RwSignal::new(RouteView::Loading);
    let nav_request = RwSignal::new(None::<String>);

    let router = AppRouter::new(HashHistory, services.bus.clone());
    for (path, page) in Page::routes() {
        router.register(path, move || page);
    }
    let router = StoredValue::new_local(router);

    // hashchange covers links, back and forward
    let on_hash_change = Closure::wrap(Box::new(move |_: web_sys::HashChangeEvent| {
        router.with_value(|r| apply_outcome(r.handle_route_change(), view, ctx));
    }) as Box<dyn FnMut(_)>);
    let on_shortcut = Closure::wrap(Box::new(move |ev: web_sys::KeyboardEvent| {
        if let Some(page) = shortcut_target(&ev) {
            ev.prevent_default();
            nav_request.set(Some(page.path().to_string()));
        }
    }) as Box<dyn FnMut(_)>);
    if let Some(window) = web_sys::window() {
        let _ = window
            .add_event_listener_with_callback("hashchange", on_hash_change.as_ref().unchecked_ref());
        let _ = window.add_event_listener_with_callback("keydown", on_shortcut.as_ref().unchecked_ref());
    }
    on_hash_change.forget();
    on_shortcut.forget();

    services.bus.on("app:navigate", move |payload| {
        let path = payload["path"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("app:navigate without path: {}", payload))?;
        nav_request.set(Some(path.to_string()));
        Ok(())
    });

    Effect::new(move |_| {
        if let Some(path) = nav_request.get() {
            router.with_value(|r| {
                if let Some(outcome) = r.navigate(&path) {
                    apply_outcome(outcome, view, ctx);
                }
            });
        }
    });

    router.with_value(|r| {
        if let Some(outcome) = r.start() {
            apply_outcome(outcome, view, ctx);
        }
    });

    let go_home = Callback::new(move |_: ()| nav_request.set(Some("/".to_string())));

    move || match view.get() {
        RouteView::Loading => view! { <div class="route-loading">"加载中..."</div> }.into_any(),
        RouteView::Page(PageView { page, .. }) => match page {
            Page::Portal => view! { <PortalPage /> }.into_any(),
            Page::Assistant => view! {
                <div class="ai-assistant-page">
                    <ChatPanel />
                </div>
            }
            .into_any(),
            Page::MindMap => view! {
                <ComingSoon
                    icon="🧠"
                    title="思维导图工具"
                    subtitle="在线业务规划和流程梳理工具"
                    message="思维导图功能正在开发中，敬请期待..."
                    on_home=go_home
                />
            }
            .into_any(),
            Page::FloorPlan => view! {
                <ComingSoon
                    icon="📊"
                    title="平面图"
                    subtitle="商业地产布局图"
                    message="平面图功能正在开发中，敬请期待..."
                    on_home=go_home
                />
            }
            .into_any(),
        },
        RouteView::NotFound(path) => view! { <NotFoundView path=path on_home=go_home /> }.into_any(),
        RouteView::Error { path, message } => view! { <RouteErrorView path=path message=message /> }.into_any(),
    }
}
