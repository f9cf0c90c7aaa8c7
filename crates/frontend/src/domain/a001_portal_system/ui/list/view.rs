//! Portal system list - View Component

use super::view_model::PortalListVm;
use crate::domain::a002_ai_chat::ui::chat_panel::ChatPanel;
use crate::layout::global_context::{use_services, AppGlobalContext};
use crate::shared::date_utils::{format_datetime, local_offset_minutes};
use crate::shared::icons::icon;
use contracts::domain::a001_portal_system::aggregate::{PortalSystem, SystemCategory, SystemStatus};
use contracts::shared::app_config::ViewMode;
use leptos::prelude::*;
use serde_json::json;
use thaw::*;

fn status_class(status: SystemStatus) -> &'static str {
    match status {
        SystemStatus::Running => "system-status running",
        SystemStatus::Maintenance => "system-status maintenance",
        SystemStatus::Offline => "system-status offline",
    }
}

#[component]
#[allow(non_snake_case)]
fn SystemCard(system: PortalSystem, vm: PortalListVm) -> impl IntoView {
    let services = StoredValue::new(use_services());
    let id = system.id;
    let favorited = system.favorited;
    let open_target = (system.name.clone(), system.url.clone());

    let toggle = move |ev: web_sys::MouseEvent| {
        ev.stop_propagation();
        services.with_value(|s| {
            if let Err(e) = vm.toggle_saved(id, &s.config) {
                log::error!("portal: failed to persist favorites: {}", e);
                s.notifications.error(e.to_string());
            }
        });
    };

    let open = move |_| {
        let (name, url) = &open_target;
        match url {
            Some(url) => {
                log::info!("portal: opening {} ({})", name, url);
                if let Some(window) = web_sys::window() {
                    let _ = window.open_with_url_and_target(url, "_blank");
                }
            }
            None => {
                services.with_value(|s| {
                    s.notifications.info(format!("即将打开 {}", name));
                });
            }
        }
    };

    view! {
        <div class="system-card" on:click=open>
            <div class="system-card__header">
                <div class="system-icon" style=format!("background: {};", system.category.color())>
                    {icon(&system.icon)}
                </div>
                <button
                    class=if favorited { "favorite-btn active" } else { "favorite-btn" }
                    title=if favorited { "取消收藏" } else { "收藏" }
                    on:click=toggle
                >
                    {icon(if favorited { "star-filled" } else { "star" })}
                </button>
            </div>
            <div class="system-card__body">
                <h3 class="system-name">{system.name.clone()}</h3>
                <p class="system-description">{system.description.clone()}</p>
            </div>
            <div class="system-card__footer">
                <span class="system-category">{system.category.display_name()}</span>
                <span class=status_class(system.status)>{system.status.display_name()}</span>
            </div>
        </div>
    }
}

#[component]
#[allow(non_snake_case)]
pub fn PortalPage() -> impl IntoView {
    let services = use_services();
    let ctx = use_context::<AppGlobalContext>().expect("AppGlobalContext not found");
    let snapshot = services.config.snapshot();
    let vm = PortalListVm::new(&snapshot.portal.favorites);
    let services = StoredValue::new(services);

    let show_stats = Memo::new(move |_| {
        ctx.config_rev.track();
        services.with_value(|s| s.config.snapshot().ui.show_stats)
    });

    let set_view_mode = move |mode: ViewMode| {
        if ctx.view_mode.get_untracked() == mode {
            return;
        }
        services.with_value(|s| {
            if let Err(e) = s.config.set("ui.viewMode", json!(mode.as_str())) {
                s.notifications.error(e.to_string());
            }
        });
    };

    view! {
        <div class="portal-page">
            <header class="portal-hero">
                <h1>"神农集团数字化平台"</h1>
                <p class="subtitle">"现代农牧业 · 智慧管理 · 数字未来"</p>
                <Show when=move || show_stats.get()>
                    <div class="stats-bar">
                        <div class="stat-item">
                            "系统总数: "
                            <span>{move || vm.systems.with(|s| s.len())}</span>
                        </div>
                        <div class="stat-item">
                            "我的收藏: "
                            <span>{move || vm.favorite_count()}</span>
                        </div>
                        <div class="stat-item">
                            "本次访问: "
                            <span>{move || ctx.visits.get()}</span>
                        </div>
                        <div class="stat-item">
                            "最后更新: "
                            <span>
                                {move || format_datetime(vm.last_update.get(), local_offset_minutes())}
                            </span>
                        </div>
                    </div>
                </Show>
            </header>

            <div class="control-panel">
                <div class="search-box">
                    {icon("search")}
                    <Input value=vm.query placeholder="搜索系统、功能..." />
                </div>
                <div class="view-controls">
                    <Button
                        appearance=Signal::derive(move || {
                            if vm.favorites_only.get() {
                                ButtonAppearance::Primary
                            } else {
                                ButtonAppearance::Secondary
                            }
                        })
                        on_click=move |_| vm.favorites_only.update(|f| *f = !*f)
                    >
                        {icon("star")}
                        " 我的收藏"
                    </Button>
                    <Button
                        appearance=Signal::derive(move || {
                            if ctx.view_mode.get() == ViewMode::Grid {
                                ButtonAppearance::Primary
                            } else {
                                ButtonAppearance::Secondary
                            }
                        })
                        on_click=move |_| set_view_mode(ViewMode::Grid)
                    >
                        {icon("grid")}
                        " 网格"
                    </Button>
                    <Button
                        appearance=Signal::derive(move || {
                            if ctx.view_mode.get() == ViewMode::List {
                                ButtonAppearance::Primary
                            } else {
                                ButtonAppearance::Secondary
                            }
                        })
                        on_click=move |_| set_view_mode(ViewMode::List)
                    >
                        {icon("list")}
                        " 列表"
                    </Button>
                </div>
            </div>

            <div class="category-chips">
                <button
                    class=move || if vm.category.get().is_none() { "chip active" } else { "chip" }
                    on:click=move |_| vm.category.set(None)
                >
                    "全部"
                </button>
                {SystemCategory::all()
                    .into_iter()
                    .map(|category| {
                        view! {
                            <button
                                class=move || {
                                    if vm.category.get() == Some(category) { "chip active" } else { "chip" }
                                }
                                on:click=move |_| vm.category.set(Some(category))
                            >
                                {category.display_name()}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>

            <div class=move || {
                if ctx.view_mode.get() == ViewMode::List {
                    "systems-container list-view"
                } else {
                    "systems-container"
                }
            }>
                <Show
                    when=move || !vm.visible().is_empty()
                    fallback=|| {
                        view! {
                            <div class="no-results">
                                <h3>"未找到相关系统"</h3>
                                <p>"请尝试其他关键词"</p>
                            </div>
                        }
                    }
                >
                    <div class="systems-grid">
                        <For
                            each=move || vm.visible()
                            key=|system| (system.id, system.favorited)
                            let:system
                        >
                            <SystemCard system=system vm=vm />
                        </For>
                    </div>
                </Show>
            </div>

            <div class="ai-assistant">
                <button class="ai-button" on:click=move |_| vm.chat_open.update(|open| *open = !*open)>
                    <div class="pig-emoji">"🐷"</div>
                    <div class="ai-bubble">"我是神农晓问 🐷"</div>
                </button>
            </div>
            <Show when=move || vm.chat_open.get()>
                <div class="ai-sidebar">
                    <ChatPanel compact=true />
                </div>
            </Show>
        </div>
    }
}
