use super::apply_theme;
use crate::layout::global_context::{use_services, AppGlobalContext};
use contracts::shared::app_config::Theme;
use leptos::prelude::*;
use serde_json::json;

/// Theme dropdown in the header.
#[component]
pub fn ThemeSelector() -> impl IntoView {
    let ctx = use_context::<AppGlobalContext>().expect("AppGlobalContext not found");
    let services = StoredValue::new(use_services());
    let is_open = RwSignal::new(false);

    Effect::new(move |_| apply_theme(ctx.theme.get()));

    let select_theme = move |theme: Theme| {
        is_open.set(false);
        if ctx.theme.get_untracked() == theme {
            return;
        }
        services.with_value(|s| {
            if let Err(e) = s.config.set("ui.theme", json!(theme.as_str())) {
                log::error!("theme: failed to persist {}: {}", theme.as_str(), e);
                s.notifications.error(e.to_string());
            }
        });
    };

    view! {
        <div class="theme-select-wrapper">
            <button
                class="header__icon-btn"
                title="切换主题"
                on:click=move |_| is_open.update(|v| *v = !*v)
            >
                <svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2">
                    <path d="M12 3a6 6 0 0 0 9 9 9 9 0 1 1-9-9Z"></path>
                </svg>
                {move || format!(" {}", ctx.theme.get().display_name())}
            </button>

            <Show when=move || is_open.get()>
                <div class="theme-dropdown">
                    {Theme::all()
                        .into_iter()
                        .map(|theme| {
                            view! {
                                <button
                                    class=move || {
                                        if ctx.theme.get() == theme {
                                            "theme-dropdown__item theme-dropdown__item--active"
                                        } else {
                                            "theme-dropdown__item"
                                        }
                                    }
                                    on:click=move |_| select_theme(theme)
                                >
                                    {theme.display_name()}
                                </button>
                            }
                        })
                        .collect_view()}
                </div>
            </Show>
        </div>
    }
}
