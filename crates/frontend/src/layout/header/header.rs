use crate::layout::global_context::AppGlobalContext;
use crate::routes::pages::Page;
use crate::shared::theme::ThemeSelector;
use leptos::prelude::*;

/// Top bar: brand, page links and theme switch.
#[component]
pub fn Header() -> impl IntoView {
    let ctx = use_context::<AppGlobalContext>().expect("AppGlobalContext not found");

    view! {
        <header data-zone="header" class="header">
            <div class="header__content">
                <a class="header__title" href="#/">"🌾 神农集团"</a>
                <nav class="header__nav">
                    {Page::nav_items()
                        .into_iter()
                        .map(|page| {
                            view! {
                                <a class="header__nav-link" href=format!("#{}", page.path())>
                                    {page.title()}
                                </a>
                            }
                        })
                        .collect_view()}
                </nav>
            </div>
            <div class="header__actions">
                <span
                    class=move || if ctx.online.get() { "net-status online" } else { "net-status offline" }
                    title=move || if ctx.online.get() { "网络已连接" } else { "网络已断开" }
                ></span>
                <ThemeSelector />
            </div>
        </header>
    }
}
