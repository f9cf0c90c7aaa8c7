use leptos::prelude::*;
use thaw::*;

#[component]
pub fn NotFoundView(path: String, #[prop(into)] on_home: Callback<()>) -> impl IntoView {
    view! {
        <div class="route-status not-found">
            <h1>"404"</h1>
            <h2>"页面未找到"</h2>
            <p>"请求的页面 " <code>{path}</code> " 不存在"</p>
            <Button appearance=ButtonAppearance::Primary on_click=move |_| on_home.run(())>
                "返回首页"
            </Button>
        </div>
    }
}

/// Shown when a page failed to initialize or render.
#[component]
pub fn RouteErrorView(path: String, message: String) -> impl IntoView {
    let reload = move |_| {
        if let Some(window) = web_sys::window() {
            let _ = window.location().reload();
        }
    };

    view! {
        <div class="route-status route-error">
            <h2>"页面加载失败"</h2>
            <p class="route-error__path">{path}</p>
            <p class="route-error__message">{message}</p>
            <Button appearance=ButtonAppearance::Primary on_click=reload>
                "重新加载"
            </Button>
        </div>
    }
}
