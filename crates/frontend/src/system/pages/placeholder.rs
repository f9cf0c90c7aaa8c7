use leptos::prelude::*;
use thaw::*;

/// Page reserved for a tool that is not available yet.
#[component]
pub fn ComingSoon(
    icon: &'static str,
    title: &'static str,
    subtitle: &'static str,
    message: &'static str,
    #[prop(into)] on_home: Callback<()>,
) -> impl IntoView {
    view! {
        <div class="coming-soon">
            <div class="coming-soon__header">
                <h1>{icon} " " {title}</h1>
                <p>{subtitle}</p>
            </div>
            <div class="coming-soon__body">
                <div class="coming-soon__icon">{icon}</div>
                <h2>"功能开发中"</h2>
                <p>{message}</p>
                <Button appearance=ButtonAppearance::Primary on_click=move |_| on_home.run(())>
                    "返回首页"
                </Button>
            </div>
        </div>
    }
}
