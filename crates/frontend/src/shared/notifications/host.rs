use super::Toast;
use crate::layout::global_context::use_services;
use crate::shared::icons::icon;
use leptos::prelude::*;

/// Renders the visible toasts in the top-right corner. Click dismisses.
#[component]
pub fn ToastHost() -> impl IntoView {
    let manager = use_services().notifications;
    let toasts = RwSignal::new(Vec::<Toast>::new());

    let subscription = manager.subscribe(move |current| toasts.set(current.to_vec()));
    let manager = StoredValue::new(manager);
    on_cleanup(move || manager.with_value(|m| m.unsubscribe(subscription)));

    view! {
        <div class="toast-container" role="status" aria-live="polite">
            <For
                each=move || toasts.get()
                key=|toast| toast.id
                let:toast
            >
                {{
                    let id = toast.id;
                    view! {
                        <div
                            class=toast.kind.css_class()
                            on:click=move |_| manager.with_value(|m| {
                                m.dismiss(id);
                            })
                        >
                            {icon(toast.kind.icon())}
                            <span>{toast.message.clone()}</span>
                        </div>
                    }
                }}
            </For>
        </div>
    }
}
