//! Chat panel - View Component

use super::model::{format_message, stream_reply};
use super::settings::ChatSettings;
use super::view_model::ChatPanelVm;
use crate::domain::a002_ai_chat::history::{ChatEntry, QUICK_REPLIES, WELCOME_MESSAGE};
use crate::layout::global_context::{use_services, AppServices};
use crate::shared::date_utils::local_clock;
use crate::shared::icons::icon;
use chrono::Utc;
use contracts::domain::a002_ai_chat::aggregate::ChatRole;
use futures::future::{abortable, Aborted};
use leptos::prelude::*;
use serde_json::json;
use thaw::*;
use uuid::Uuid;

/// Starts one exchange for the trailing user entry of the history.
fn start_exchange(vm: ChatPanelVm, services: AppServices, content: String) {
    let context = vm.history.with_untracked(|h| h.context_for_api());
    vm.error.set(None);
    vm.is_sending.set(true);
    vm.streaming.set(Some(String::new()));

    let (task, handle) = abortable(stream_reply(services, content, context, move |accumulated| {
        vm.streaming.set(Some(accumulated.to_string()))
    }));
    vm.abort.set_value(Some(handle));

    wasm_bindgen_futures::spawn_local(async move {
        let outcome = task.await;
        vm.abort.set_value(None);
        vm.streaming.set(None);
        vm.is_sending.set(false);
        match outcome {
            Ok(Ok(reply)) => vm.history.update(|h| {
                h.push(ChatRole::Assistant, reply);
            }),
            Ok(Err(err)) => vm.error.set(Some(err.message)),
            Err(Aborted) => {
                log::info!("chat: reply cancelled");
                vm.abandon_exchange();
            }
        }
    });
}

#[component]
fn MessageBubble(entry: ChatEntry) -> impl IntoView {
    let time = local_clock(entry.timestamp);
    if entry.is_user() {
        view! {
            <div class="chat-message user">
                <div class="message-avatar user">"👤"</div>
                <div>
                    <div class="message-content user">{entry.content}</div>
                    <div class="message-time">{time}</div>
                </div>
            </div>
        }
        .into_any()
    } else {
        view! {
            <div class="chat-message">
                <div class="message-avatar ai">"🐷"</div>
                <div>
                    <div class="message-content ai" inner_html=format_message(&entry.content)></div>
                    <div class="message-time">{time}</div>
                </div>
            </div>
        }
        .into_any()
    }
}

/// AI chat. `compact` is the floating variant on the portal page: no
/// settings panel, with a link to the full assistant page instead.
#[component]
#[allow(non_snake_case)]
pub fn ChatPanel(#[prop(optional)] compact: bool) -> impl IntoView {
    let services = use_services();
    let vm = ChatPanelVm::new(&services.ai_config());
    let services = StoredValue::new(services);
    let chat_area_ref = NodeRef::<leptos::html::Div>::new();
    let welcome = ChatEntry {
        id: Uuid::nil(),
        role: ChatRole::Assistant,
        content: WELCOME_MESSAGE.to_string(),
        timestamp: Utc::now(),
    };

    let scroll_to_bottom = move || {
        if let Some(area) = chat_area_ref.get_untracked() {
            request_animation_frame(move || area.set_scroll_top(area.scroll_height()));
        }
    };

    Effect::new(move |_| {
        vm.history.track();
        vm.streaming.track();
        vm.error.track();
        scroll_to_bottom();
    });

    on_cleanup(move || {
        if let Some(Some(handle)) = vm.abort.try_get_value() {
            handle.abort();
        }
    });

    let send = Callback::new(move |text: Option<String>| {
        let content = text.unwrap_or_else(|| vm.input.get_untracked());
        let content = content.trim().to_string();
        if content.is_empty() || vm.is_sending.get_untracked() {
            return;
        }
        vm.input.set(String::new());
        vm.history.update(|h| {
            h.push(ChatRole::User, content.clone());
        });
        start_exchange(vm, services.get_value(), content);
    });

    let retry = move |_| {
        let last = vm
            .history
            .with_untracked(|h| h.entries().last().filter(|e| e.is_user()).map(|e| e.content.clone()));
        if let Some(content) = last {
            start_exchange(vm, services.get_value(), content);
        }
    };

    let cancel = move || {
        let Some(handle) = vm.abort.get_value() else {
            return false;
        };
        handle.abort();
        services.with_value(|s| {
            s.bus.emit("ai:cancel", json!({}));
            s.notifications.info("对话已取消");
        });
        true
    };

    let clear = move |_| {
        cancel();
        vm.error.set(None);
        vm.history.update(|h| h.clear());
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        if ev.key() == "Escape" && !cancel() {
            vm.settings_open.set(false);
        }
    };

    view! {
        <div class=if compact { "ai-chat-module compact" } else { "ai-chat-module" } on:keydown=on_keydown>
            <Flex justify=FlexJustify::SpaceBetween align=FlexAlign::Center class="ai-chat-toolbar">
                <span class="ai-chat-title">"神农晓问"</span>
                <Flex style="gap: 4px;">
                    {compact
                        .then(|| {
                            view! {
                                <Button
                                    appearance=ButtonAppearance::Subtle
                                    attr:title="打开完整助手"
                                    on_click=move |_| {
                                        services.with_value(|s| {
                                            s.bus.emit("app:navigate", json!({"path": "/ai-assistant"}));
                                        });
                                    }
                                >
                                    {icon("expand")}
                                </Button>
                            }
                        })}
                    <Button appearance=ButtonAppearance::Subtle attr:title="清空对话" on_click=clear>
                        {icon("trash")}
                    </Button>
                    {(!compact)
                        .then(|| {
                            view! {
                                <Button
                                    appearance=ButtonAppearance::Subtle
                                    attr:title="API设置"
                                    on_click=move |_| {
                                        if !vm.settings_open.get_untracked() {
                                            vm.load_settings(&services.with_value(|s| s.ai_config()));
                                        }
                                        vm.settings_open.update(|open| *open = !*open);
                                    }
                                >
                                    {icon("settings")}
                                </Button>
                            }
                        })}
                </Flex>
            </Flex>

            {move || vm.settings_open.get().then(|| view! { <ChatSettings vm=vm /> })}

            <div class="ai-chat-area" node_ref=chat_area_ref>
                <MessageBubble entry=welcome />

                <For
                    each=move || vm.history.with(|h| h.entries().to_vec())
                    key=|entry| entry.id
                    let:entry
                >
                    <MessageBubble entry=entry />
                </For>

                {move || match vm.streaming.get() {
                    Some(text) if text.is_empty() => Some(
                        view! {
                            <div class="chat-message typing-message">
                                <div class="message-avatar ai">"🐷"</div>
                                <div class="typing-indicator">
                                    <div class="typing-dots">
                                        <span></span>
                                        <span></span>
                                        <span></span>
                                    </div>
                                    <span class="typing-text">"神农晓问正在思考..."</span>
                                </div>
                            </div>
                        }
                        .into_any(),
                    ),
                    Some(text) => Some(
                        view! {
                            <div class="chat-message">
                                <div class="message-avatar ai">"🐷"</div>
                                <div class="message-content ai streaming" inner_html=format_message(&text)></div>
                            </div>
                        }
                        .into_any(),
                    ),
                    None => None,
                }}

                {move || {
                    vm.error
                        .get()
                        .map(|message| {
                            view! {
                                <div class="chat-message error-message-container">
                                    <div class="message-avatar ai">"🐷"</div>
                                    <div class="message-error">
                                        {icon("alert")}
                                        <span>{message}</span>
                                        <Button size=ButtonSize::Small on_click=retry>
                                            {icon("refresh")}
                                            " 重试"
                                        </Button>
                                    </div>
                                </div>
                            }
                        })
                }}
            </div>

            <div class="ai-input-area">
                <div class="quick-replies">
                    {QUICK_REPLIES
                        .iter()
                        .map(|reply| {
                            let text = reply.to_string();
                            view! {
                                <div
                                    class="quick-reply"
                                    on:click=move |_| send.run(Some(text.clone()))
                                >
                                    {*reply}
                                </div>
                            }
                        })
                        .collect_view()}
                </div>
                <Flex class="input-container" align=FlexAlign::End style="gap: 8px;">
                    <div style="flex: 1;">
                        <Textarea
                            value=vm.input
                            placeholder="输入您的问题..."
                            attr:style="width: 100%; min-height: 40px; max-height: 120px; resize: vertical;"
                            on:keydown=move |ev: web_sys::KeyboardEvent| {
                                if ev.key() == "Enter" && !ev.shift_key() {
                                    ev.prevent_default();
                                    send.run(None);
                                }
                            }
                        />
                    </div>
                    <Button
                        appearance=ButtonAppearance::Primary
                        disabled=vm.is_sending
                        on_click=move |_| send.run(None)
                    >
                        {icon("send")}
                    </Button>
                </Flex>
            </div>
        </div>
    }
}
