//! API settings form of the chat panel.
//!
//! The endpoint triple (base URL, key, model) is only written after the
//! endpoint answered a model listing; sampling fields are saved directly.

use super::model::verify_endpoint;
use super::view_model::{ChatPanelVm, SettingsError};
use crate::layout::global_context::use_services;
use crate::shared::icons::icon;
use leptos::prelude::*;
use thaw::*;

#[component]
#[allow(non_snake_case)]
pub fn ChatSettings(vm: ChatPanelVm) -> impl IntoView {
    let services = StoredValue::new(use_services());

    Effect::new(move |_| vm.drop_stale_verification());

    let verify = move |_| {
        if vm.verifying.get_untracked() {
            return;
        }
        let base_url = vm.base_url.get_untracked();
        let api_key = vm.api_key.get_untracked();
        vm.verifying.set(true);
        let services = services.get_value();
        wasm_bindgen_futures::spawn_local(async move {
            let check = verify_endpoint(services.clone(), base_url, api_key).await;
            vm.verifying.set(false);
            if check.result.success {
                let models = check.result.models;
                let current = vm.model.get_untracked();
                if !models.iter().any(|m| m.id == current) {
                    if let Some(first) = models.first() {
                        vm.model.set(first.id.clone());
                    }
                }
                services
                    .notifications
                    .success(format!("连接成功，发现 {} 个可用模型", models.len()));
                vm.models.set(models);
                // the form may have changed while the check was running
                let verified = check.verified.filter(|v| {
                    v.matches(&vm.base_url.get_untracked(), &vm.api_key.get_untracked())
                });
                vm.verified.set(verified);
            } else {
                vm.verified.set(None);
                services.notifications.error(
                    check
                        .result
                        .error
                        .unwrap_or_else(|| "API验证失败".to_string()),
                );
            }
        });
    };

    let save = move |_| {
        services.with_value(|services| match vm.save_settings(&services.config) {
            Ok(()) => {
                vm.settings_open.set(false);
                services.notifications.success("API设置已保存！");
            }
            Err(SettingsError::Unverified) => {
                services.notifications.warning(SettingsError::Unverified.to_string());
            }
            Err(e) => {
                log::warn!("chat settings: save failed: {}", e);
                services.notifications.error(e.to_string());
            }
        });
    };

    view! {
        <div class="api-settings show">
            <h4>"API 配置"</h4>

            <label>"API地址"</label>
            <Input value=vm.base_url placeholder="http://localhost:3000/api" />

            <label>"API密钥"</label>
            <Input value=vm.api_key input_type=InputType::Password placeholder="可选" />

            <Button
                appearance=ButtonAppearance::Secondary
                disabled=vm.verifying
                on_click=verify
            >
                {icon("refresh")}
                {move || if vm.verifying.get() { " 验证中..." } else { " 验证并获取模型" }}
            </Button>

            <label>"模型选择"</label>
            <Select value=vm.model>
                <For
                    each=move || vm.models.get()
                    key=|m| m.id.clone()
                    children=move |m| {
                        view! { <option value=m.id.clone()>{m.name.clone()}</option> }
                    }
                />
            </Select>
            {move || {
                vm.verified
                    .get()
                    .is_none()
                    .then(|| view! { <div class="api-settings-hint">"修改地址、密钥或模型前需先验证"</div> })
            }}

            <label>"最大令牌数"</label>
            <Input value=vm.max_tokens input_type=InputType::Number />

            <label>"创造性 (0-2)"</label>
            <Input value=vm.temperature input_type=InputType::Number />

            <Flex justify=FlexJustify::End style="gap: 8px; margin-top: 12px;">
                <Button
                    appearance=ButtonAppearance::Secondary
                    on_click=move |_| vm.settings_open.set(false)
                >
                    "取消"
                </Button>
                <Button appearance=ButtonAppearance::Primary on_click=save>
                    "保存设置"
                </Button>
            </Flex>
        </div>
    }
}
