//! Chat panel - Model (transport calls and message formatting)

use crate::domain::a002_ai_chat::transport::{ChatError, EndpointCheck, SendOptions};
use crate::layout::global_context::AppServices;
use contracts::domain::a002_ai_chat::aggregate::ChatMessage;
use once_cell::sync::Lazy;
use regex::Regex;

/// Streams a reply to `message`; `on_progress` receives the accumulated text.
pub async fn stream_reply(
    services: AppServices,
    message: String,
    context: Vec<ChatMessage>,
    mut on_progress: impl FnMut(&str) + 'static,
) -> Result<String, ChatError> {
    let transport = services.chat_transport();
    let options = SendOptions::streaming(context, move |_, accumulated| on_progress(accumulated));
    transport.send_message(&message, options).await
}

/// Probes a candidate endpoint for its model list.
pub async fn verify_endpoint(services: AppServices, base_url: String, api_key: String) -> EndpointCheck {
    services
        .chat_transport()
        .validate_and_get_models(&base_url, &api_key)
        .await
}

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*\n]+?)\*").expect("valid regex"));
static INLINE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`\n]+?)`").expect("valid regex"));

const INLINE_CODE_STYLE: &str = "background: rgba(0,0,0,0.1); padding: 2px 4px; border-radius: 3px;";
const CODE_BLOCK_STYLE: &str =
    "background: rgba(0,0,0,0.05); padding: 8px; border-radius: 6px; margin: 8px 0; overflow-x: auto;";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn emphasis(escaped: &str) -> String {
    let bold = BOLD.replace_all(escaped, "<strong>$1</strong>");
    let italic = ITALIC.replace_all(&bold, "<em>$1</em>");
    italic.replace('\n', "<br>")
}

fn format_prose(text: &str) -> String {
    let escaped = escape_html(text);
    let mut out = String::new();
    let mut last = 0;
    for caps in INLINE_CODE.captures_iter(&escaped) {
        let (Some(whole), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&emphasis(&escaped[last..whole.start()]));
        out.push_str(&format!(r#"<code style="{}">{}</code>"#, INLINE_CODE_STYLE, code.as_str()));
        last = whole.end();
    }
    out.push_str(&emphasis(&escaped[last..]));
    out
}

/// Renders assistant text as HTML: fenced code blocks, inline code, bold,
/// italic and line breaks. All input is escaped first.
pub fn format_message(text: &str) -> String {
    let mut out = String::new();
    for (index, segment) in text.split("```").enumerate() {
        if index % 2 == 1 {
            let code = segment.strip_prefix('\n').unwrap_or(segment);
            out.push_str(&format!(
                r#"<pre style="{}"><code>{}</code></pre>"#,
                CODE_BLOCK_STYLE,
                escape_html(code)
            ));
        } else {
            out.push_str(&format_prose(segment));
        }
    }
    out
}
