//! Theme and language applied to the document root.
//!
//! The preference lives in the config store under `ui.theme`; `Auto`
//! follows the `prefers-color-scheme` media query.

mod theme_select;

pub use theme_select::ThemeSelector;

use contracts::shared::app_config::{Language, Theme};

const DARK_QUERY: &str = "(prefers-color-scheme: dark)";

/// Name written to `data-theme`.
pub fn resolve(theme: Theme, prefers_dark: bool) -> &'static str {
    match theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
        Theme::Auto if prefers_dark => "dark",
        Theme::Auto => "light",
    }
}

fn prefers_dark() -> bool {
    web_sys::window()
        .and_then(|w| w.match_media(DARK_QUERY).ok().flatten())
        .map(|mq| mq.matches())
        .unwrap_or(false)
}

pub fn apply_theme(theme: Theme) {
    let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    else {
        return;
    };
    let resolved = resolve(theme, prefers_dark());
    let _ = root.set_attribute("data-theme", resolved);
    log::debug!("theme: {} -> {}", theme.as_str(), resolved);
}

pub fn apply_language(language: Language) {
    if let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    {
        let _ = root.set_attribute("lang", language.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_follows_system_preference() {
        assert_eq!(resolve(Theme::Auto, true), "dark");
        assert_eq!(resolve(Theme::Auto, false), "light");
        assert_eq!(resolve(Theme::Light, true), "light");
        assert_eq!(resolve(Theme::Dark, false), "dark");
    }
}
