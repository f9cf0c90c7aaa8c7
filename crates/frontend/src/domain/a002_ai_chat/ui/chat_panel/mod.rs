//! AI chat panel (MVVM)
//!
//! - model.rs: transport calls and message formatting
//! - view_model.rs: ChatPanelVm with RwSignals
//! - view.rs: ChatPanel component (full page or compact floating panel)
//! - settings.rs: API settings form

mod model;
mod settings;
mod view;
mod view_model;

pub use model::format_message;
pub use view::ChatPanel;
pub use view_model::ChatPanelVm;
