//! Portal system list (MVVM)
//!
//! - view_model.rs: PortalListVm with catalog and filter signals
//! - view.rs: PortalPage component

mod view;
mod view_model;

pub use view::PortalPage;
pub use view_model::PortalListVm;
