pub mod history;
pub mod transport;
pub mod ui;
