pub mod placeholder;
pub mod route_status;
