pub mod pages;
pub mod router;
pub mod routes;
