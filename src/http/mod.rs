//! HTTP surface: health check and the game socket

pub mod routes;

pub use routes::build_router;
