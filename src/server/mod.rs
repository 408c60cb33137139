//! HTTP server: shared state, REST routes and the serving loop

pub mod builder;
pub mod exposure;
pub mod host;

pub use builder::ServerBuilder;
pub use exposure::RestExposure;
pub use host::{AppState, CatalogResource};
