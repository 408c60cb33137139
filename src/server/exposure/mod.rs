//! API exposure
//!
//! Each exposure consumes the shared [`AppState`](super::AppState) and
//! produces a router for its protocol.

pub mod rest;

pub use rest::RestExposure;
