//! HTTP server: configuration, state, extractors, and routing.

pub mod application;
pub mod extract;
pub mod routes;
pub mod settings;
