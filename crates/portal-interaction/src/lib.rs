//! Transport layer for the Portal client core.

pub mod http_api;

pub use http_api::HttpPortalApi;
