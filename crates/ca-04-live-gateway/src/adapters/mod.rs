//! Adapters for the gateway's outbound ports.

pub mod static_credentials;

pub use static_credentials::{constant_time_compare, StaticCredentials};
