//! WebSocket transport for live connections.

pub mod handler;

pub use handler::LiveConnection;
