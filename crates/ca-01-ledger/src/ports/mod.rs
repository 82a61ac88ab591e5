//! Port definitions (hexagonal architecture).

pub mod outbound;
