//! Pure ledger domain: the aggregate, its audit records and load-time seeds.

pub mod audit;
pub mod errors;
pub mod ledger;
pub mod patch;
pub mod seed;
