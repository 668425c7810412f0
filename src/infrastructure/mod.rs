//! Infrastructure layer - cache tiers, coalescing, services and clients

pub mod cache;
pub mod client;
pub mod coalesce;
pub mod logging;
pub mod observability;
pub mod services;
