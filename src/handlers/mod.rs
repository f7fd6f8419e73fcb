// Request handlers: thin per-endpoint glue over the store, aggregator,
// resolver, and Sui collaborators.

pub mod analytics;
pub mod auth;
pub mod health;
pub mod links;
pub mod payments;
pub mod profile;
pub mod public;
pub mod suins;
