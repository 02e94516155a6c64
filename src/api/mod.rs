// HTTP API: champion stats, builds, summoner lookups, live games and admin
// controls for seeding, tracking and aggregation.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::ApiServer;
pub use state::AppState;

#[cfg(test)]
mod tests;
