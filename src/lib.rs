//! riftstats: League of Legends ladder crawler, match store and stats API.

pub mod api;
pub mod cache;
pub mod database_ops;
pub mod ingest;
pub mod live;
pub mod normalization;
pub mod riot;
pub mod scheduler;
pub mod tracing;

pub mod util {
    pub mod db;
    pub mod env;
}

#[cfg(test)]
mod testing;
