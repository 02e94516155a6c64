pub mod aggregate;
pub mod matches;
pub mod query;
pub mod tracked;
