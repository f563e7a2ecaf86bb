pub mod auth;
pub mod error;
pub mod matches;
pub mod messages;
pub mod middleware;
pub mod profile;
pub mod routes;
pub mod state;
pub mod swipes;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};

#[cfg(test)]
mod tests;
