pub mod auth;
pub mod cli;
pub mod error;
pub mod model;
pub mod routes;
pub mod schemas;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod validate;

pub use startup::AppState;
