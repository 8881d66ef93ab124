pub mod auth;
pub mod config;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod schemas;
pub mod server;

pub use config::AppConfig;
pub use server::{AccountsServer, AppState, ServerBuilder, build_app, connect_storage};
