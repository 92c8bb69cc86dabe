pub mod app;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod inventory;
pub mod middleware;
pub mod services;
pub mod state;
pub mod types;

pub use app::app;
pub use config::AppConfig;
pub use state::AppState;
