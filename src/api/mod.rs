// src/api/mod.rs

pub mod handlers;
pub mod middleware;
pub mod server;
pub mod server_config;
pub mod types;

pub use server::WalletServer;
