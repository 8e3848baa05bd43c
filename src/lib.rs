pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod host;
pub mod services;
pub mod types;

#[cfg(test)]
pub mod testing;
