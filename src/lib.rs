pub mod builder;
pub mod catalog;
pub mod client;
pub mod commands;
pub mod common;
pub mod config;
pub mod errors;
pub mod models;
pub mod store;

#[cfg(feature = "server")]
pub mod database;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod services;
