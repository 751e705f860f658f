pub mod auth_service;
pub mod seed_service;

pub use auth_service::*;
pub use seed_service::*;
