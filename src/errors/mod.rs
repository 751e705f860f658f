//! Error types for each layer of the service.
//!
//! - **StoreError**: persistence failures in either storage backend
//! - **ApiError**: what a route handler returns; maps onto an HTTP status and a
//!   `{"error": message}` body
//! - **ClientError**: failures seen by the API client (timeouts, network, non-2xx)
//! - **BuilderError**: invalid edits on an in-memory proposal draft
//!
//! ```rust
//! use proposal_manager::errors::ApiError;
//!
//! let err = ApiError::validation("company required");
//! assert_eq!(err.to_string(), "company required");
//! assert_eq!(err.error_code(), "VALIDATION_FAILED");
//! ```

pub mod api;
pub mod builder;
pub mod client;
pub mod store;

pub use api::ApiError;
pub use builder::BuilderError;
pub use client::ClientError;
pub use store::StoreError;

/// Result type alias for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for route handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for API client calls
pub type ClientResult<T> = Result<T, ClientError>;

/// Result type alias for proposal draft edits
pub type BuilderResult<T> = Result<T, BuilderError>;
