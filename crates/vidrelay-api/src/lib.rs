//! vidrelay API Library
//!
//! This crate provides the HTTP handlers, error rendering, and application
//! setup for the transfer service.

// Module declarations
pub mod api_doc;
pub mod constants;
pub mod handlers;
pub mod setup;
pub mod telemetry;

// Public modules
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
