//! Data models for the application

mod source;
mod transfer;

pub use source::*;
pub use transfer::*;
