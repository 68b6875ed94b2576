//! vidrelay source library
//!
//! Source content API abstraction and its Google Drive v3 implementation.
//!
//! A source exposes three calls: a single descriptive metadata lookup, opening
//! a media stream, and pulling the next bounded byte range from that stream.
//! Reads are always contiguous; the stream handle tracks the position.

pub mod drive;
pub mod traits;

// Re-export commonly used types
pub use drive::DriveClient;
pub use traits::{ReadOutcome, SourceApi, SourceError, SourceResult, StreamHandle};
