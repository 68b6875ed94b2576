//! vidrelay transfer library
//!
//! The streaming core: a `SourceReader` pulling bounded chunks from a
//! `SourceApi`, a `SinkWriter` committing them to a resumable `Storage`
//! session, and the `TransferPipeline` state machine sequencing the two with
//! exactly one chunk in flight.

pub mod error;
pub mod pipeline;
pub mod reader;
pub mod session;
pub mod writer;

#[cfg(test)]
mod fakes;

// Re-export commonly used types
pub use error::{TransferError, TransferErrorKind, TransferFailure};
pub use pipeline::{TransferOptions, TransferPipeline, TransferState};
pub use reader::{validate_content_type, ChunkResult, SourceReader};
pub use session::{TransferProgress, TransferSession};
pub use writer::SinkWriter;
