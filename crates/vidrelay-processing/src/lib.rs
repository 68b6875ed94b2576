//! vidrelay processing library
//!
//! Video downscaling: fetch a stored video into scratch space, run ffmpeg
//! over it, and store the result.

pub mod downscale;
pub mod error;

pub use downscale::{ffmpeg_args, DownscaleReport, Downscaler};
pub use error::TranscodeError;
