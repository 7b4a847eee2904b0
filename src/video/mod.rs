//! Video sources and frame decoding
//!
//! Provides the decoder seam and the ffmpeg-backed implementation used by the
//! kiosk player.

mod ffmpeg;
mod source;

pub use ffmpeg::FfmpegDecoder;
pub use source::{Frame, FrameDecoder, VideoError, VideoSource};

#[cfg(test)]
pub(crate) use source::tests::scripted_source;
