//! Video source wrapper over a frame decoder
//!
//! A `VideoSource` owns one decodable media stream and tracks the frame
//! cursor used for end-of-stream detection.

use std::path::Path;

use thiserror::Error;

use super::FfmpegDecoder;

/// Errors that can occur while opening or decoding a video stream.
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("ffmpeg/ffprobe not found on PATH")]
    NotFound,
    #[error("failed to spawn decoder process: {0}")]
    SpawnFailed(#[from] std::io::Error),
    #[error("failed to parse video metadata: {0}")]
    ProbeFailed(String),
    #[error("frame decode failed: {0}")]
    DecodeFailed(String),
}

/// One decoded video frame, RGB24, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw pixel data, `width * height * 3` bytes
    pub pixels: Vec<u8>,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// The seam to the external decoding collaborator.
///
/// `read_frame` returning `Ok(None)` is the decoder's explicit end-of-stream
/// signal; `frame_count` is best-effort and 0 means unknown.
pub trait FrameDecoder: Send {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn frame_count(&self) -> u64;
    fn read_frame(&mut self) -> Result<Option<Frame>, VideoError>;
    fn seek_to_start(&mut self) -> Result<(), VideoError>;
}

/// One openable media stream with a frame cursor.
pub struct VideoSource {
    decoder: Box<dyn FrameDecoder>,
    /// Width in pixels, fixed at open
    pub width: u32,
    /// Height in pixels, fixed at open
    pub height: u32,
    /// Total frames as reported at open; 0 when the encoding does not say
    pub total_frame_count: u64,
    /// Frame cursor, advanced by pulls and reset by `restart`
    pub current_frame: u64,
    /// Whether this source belongs to the ambient loop rotation
    pub is_loop: bool,
    stream_ended: bool,
}

impl VideoSource {
    /// Open a media file through the ffmpeg decoder.
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let decoder = FfmpegDecoder::open(path)?;
        Ok(Self::from_decoder(Box::new(decoder)))
    }

    /// Wrap an already-open decoder. Dimensions and frame count are cached
    /// here, once.
    pub fn from_decoder(decoder: Box<dyn FrameDecoder>) -> Self {
        let width = decoder.width();
        let height = decoder.height();
        let total_frame_count = decoder.frame_count();
        Self {
            decoder,
            width,
            height,
            total_frame_count,
            current_frame: 0,
            is_loop: false,
            stream_ended: false,
        }
    }

    /// Pull the next frame.
    ///
    /// The cursor advances on every pull that is not already past
    /// end-of-stream, even when decoding fails, so end-of-stream detection
    /// stays in step with `total_frame_count`. A pull at end-of-stream
    /// returns `None` without advancing.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.at_end() {
            return None;
        }
        self.current_frame += 1;
        match self.decoder.read_frame() {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => {
                self.stream_ended = true;
                None
            }
            Err(e) => {
                log::warn!("frame decode failed at frame {}: {}", self.current_frame, e);
                None
            }
        }
    }

    /// Whether the stream is exhausted.
    ///
    /// True when the cursor has reached the reported frame count, or when the
    /// decoder has signalled end-of-stream itself, whichever fires first.
    /// The decoder signal covers encodings whose reported count is missing or
    /// over-reported; the count comparison covers decoders that over-deliver.
    pub fn at_end(&self) -> bool {
        self.stream_ended
            || (self.total_frame_count > 0 && self.current_frame >= self.total_frame_count)
    }

    /// Reset the cursor to 0 and seek the stream to its first frame.
    /// Idempotent.
    pub fn restart(&mut self) {
        self.current_frame = 0;
        self.stream_ended = false;
        if let Err(e) = self.decoder.seek_to_start() {
            log::warn!("seek to start failed: {}", e);
        }
    }
}

impl std::fmt::Debug for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSource")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("total_frame_count", &self.total_frame_count)
            .field("current_frame", &self.current_frame)
            .field("is_loop", &self.is_loop)
            .finish()
    }
}
