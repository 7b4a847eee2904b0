//! ffmpeg-backed frame decoder
//!
//! Metadata is probed once with ffprobe; frames are then pulled from a
//! long-running `ffmpeg -f rawvideo -pix_fmt rgb24` child process over a
//! pipe. Seeking back to the start respawns the child, since a raw pipe
//! cannot rewind.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use super::{Frame, FrameDecoder, VideoError};

/// Metadata probed from a media file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProbeInfo {
    width: u32,
    height: u32,
    frame_count: u64,
}

/// Frame decoder reading RGB24 frames from an external ffmpeg process.
pub struct FfmpegDecoder {
    path: PathBuf,
    width: u32,
    height: u32,
    frame_count: u64,
    frame_len: usize,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegDecoder {
    /// Probe the file and start the decode process.
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        let info = probe(path)?;
        let mut decoder = Self {
            path: path.to_path_buf(),
            width: info.width,
            height: info.height,
            frame_count: info.frame_count,
            frame_len: info.width as usize * info.height as usize * 3,
            child: None,
            stdout: None,
        };
        decoder.spawn_child()?;
        log::info!(
            "opened {:?}: {}x{}, {} frames",
            path,
            decoder.width,
            decoder.height,
            decoder.frame_count
        );
        Ok(decoder)
    }

    fn spawn_child(&mut self) -> Result<(), VideoError> {
        let ffmpeg = which::which("ffmpeg").map_err(|_| VideoError::NotFound)?;
        let mut child = Command::new(ffmpeg)
            .arg("-i")
            .arg(&self.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            // stderr must not pile up in a pipe or the child stalls
            .stderr(Stdio::null())
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VideoError::DecodeFailed("decoder stdout unavailable".into()))?;
        self.child = Some(child);
        self.stdout = Some(stdout);
        Ok(())
    }

    fn release_child(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Err(VideoError::DecodeFailed("decoder process not running".into()));
        };
        let mut pixels = vec![0u8; self.frame_len];
        match stdout.read_exact(&mut pixels) {
            Ok(()) => Ok(Some(Frame {
                pixels,
                width: self.width,
                height: self.height,
            })),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
            Err(e) => Err(VideoError::DecodeFailed(e.to_string())),
        }
    }

    fn seek_to_start(&mut self) -> Result<(), VideoError> {
        self.release_child();
        self.spawn_child()
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.release_child();
    }
}

impl std::fmt::Debug for FfmpegDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FfmpegDecoder")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

fn probe(path: &Path) -> Result<ProbeInfo, VideoError> {
    let ffprobe = which::which("ffprobe").map_err(|_| VideoError::NotFound)?;
    let output = Command::new(ffprobe)
        .args(["-select_streams", "v:0"])
        .args([
            "-show_entries",
            "stream=width,height,nb_frames,r_frame_rate:format=duration",
        ])
        .args(["-print_format", "compact=print_section=0:item_sep=,"])
        .arg(path)
        .output()?;
    if !output.status.success() {
        return Err(VideoError::ProbeFailed(format!(
            "ffprobe exited with {} for {:?}",
            output.status, path
        )));
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse ffprobe's compact key=value output. `nb_frames` is best-effort:
/// absent or "N/A" for some encodings, in which case the count is estimated
/// from duration and frame rate, or left at 0 (unknown).
fn parse_probe_output(text: &str) -> Result<ProbeInfo, VideoError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in text.lines() {
        for pair in line.trim().split(',') {
            if let Some((key, value)) = pair.split_once('=') {
                fields.insert(key.trim(), value.trim());
            }
        }
    }

    let width = required_u32(&fields, "width")?;
    let height = required_u32(&fields, "height")?;
    let frame_count = fields
        .get("nb_frames")
        .and_then(|v| v.parse::<u64>().ok())
        .or_else(|| estimate_frame_count(&fields))
        .unwrap_or(0);

    Ok(ProbeInfo {
        width,
        height,
        frame_count,
    })
}

fn required_u32(fields: &HashMap<&str, &str>, key: &str) -> Result<u32, VideoError> {
    fields
        .get(key)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| VideoError::ProbeFailed(format!("missing {} in ffprobe output", key)))
}

fn estimate_frame_count(fields: &HashMap<&str, &str>) -> Option<u64> {
    let (num, den) = fields.get("r_frame_rate")?.split_once('/')?;
    let fps = num.parse::<f64>().ok()? / den.parse::<f64>().ok()?;
    let duration = fields.get("duration")?.parse::<f64>().ok()?;
    if !fps.is_finite() || fps <= 0.0 || duration <= 0.0 {
        return None;
    }
    Some((duration * fps).ceil() as u64)
}
