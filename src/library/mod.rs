//! Video library and playlist manifests
//!
//! The library maps unique names to open video sources; it is built once at
//! startup and immutable afterwards. Named playlist subsets ("close", "far")
//! come from manifest files and are validated against the library only at
//! selection time.

mod select;

pub use select::{pick, pick_with_value, SelectionError};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::video::{VideoError, VideoSource};

/// Errors from building or querying the library.
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("unable to open video source {name:?}: {source}")]
    UnopenableSource { name: String, source: VideoError },
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("video name {0:?} is not in the library")]
    UnknownVideoName(String),
}

/// Mapping from unique name to video source.
pub struct VideoLibrary {
    sources: HashMap<String, VideoSource>,
}

impl VideoLibrary {
    /// Open every file in `dir` as a video source keyed by filename.
    ///
    /// Fail-fast: any single unopenable file fails the whole load; the
    /// kiosk must not start with a partial library.
    pub fn load(dir: &Path) -> Result<Self, LibraryError> {
        let entries = fs::read_dir(dir).map_err(|e| LibraryError::Io {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut sources = HashMap::new();
        for entry in entries {
            let entry = entry.map_err(|e| LibraryError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let source = VideoSource::open(&path).map_err(|e| LibraryError::UnopenableSource {
                name: name.clone(),
                source: e,
            })?;
            sources.insert(name, source);
        }

        log::info!("loaded {} videos from {:?}", sources.len(), dir);
        Ok(Self { sources })
    }

    /// Build a library from already-open sources.
    pub fn from_sources(sources: HashMap<String, VideoSource>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Resolve a name to its source.
    pub fn source(&self, name: &str) -> Result<&VideoSource, LibraryError> {
        self.sources
            .get(name)
            .ok_or_else(|| LibraryError::UnknownVideoName(name.to_string()))
    }

    /// Resolve a name to its source, mutably.
    pub fn source_mut(&mut self, name: &str) -> Result<&mut VideoSource, LibraryError> {
        self.sources
            .get_mut(name)
            .ok_or_else(|| LibraryError::UnknownVideoName(name.to_string()))
    }

    /// Draw a uniform random name from `pool`.
    ///
    /// A manifest name absent from the library fails loudly; a selection that
    /// comes up empty is recoverable and reported as `None`.
    pub fn pick_from<'a>(&self, pool: &'a [String]) -> Result<Option<&'a str>, LibraryError> {
        let picked = match select::pick(pool, None) {
            Ok(picked) => picked,
            Err(e) => {
                log::warn!("loop selection skipped: {}", e);
                return Ok(None);
            }
        };
        match picked {
            Some(name) if self.sources.contains_key(name.as_str()) => Ok(Some(name.as_str())),
            Some(name) => Err(LibraryError::UnknownVideoName(name.clone())),
            None => Ok(None),
        }
    }
}

/// Read a playlist manifest: one video name per line, surrounding whitespace
/// trimmed, order preserved, blank lines skipped.
pub fn read_manifest(path: &Path) -> Result<Vec<String>, LibraryError> {
    let text = fs::read_to_string(path).map_err(|e| LibraryError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
