#![forbid(unsafe_code)]

//! Error taxonomy shared by both pipelines.
//!
//! Binaries wrap these in `anyhow` at the edges; library code keeps them typed
//! so callers can decide which failures are fatal and which only drop a
//! channel or a single item.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures talking to the remote catalog. Recoverable per channel.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no API key configured; set YOUTUBE_API_KEY or pass --api-key")]
    MissingApiKey,

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("channel {0} does not expose an uploads playlist")]
    MissingUploads(String),

    #[error("catalog request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("could not decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: io::Error,
    },
}

/// A single extraction attempt did not leave an artifact behind.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("could not launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    ExitStatus { program: String, status: ExitStatus },

    #[error("extraction reported success but {} is missing", .0.display())]
    MissingOutput(PathBuf),

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Conditions that abort a run before any work starts.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error(
        "{program} is not installed or not in PATH ({source})\n\n\
         Please install it using one of these methods:\n  \
         - pip install yt-dlp\n  \
         - sudo apt install yt-dlp (on Ubuntu/Debian)\n  \
         - brew install yt-dlp (on macOS)"
    )]
    ToolMissing {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} is installed but `--version` exited with {status}")]
    ToolFailed { program: String, status: ExitStatus },

    #[error("data file not found: {}", .0.display())]
    InputMissing(PathBuf),
}

/// Reading or writing the persisted record set.
#[derive(Debug, Error)]
pub enum RecordSetError {
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not contain a JSON array of videos", .0.display())]
    NotAnArray(PathBuf),

    #[error("entry {index} in {} is not a JSON object", path.display())]
    EntryNotObject { path: PathBuf, index: usize },

    #[error("serializing record set: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
