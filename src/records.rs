#![forbid(unsafe_code)]

//! Persisted record set shared by the collector and the downloader.
//!
//! The collector writes typed [`VideoRecord`]s. The downloader reads the same
//! document back as loosely typed [`RecordEntry`] objects so unknown keys and
//! their key order survive a read/modify/write cycle; the only key it
//! ever adds is `audio_file_path`.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::RecordSetError;

pub const AUDIO_FILE_PATH_KEY: &str = "audio_file_path";

/// One video as emitted by the catalog collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub channel: String,
    pub title: String,
    pub video_url: String,
    pub published_at: String,
    pub duration: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file_path: Option<String>,
}

/// A record as found on disk. Accessors treat missing or non-string values as
/// absent rather than failing the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordEntry(Map<String, Value>);

impl RecordEntry {
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn video_id(&self) -> Option<&str> {
        self.non_empty_str("video_id")
    }

    pub fn video_url(&self) -> Option<&str> {
        self.non_empty_str("video_url")
    }

    pub fn channel(&self) -> Option<&str> {
        self.non_empty_str("channel")
    }

    pub fn title(&self) -> Option<&str> {
        self.non_empty_str("title")
    }

    /// Whether the document already carried a path for this video.
    pub fn has_audio_file_path(&self) -> bool {
        self.0.contains_key(AUDIO_FILE_PATH_KEY)
    }

    pub fn audio_file_path(&self) -> Option<&str> {
        self.0.get(AUDIO_FILE_PATH_KEY).and_then(Value::as_str)
    }

    /// Replaces the value in place if the key exists, otherwise appends it
    /// after every other key.
    pub fn set_audio_file_path(&mut self, path: &Path) {
        self.0.insert(
            AUDIO_FILE_PATH_KEY.to_string(),
            Value::String(path.to_string_lossy().into_owned()),
        );
    }
}

/// The ordered list of records backing one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordSet {
    entries: Vec<RecordEntry>,
}

impl RecordSet {
    /// Reads the document at `path`. Every element must be a JSON object.
    pub fn load(path: &Path) -> Result<Self, RecordSetError> {
        let raw = fs::read_to_string(path).map_err(|source| RecordSetError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    fn parse(raw: &str, path: &Path) -> Result<Self, RecordSetError> {
        let value: Value = serde_json::from_str(raw).map_err(|source| RecordSetError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let Value::Array(items) = value else {
            return Err(RecordSetError::NotAnArray(path.to_path_buf()));
        };

        let mut entries = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => entries.push(RecordEntry(map)),
                _ => {
                    return Err(RecordSetError::EntryNotObject {
                        path: path.to_path_buf(),
                        index,
                    });
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordSetError> {
        write_document(path, &self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecordEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RecordEntry> {
        self.entries.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&RecordEntry> {
        self.entries.get(index)
    }
}

/// Serializes `value` as a 4-space indented JSON document and swaps it into
/// place. The destination is either the old document or the complete new one,
/// never a partial write.
pub fn write_document<T>(path: &Path, value: &T) -> Result<(), RecordSetError>
where
    T: Serialize + ?Sized,
{
    let mut payload = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut payload, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(RecordSetError::Serialize)?;
    payload.push(b'\n');

    let write_err = |source| RecordSetError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = parent_dir(path);
    fs::create_dir_all(&parent).map_err(write_err)?;
    let mut tmp = NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(&payload).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
