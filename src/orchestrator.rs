#![forbid(unsafe_code)]

//! Download orchestration: decide per record whether an audio artifact must be
//! fetched, fetch it, and merge the resulting path back into the record set.
//!
//! The core never prints. Progress is reported through [`DownloadObserver`],
//! and persisting the mutated [`RecordSet`] is left to the caller so the
//! document is written exactly once per run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_OUTPUT_DIR;
use crate::error::ExtractionError;
use crate::extractor::{AudioExtractor, AudioOptions, EXT_PLACEHOLDER};
use crate::records::{RecordEntry, RecordSet};

pub const UNKNOWN_CHANNEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Root under which one directory per channel is created.
    pub output_root: PathBuf,
    pub audio: AudioOptions,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_DIR),
            audio: AudioOptions::default(),
        }
    }
}

/// Directory-safe form of a channel display name.
pub fn sanitize_channel_name(name: &str) -> String {
    name.replace(['/', ' '], "_")
}

pub fn channel_dir(output_root: &Path, channel: &str) -> PathBuf {
    output_root.join(sanitize_channel_name(channel))
}

/// `<output_root>/<sanitized channel>/<video_id>.<format>`
pub fn artifact_path(output_root: &Path, channel: &str, video_id: &str, format: &str) -> PathBuf {
    channel_dir(output_root, channel).join(format!("{video_id}.{format}"))
}

fn output_template(channel_dir: &Path, video_id: &str) -> PathBuf {
    channel_dir.join(format!("{video_id}.{EXT_PLACEHOLDER}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `video_id` or `video_url` absent or empty.
    MissingFields,
    /// Artifact on disk and the record already carried a path.
    AlreadyRecorded,
}

#[derive(Debug)]
pub enum ItemOutcome {
    /// `recovered` is set when the artifact was already on disk and only the
    /// record needed the path.
    Succeeded { path: PathBuf, recovered: bool },
    Skipped(SkipReason),
    Failed(ExtractionError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl DownloadSummary {
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Succeeded { .. } => self.succeeded += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Receives progress events from a run. Every method defaults to a no-op.
pub trait DownloadObserver {
    fn run_started(&mut self, _total: usize, _config: &DownloadConfig) {}

    fn item_started(&mut self, _position: usize, _total: usize, _entry: &RecordEntry) {}

    fn item_finished(
        &mut self,
        _position: usize,
        _total: usize,
        _video_id: Option<&str>,
        _outcome: &ItemOutcome,
    ) {
    }

    fn run_finished(&mut self, _summary: &DownloadSummary) {}
}

impl DownloadObserver for () {}

/// Emits one structured `tracing` event per progress step.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl DownloadObserver for TracingObserver {
    fn run_started(&mut self, total: usize, config: &DownloadConfig) {
        tracing::info!(
            total,
            output_dir = %config.output_root.display(),
            format = %config.audio.format,
            quality = %config.audio.quality,
            "Starting audio download"
        );
    }

    fn item_started(&mut self, position: usize, total: usize, entry: &RecordEntry) {
        let title: String = entry.title().unwrap_or("Unknown").chars().take(50).collect();
        tracing::info!(
            "[{position}/{total}] {} - {title}",
            entry.channel().unwrap_or(UNKNOWN_CHANNEL)
        );
    }

    fn item_finished(
        &mut self,
        _position: usize,
        _total: usize,
        video_id: Option<&str>,
        outcome: &ItemOutcome,
    ) {
        let video_id = video_id.unwrap_or("<missing>");
        match outcome {
            ItemOutcome::Succeeded {
                path,
                recovered: false,
            } => tracing::info!(video_id, path = %path.display(), "Downloaded"),
            ItemOutcome::Succeeded {
                path,
                recovered: true,
            } => tracing::info!(video_id, path = %path.display(), "Already downloaded"),
            ItemOutcome::Skipped(SkipReason::MissingFields) => {
                tracing::warn!(video_id, "Missing URL or ID, skipping")
            }
            ItemOutcome::Skipped(SkipReason::AlreadyRecorded) => {
                tracing::info!(video_id, "Already exists, skipping")
            }
            ItemOutcome::Failed(err) => {
                tracing::error!(video_id, error = %err, "Failed to download")
            }
        }
    }

    fn run_finished(&mut self, summary: &DownloadSummary) {
        tracing::info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Audio download finished"
        );
    }
}

pub struct DownloadOrchestrator<E> {
    extractor: E,
    config: DownloadConfig,
}

impl<E: AudioExtractor> DownloadOrchestrator<E> {
    pub fn new(extractor: E, config: DownloadConfig) -> Self {
        Self { extractor, config }
    }

    pub fn run(&self, records: &mut RecordSet) -> DownloadSummary {
        self.run_with_observer(records, &mut ())
    }

    /// Processes every record in document order. Records are only ever
    /// mutated by adding or replacing `audio_file_path`; nothing is reordered.
    pub fn run_with_observer<O>(&self, records: &mut RecordSet, observer: &mut O) -> DownloadSummary
    where
        O: DownloadObserver + ?Sized,
    {
        let total = records.len();
        let mut summary = DownloadSummary::default();
        observer.run_started(total, &self.config);

        for (index, entry) in records.iter_mut().enumerate() {
            let position = index + 1;
            observer.item_started(position, total, entry);
            let outcome = self.process_entry(entry);
            summary.record(&outcome);
            observer.item_finished(position, total, entry.video_id(), &outcome);
        }

        observer.run_finished(&summary);
        summary
    }

    /// Runs the per-record state machine: validate, resolve the target,
    /// short-circuit on an existing artifact, extract, commit.
    pub fn process_entry(&self, entry: &mut RecordEntry) -> ItemOutcome {
        let (Some(video_id), Some(video_url)) = (entry.video_id(), entry.video_url()) else {
            return ItemOutcome::Skipped(SkipReason::MissingFields);
        };
        let video_id = video_id.to_string();
        let video_url = video_url.to_string();
        let channel = entry.channel().unwrap_or(UNKNOWN_CHANNEL);

        let dir = channel_dir(&self.config.output_root, channel);
        if let Err(source) = fs::create_dir_all(&dir) {
            return ItemOutcome::Failed(ExtractionError::Filesystem { path: dir, source });
        }

        let target = artifact_path(
            &self.config.output_root,
            channel,
            &video_id,
            &self.config.audio.format,
        );
        if target.exists() {
            if entry.has_audio_file_path() {
                return ItemOutcome::Skipped(SkipReason::AlreadyRecorded);
            }
            return commit(entry, &target, true);
        }

        let template = output_template(&dir, &video_id);
        match self
            .extractor
            .extract(&video_url, &template, &self.config.audio)
        {
            Ok(produced) if produced.exists() => commit(entry, &produced, false),
            Ok(produced) => ItemOutcome::Failed(ExtractionError::MissingOutput(produced)),
            Err(err) => ItemOutcome::Failed(err),
        }
    }
}

/// Records the absolute path of an artifact that is known to exist.
fn commit(entry: &mut RecordEntry, artifact: &Path, recovered: bool) -> ItemOutcome {
    match fs::canonicalize(artifact) {
        Ok(path) => {
            entry.set_audio_file_path(&path);
            ItemOutcome::Succeeded { path, recovered }
        }
        Err(source) => ItemOutcome::Failed(ExtractionError::Filesystem {
            path: artifact.to_path_buf(),
            source,
        }),
    }
}
