#![forbid(unsafe_code)]

//! Downloads the audio track of every video listed in a record set produced by
//! `collect_catalog`, then writes each artifact's path back into that file.
//!
//! Layout: `<output_dir>/<channel with '/' and ' ' replaced by '_'>/<video_id>.<format>`.
//! The data file is rewritten once, after every record has been processed.

use anyhow::{Context, Result};
use channel_audio_tools::config::{Settings, SettingsOverrides, resolve_settings};
use channel_audio_tools::error::PreconditionError;
use channel_audio_tools::extractor::YtDlp;
use channel_audio_tools::logging;
use channel_audio_tools::orchestrator::{DownloadOrchestrator, DownloadSummary, TracingObserver};
use channel_audio_tools::records::RecordSet;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(
    name = "download_audio",
    about = "Download audio for every video in a record set"
)]
struct DownloadArgs {
    /// Record set written by collect_catalog.
    data_file: PathBuf,

    /// Root directory for per-channel audio folders (default: audio_downloads).
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Audio format handed to yt-dlp (default: mp3).
    #[arg(long)]
    audio_format: Option<String>,

    /// Audio quality handed to yt-dlp, kbps for mp3 (default: 192).
    #[arg(long)]
    audio_quality: Option<String>,

    /// yt-dlp executable to run.
    #[arg(long)]
    yt_dlp: Option<PathBuf>,

    /// Alternate .env file.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl DownloadArgs {
    fn into_parts(self) -> (PathBuf, SettingsOverrides) {
        let overrides = SettingsOverrides {
            output_dir: self.output_dir,
            audio_format: self.audio_format,
            audio_quality: self.audio_quality,
            yt_dlp_path: self.yt_dlp,
            env_path: self.env_file,
            ..SettingsOverrides::default()
        };
        (self.data_file, overrides)
    }
}

fn main() -> Result<()> {
    logging::init()?;
    let (data_file, overrides) = DownloadArgs::parse().into_parts();
    let settings = resolve_settings(overrides)?;

    if let Some(summary) = run(&data_file, &settings)? {
        print_summary(&summary, &settings, &data_file);
    }
    Ok(())
}

/// Returns `None` when the data file holds no videos; nothing is written then.
fn run(data_file: &Path, settings: &Settings) -> Result<Option<DownloadSummary>> {
    let ytdlp = YtDlp::new(&settings.yt_dlp_path);
    ytdlp.ensure_available()?;

    if !data_file.exists() {
        return Err(PreconditionError::InputMissing(data_file.to_path_buf()).into());
    }
    let mut records = RecordSet::load(data_file)?;
    if records.is_empty() {
        tracing::warn!("No videos found in {}", data_file.display());
        return Ok(None);
    }

    let config = settings.download_config();
    fs::create_dir_all(&config.output_root)
        .with_context(|| format!("creating {}", config.output_root.display()))?;

    let orchestrator = DownloadOrchestrator::new(ytdlp, config);
    let summary = orchestrator.run_with_observer(&mut records, &mut TracingObserver);

    tracing::info!("Updating {} with audio file paths", data_file.display());
    records
        .save(data_file)
        .with_context(|| format!("saving {}", data_file.display()))?;

    Ok(Some(summary))
}

fn print_summary(summary: &DownloadSummary, settings: &Settings, data_file: &Path) {
    println!();
    println!("============================================================");
    println!("DOWNLOAD SUMMARY");
    println!("============================================================");
    println!("Successfully downloaded: {}", summary.succeeded);
    println!("Skipped (already exists): {}", summary.skipped);
    println!("Failed: {}", summary.failed);
    println!("Audio files saved in: {}/", settings.output_dir.display());
    println!("Data file updated: {}", data_file.display());
    println!("============================================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Mutex;
    use tempfile::tempdir;

    // Forking while another test still holds the stub open for writing
    // makes exec fail with ETXTBSY.
    static SPAWN_LOCK: Mutex<()> = Mutex::new(());

    fn settings_in(dir: &Path, yt_dlp: PathBuf) -> Result<Settings> {
        resolve_settings(SettingsOverrides {
            output_dir: Some(dir.join("audio_downloads")),
            audio_format: Some("mp3".into()),
            audio_quality: Some("192".into()),
            yt_dlp_path: Some(yt_dlp),
            env_path: Some(dir.join("missing.env")),
            ..SettingsOverrides::default()
        })
    }

    #[cfg(unix)]
    fn install_ytdlp_stub(dir: &Path) -> Result<PathBuf> {
        let script_path = dir.join("yt-dlp");
        let script = r#"#!/usr/bin/env bash
set -eu
output=""
format=""
url=""
while [[ $# -gt 0 ]]; do
  case "$1" in
    --version) echo "stub"; exit 0 ;;
    -o) shift; output="$1" ;;
    --audio-format) shift; format="$1" ;;
    --audio-quality) shift ;;
    -*) ;;
    *) url="$1" ;;
  esac
  shift
done
case "$url" in
  *fail*) exit 1 ;;
esac
target="${output//%(ext)s/$format}"
mkdir -p "$(dirname "$target")"
echo "audio" > "$target"
echo "$url" >> "$(dirname "$0")/invocations.log"
"#;
        fs::write(&script_path, script)?;
        let mut perms = fs::metadata(&script_path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script_path, perms)?;
        Ok(script_path)
    }

    #[test]
    fn args_require_data_file() {
        assert!(DownloadArgs::try_parse_from(["download_audio"]).is_err());
        let (data_file, overrides) =
            DownloadArgs::try_parse_from(["download_audio", "videos.json", "--audio-format", "m4a"])
                .unwrap()
                .into_parts();
        assert_eq!(data_file, PathBuf::from("videos.json"));
        assert_eq!(overrides.audio_format.as_deref(), Some("m4a"));
    }

    #[test]
    fn missing_tool_aborts_before_touching_input() -> Result<()> {
        let _lock = SPAWN_LOCK.lock().unwrap();
        let dir = tempdir()?;
        let data_file = dir.path().join("videos.json");
        fs::write(&data_file, "[]")?;
        let settings = settings_in(dir.path(), dir.path().join("no-such-yt-dlp"))?;

        let err = run(&data_file, &settings).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreconditionError>(),
            Some(PreconditionError::ToolMissing { .. })
        ));
        assert!(!settings.output_dir.exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn end_to_end_run_is_idempotent() -> Result<()> {
        let _lock = SPAWN_LOCK.lock().unwrap();
        let dir = tempdir()?;
        let stub = install_ytdlp_stub(dir.path())?;
        let settings = settings_in(dir.path(), stub)?;

        let missing = dir.path().join("missing.json");
        let err = run(&missing, &settings).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreconditionError>(),
            Some(PreconditionError::InputMissing(_))
        ));

        let empty = dir.path().join("empty.json");
        fs::write(&empty, "[]\n")?;
        assert!(run(&empty, &settings)?.is_none());
        assert_eq!(fs::read_to_string(&empty)?, "[]\n");

        let data_file = dir.path().join("videos.json");
        fs::write(
            &data_file,
            r#"[
    {"video_id": "v1", "video_url": "https://x/v1", "channel": "My Chan", "views": 3},
    {"video_id": "v2", "channel": "My Chan"},
    {"video_id": "v3", "video_url": "https://x/fail", "channel": "Other/Chan"}
]"#,
        )?;

        let first = run(&data_file, &settings)?.unwrap();
        assert_eq!((first.succeeded, first.skipped, first.failed), (1, 1, 1));
        let after_first = fs::read_to_string(&data_file)?;

        let records = RecordSet::load(&data_file)?;
        let path = records.get(0).unwrap().audio_file_path().unwrap().to_string();
        assert!(path.ends_with("audio_downloads/My_Chan/v1.mp3"));
        assert!(Path::new(&path).exists());
        assert!(!records.get(1).unwrap().has_audio_file_path());
        assert!(!records.get(2).unwrap().has_audio_file_path());
        assert!(settings.output_dir.join("Other_Chan").is_dir());

        let second = run(&data_file, &settings)?.unwrap();
        assert_eq!(second.succeeded + second.skipped + second.failed, 3);
        assert_eq!(second.skipped, 2);
        assert_eq!(fs::read_to_string(&data_file)?, after_first);

        let invocations = fs::read_to_string(dir.path().join("invocations.log"))?;
        assert_eq!(invocations.lines().collect::<Vec<_>>(), ["https://x/v1"]);
        Ok(())
    }
}
