#![forbid(unsafe_code)]

//! Runtime settings for both binaries.
//!
//! Values are resolved with the precedence CLI override > process environment >
//! `.env` file > built-in default, then handed to each component as explicit
//! configuration structs.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::collector::CollectorConfig;
use crate::extractor::AudioOptions;
use crate::orchestrator::DownloadConfig;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_OUTPUT_DIR: &str = "audio_downloads";
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";
pub const DEFAULT_AUDIO_QUALITY: &str = "192";
pub const DEFAULT_CATALOG_OUTPUT: &str = "youtube_channel_videos.json";
pub const DEFAULT_YT_DLP: &str = "yt-dlp";
pub const DEFAULT_CHANNEL_PAUSE_SECS: u64 = 1;

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: Option<String>,
    pub channel_ids: Vec<String>,
    pub output_dir: PathBuf,
    pub audio_format: String,
    pub audio_quality: String,
    pub catalog_output: PathBuf,
    pub yt_dlp_path: PathBuf,
    pub channel_pause: Duration,
}

impl Settings {
    pub fn audio_options(&self) -> AudioOptions {
        AudioOptions {
            format: self.audio_format.clone(),
            quality: self.audio_quality.clone(),
        }
    }

    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig {
            output_root: self.output_dir.clone(),
            audio: self.audio_options(),
        }
    }

    pub fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            channel_pause: self.channel_pause,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub api_key: Option<String>,
    pub channel_ids: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub audio_format: Option<String>,
    pub audio_quality: Option<String>,
    pub catalog_output: Option<PathBuf>,
    pub yt_dlp_path: Option<PathBuf>,
    pub channel_pause_secs: Option<u64>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_settings(overrides: SettingsOverrides) -> Result<Settings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    Ok(build_settings_with_overrides(
        &file_vars,
        env_var_string,
        overrides,
    ))
}

#[cfg(test)]
fn build_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Settings {
    build_settings_with_overrides(file_vars, env_lookup, SettingsOverrides::default())
}

fn build_settings_with_overrides(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> Settings {
    let lookup = |key: &str| lookup_value(key, file_vars, &env_lookup);

    let api_key = non_blank(overrides.api_key).or_else(|| lookup("YOUTUBE_API_KEY"));
    let channel_ids = overrides
        .channel_ids
        .filter(|ids| !ids.is_empty())
        .or_else(|| lookup("CHANNEL_IDS").map(|raw| split_list(&raw)))
        .unwrap_or_default();
    let output_dir = overrides
        .output_dir
        .or_else(|| lookup("OUTPUT_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let audio_format = non_blank(overrides.audio_format)
        .or_else(|| lookup("AUDIO_FORMAT"))
        .unwrap_or_else(|| DEFAULT_AUDIO_FORMAT.to_string());
    let audio_quality = non_blank(overrides.audio_quality)
        .or_else(|| lookup("AUDIO_QUALITY"))
        .unwrap_or_else(|| DEFAULT_AUDIO_QUALITY.to_string());
    let catalog_output = overrides
        .catalog_output
        .or_else(|| lookup("CATALOG_OUTPUT").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_OUTPUT));
    let yt_dlp_path = overrides
        .yt_dlp_path
        .or_else(|| lookup("YT_DLP_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_YT_DLP));
    let channel_pause_secs = overrides
        .channel_pause_secs
        .or_else(|| lookup("CHANNEL_PAUSE_SECS").and_then(|value| value.parse::<u64>().ok()))
        .unwrap_or(DEFAULT_CHANNEL_PAUSE_SECS);

    Settings {
        api_key,
        channel_ids,
        output_dir,
        audio_format,
        audio_quality,
        catalog_output,
        yt_dlp_path,
        channel_pause: Duration::from_secs(channel_pause_secs),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_var_string(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| {
        file_vars
            .get(key)
            .cloned()
            .filter(|value| !value.trim().is_empty())
    })
}

/// Minimal `.env` parser: `KEY=value` lines, optional `export ` prefix and
/// single or double quotes. A missing file yields no variables.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
