#![forbid(unsafe_code)]

//! Audio extraction through an external `yt-dlp` executable.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::{DEFAULT_AUDIO_FORMAT, DEFAULT_AUDIO_QUALITY, DEFAULT_YT_DLP};
use crate::error::{ExtractionError, PreconditionError};

/// Placeholder yt-dlp substitutes with the final file extension.
pub const EXT_PLACEHOLDER: &str = "%(ext)s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioOptions {
    /// Container/codec passed to `--audio-format` (mp3, m4a, opus, wav, ...).
    pub format: String,
    /// Passed to `--audio-quality`; kbps for mp3.
    pub quality: String,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            format: DEFAULT_AUDIO_FORMAT.to_string(),
            quality: DEFAULT_AUDIO_QUALITY.to_string(),
        }
    }
}

/// Fills the extension placeholder of an output template.
pub fn resolve_template(template: &Path, format: &str) -> PathBuf {
    PathBuf::from(
        template
            .to_string_lossy()
            .replace(EXT_PLACEHOLDER, format),
    )
}

/// Something that can turn a video URL into a local audio file.
pub trait AudioExtractor {
    /// Extracts audio from `url` into `output_template` and returns the path of
    /// the produced artifact. One attempt, no retries.
    fn extract(
        &self,
        url: &str,
        output_template: &Path,
        options: &AudioOptions,
    ) -> Result<PathBuf, ExtractionError>;
}

impl<T: AudioExtractor + ?Sized> AudioExtractor for &T {
    fn extract(
        &self,
        url: &str,
        output_template: &Path,
        options: &AudioOptions,
    ) -> Result<PathBuf, ExtractionError> {
        (**self).extract(url, output_template, options)
    }
}

#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new(DEFAULT_YT_DLP)
    }
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn program_label(&self) -> String {
        self.program.display().to_string()
    }

    /// Runs `<program> --version` so a missing install fails before any work.
    pub fn ensure_available(&self) -> Result<(), PreconditionError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(PreconditionError::ToolFailed {
                program: self.program_label(),
                status,
            }),
            Err(source) => Err(PreconditionError::ToolMissing {
                program: self.program_label(),
                source,
            }),
        }
    }

    fn extract_command(&self, url: &str, output_template: &Path, options: &AudioOptions) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("-x")
            .arg("--audio-format")
            .arg(&options.format)
            .arg("--audio-quality")
            .arg(&options.quality)
            .arg("-o")
            .arg(output_template)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("--progress")
            .arg(url)
            .stdin(Stdio::null());
        command
    }
}

impl AudioExtractor for YtDlp {
    fn extract(
        &self,
        url: &str,
        output_template: &Path,
        options: &AudioOptions,
    ) -> Result<PathBuf, ExtractionError> {
        let status = self
            .extract_command(url, output_template, options)
            .status()
            .map_err(|source| ExtractionError::Spawn {
                program: self.program_label(),
                source,
            })?;

        if !status.success() {
            return Err(ExtractionError::ExitStatus {
                program: self.program_label(),
                status,
            });
        }

        let produced = resolve_template(output_template, &options.format);
        if !produced.exists() {
            return Err(ExtractionError::MissingOutput(produced));
        }
        Ok(produced)
    }
}
