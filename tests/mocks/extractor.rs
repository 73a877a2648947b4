use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use channel_audio_tools::error::ExtractionError;
use channel_audio_tools::extractor::{AudioExtractor, AudioOptions, resolve_template};

/// Writes a placeholder artifact for every URL except those listed in
/// `fail_urls`.
#[derive(Clone, Default)]
pub struct MockExtractor {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_urls: Vec<String>,
}

impl MockExtractor {
    pub fn failing_for(urls: &[&str]) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_urls: urls.iter().map(|url| url.to_string()).collect(),
        }
    }
}

impl AudioExtractor for MockExtractor {
    fn extract(
        &self,
        url: &str,
        output_template: &Path,
        options: &AudioOptions,
    ) -> Result<PathBuf, ExtractionError> {
        self.calls.lock().unwrap().push(url.to_string());
        if self.fail_urls.iter().any(|fail| fail == url) {
            return Err(ExtractionError::MissingOutput(output_template.to_path_buf()));
        }
        let path = resolve_template(output_template, &options.format);
        fs::write(&path, b"audio").map_err(|source| ExtractionError::Filesystem {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
