use board_core::DescriptorFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides `<data_dir>/soundboard`.
    pub data_dir: Option<PathBuf>,
    pub descriptor_format: DescriptorFormat,
    /// tracing filter used when `RUST_LOG` is unset.
    pub log: String,
    /// Skip-back steps in seconds.
    pub skip_steps: Vec<f64>,
    /// How often `wait` advances the playback clock.
    pub progress_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            descriptor_format: DescriptorFormat::Json,
            log: "info".to_string(),
            skip_steps: vec![5.0, 15.0, 20.0],
            progress_interval_ms: 250,
        }
    }
}

impl Config {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("soundboard").join("config.toml"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Self::default(),
        }
    }

    fn parse(contents: &str) -> Self {
        toml::from_str(contents).unwrap_or_default()
    }

    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };

        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }

        if let Ok(contents) = toml::to_string_pretty(self) {
            let _ = fs::write(&path, contents);
        }
    }

    /// Where blobs and the session descriptor live.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|p| p.join("soundboard")))
    }

    pub fn descriptor_file_name(&self) -> &'static str {
        match self.descriptor_format {
            DescriptorFormat::Json => "session.json",
            DescriptorFormat::Msgpack => "session.msgpack",
        }
    }

    /// Skip step by 1-based index, falling back to the first step.
    pub fn skip_step(&self, index: Option<usize>) -> f64 {
        index
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.skip_steps.get(i))
            .or_else(|| self.skip_steps.first())
            .copied()
            .unwrap_or(5.0)
    }
}
