use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub report: bool,
    #[serde(default = "default_true")]
    pub guide: bool,
}

/// STFT framing used by every analysis pass.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_n_fft")]
    pub n_fft: usize,
    #[serde(default = "default_hop_length")]
    pub hop_length: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            report: true,
            guide: true,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            n_fft: default_n_fft(),
            hop_length: default_hop_length(),
        }
    }
}

impl AnalysisConfig {
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.n_fft >= 2 && self.hop_length > 0
    }
}

fn default_format() -> String { "text".into() }
fn default_true() -> bool { true }
fn default_sample_rate() -> u32 { 22050 }
fn default_n_fft() -> usize { 2048 }
fn default_hop_length() -> usize { 512 }

/// Explicit path first, then `afroprompt.toml` in the working directory,
/// then the user config locations.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("afroprompt.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("afroprompt").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("afroprompt").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Option<Config> {
    let config: Config = toml::from_str(content).ok()?;
    if !config.analysis.is_valid() {
        log::warn!("Ignoring invalid [analysis] settings: {:?}", config.analysis);
        return None;
    }
    Some(config)
}
