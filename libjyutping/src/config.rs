/// Jyutping-specific configuration that extends the base `Config` from core.
///
/// This configuration includes:
/// - All generic decoder options from `libchinese_core::Config` (flattened via serde)
/// - Inner segmentation of long syllables
///
/// # Example
///
/// ```rust
/// use libjyutping::JyutpingConfig;
///
/// let config = JyutpingConfig::from_toml_str("inner_segment = false\nnbest = 2\n").unwrap();
/// assert!(!config.inner_segment);
/// assert_eq!(config.base().nbest, 2);
/// ```
use libchinese_core::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct JyutpingConfig {
    /// Base decoder options (beam, n-best, caches, learning)
    #[serde(flatten)]
    pub base: Config,

    /// Also split long syllables at an inner boundary ("ngaan" -> "ng|aan").
    pub inner_segment: bool,
}

impl Default for JyutpingConfig {
    fn default() -> Self {
        Self {
            base: Config::default(),
            inner_segment: true,
        }
    }
}

impl JyutpingConfig {
    pub fn into_base(self) -> Config {
        self.base
    }

    pub fn base(&self) -> &Config {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut Config {
        &mut self.base
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load_toml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
