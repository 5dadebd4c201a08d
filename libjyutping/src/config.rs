use serde::{Deserialize, Serialize};

use crate::normalizer::Normalizer;

/// Jyutping-specific configuration that extends the base `Config` from core.
///
/// This configuration includes:
/// - All generic limits from `jyutping_core::Config` (flattened via serde)
/// - Keyboard arrangement and tone-shortcut options read by the normalizer
/// - The application version the dictionary cache is stamped with
///
/// # Example
///
/// ```rust
/// use libjyutping::JyutpingConfig;
///
/// let config = JyutpingConfig::from_toml_str("arrangement = 2\nshortcut_limit = 20\n").unwrap();
/// assert_eq!(config.arrangement, 2);
/// assert_eq!(config.base().shortcut_limit, 20);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct JyutpingConfig {
    /// Base limits and ranking options
    #[serde(flatten)]
    pub base: jyutping_core::Config,

    /// Keyboard arrangement; values above 1 disable tone shortcuts.
    pub arrangement: u8,

    /// v/x/q (and doubled) typed after a syllable stand for tones.
    pub tone_shortcuts: bool,

    /// Stamped into the dictionary cache; a mismatch forces a rebuild.
    pub app_version: String,
}

impl Default for JyutpingConfig {
    fn default() -> Self {
        Self {
            base: jyutping_core::Config::default(),
            arrangement: 1,
            tone_shortcuts: true,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl JyutpingConfig {
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Convert into the base config consumed by `Engine`.
    pub fn into_base(self) -> jyutping_core::Config {
        self.base
    }

    pub fn base(&self) -> &jyutping_core::Config {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut jyutping_core::Config {
        &mut self.base
    }

    /// The keystroke normalizer these options describe.
    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.arrangement, self.tone_shortcuts)
    }
}
