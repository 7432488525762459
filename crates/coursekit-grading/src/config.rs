//! Grading configuration and validator factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use coursekit_core::engine::{SubmissionEngineConfig, ValidatorRegistry};
use coursekit_core::statistics::RECENT_MISTAKE_THRESHOLD;
use coursekit_core::traits::ContentStore;

use crate::gap_fill::GapFillValidator;
use crate::multiple_choice::MultipleChoiceValidator;
use crate::scoring::ScoringMode;

/// `[grading]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Point allocation for partially correct blocks.
    #[serde(default)]
    pub scoring: ScoringMode,
    /// Retries after a statistics version conflict.
    #[serde(default = "default_conflict_retries")]
    pub max_conflict_retries: u32,
    /// Delay before the first conflict retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_conflict_retries() -> u32 {
    5
}
fn default_retry_delay() -> u64 {
    10
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringMode::default(),
            max_conflict_retries: default_conflict_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

/// `[attention]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionConfig {
    /// Consecutive misses that flag a student as having recent mistakes.
    #[serde(default = "default_mistake_threshold")]
    pub recent_mistake_threshold: u32,
}

fn default_mistake_threshold() -> u32 {
    RECENT_MISTAKE_THRESHOLD
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            recent_mistake_threshold: default_mistake_threshold(),
        }
    }
}

/// Top-level coursekit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoursekitConfig {
    #[serde(default)]
    pub grading: GradingConfig,
    #[serde(default)]
    pub attention: AttentionConfig,
}

impl CoursekitConfig {
    /// Engine settings derived from the `[grading]` section.
    pub fn engine_config(&self) -> SubmissionEngineConfig {
        SubmissionEngineConfig {
            max_conflict_retries: self.grading.max_conflict_retries,
            retry_delay: Duration::from_millis(self.grading.retry_delay_ms),
            ..Default::default()
        }
    }

    /// Apply `COURSEKIT_SCORING` and `COURSEKIT_MAX_RETRIES`.
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(scoring) = std::env::var("COURSEKIT_SCORING") {
            self.grading.scoring = scoring
                .parse()
                .map_err(anyhow::Error::msg)
                .context("invalid COURSEKIT_SCORING")?;
        }
        if let Ok(retries) = std::env::var("COURSEKIT_MAX_RETRIES") {
            self.grading.max_conflict_retries = retries
                .trim()
                .parse()
                .with_context(|| format!("invalid COURSEKIT_MAX_RETRIES: {retries}"))?;
        }
        Ok(())
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `coursekit.toml` in the current directory
/// 2. `~/.config/coursekit/config.toml`
///
/// Environment variable overrides: `COURSEKIT_SCORING`, `COURSEKIT_MAX_RETRIES`.
pub fn load_config_from(path: Option<&Path>) -> Result<CoursekitConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("coursekit.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            parse_config_file(&path)?
        }
        None => CoursekitConfig::default(),
    };

    config.apply_env_overrides()?;
    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<CoursekitConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<CoursekitConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("coursekit"))
}

/// Registry with every built-in validator, reading content from `content`.
pub fn build_registry(config: &CoursekitConfig, content: Arc<dyn ContentStore>) -> ValidatorRegistry {
    let scoring = config.grading.scoring;
    ValidatorRegistry::new()
        .with(Arc::new(
            GapFillValidator::new(Arc::clone(&content)).with_scoring(scoring),
        ))
        .with(Arc::new(
            MultipleChoiceValidator::new(content).with_scoring(scoring),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursekit_core::model::ItemType;

    use crate::memory::InMemoryContentStore;

    #[test]
    fn default_config() {
        let config = CoursekitConfig::default();
        assert_eq!(config.grading.scoring, ScoringMode::Proportional);
        assert_eq!(config.grading.max_conflict_retries, 5);
        assert_eq!(config.attention.recent_mistake_threshold, 3);
        assert_eq!(config.engine_config().retry_delay, Duration::from_millis(10));
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
[grading]
scoring = "allOrNothing"

[attention]
recent_mistake_threshold = 5
"#;
        let config: CoursekitConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.grading.scoring, ScoringMode::AllOrNothing);
        assert_eq!(config.grading.max_conflict_retries, 5);
        assert_eq!(config.attention.recent_mistake_threshold, 5);
    }

    #[test]
    fn explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = load_config_from(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn explicit_path_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coursekit.toml");
        std::fs::write(&path, "[grading]\nretry_delay_ms = 25\n").unwrap();
        let config = parse_config_file(&path).unwrap();
        assert_eq!(config.grading.retry_delay_ms, 25);

        std::fs::write(&path, "[grading\n").unwrap();
        let err = parse_config_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config"));
    }

    #[test]
    fn registry_covers_gradable_types() {
        let registry = build_registry(
            &CoursekitConfig::default(),
            Arc::new(InMemoryContentStore::new()),
        );
        assert_eq!(
            registry.supported_types(),
            vec![ItemType::GapFill, ItemType::MultipleChoice]
        );
        assert!(registry.get(ItemType::Written).is_none());
    }
}
