use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for document chunking behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Separators to split on; the earliest match in the remaining text wins
    pub separators: Vec<String>,

    /// What happens to the separator that ends a chunk
    pub separator_placement: SeparatorPlacement,

    /// Hard cap on chunk length in grapheme clusters
    pub max_chunk_chars: Option<usize>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            separators: vec![". \n".to_string()],
            separator_placement: SeparatorPlacement::End,
            max_chunk_chars: None,
        }
    }
}

impl ChunkerConfig {
    /// Split after sentence terminators followed by whitespace
    pub fn sentences() -> Self {
        Self {
            separators: vec![
                ". ".to_string(),
                "! ".to_string(),
                "? ".to_string(),
                ".\n".to_string(),
            ],
            ..Default::default()
        }
    }

    /// Split on blank lines, dropping the blank line itself
    pub fn paragraphs() -> Self {
        Self {
            separators: vec!["\n\n".to_string()],
            separator_placement: SeparatorPlacement::Discard,
            max_chunk_chars: None,
        }
    }

    /// Builder: replace the separator list
    #[must_use]
    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set separator placement
    #[must_use]
    pub const fn with_placement(mut self, placement: SeparatorPlacement) -> Self {
        self.separator_placement = placement;
        self
    }

    /// Builder: set the grapheme cap
    #[must_use]
    pub const fn with_max_chunk_chars(mut self, max: usize) -> Self {
        self.max_chunk_chars = Some(max);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.separators.is_empty() {
            return Err(ChunkerError::invalid_config(
                "at least one separator is required",
            ));
        }

        if self.separators.iter().any(String::is_empty) {
            return Err(ChunkerError::invalid_config(
                "separators must not be empty strings",
            ));
        }

        if self.max_chunk_chars == Some(0) {
            return Err(ChunkerError::invalid_config("max_chunk_chars must be > 0"));
        }

        Ok(())
    }
}

/// Where a matched separator ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeparatorPlacement {
    /// Separator closes the chunk it terminates
    #[default]
    End,

    /// Separator opens the chunk that follows it
    Start,

    /// Separator is consumed and recorded on the preceding chunk
    Discard,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.separators, vec![". \n".to_string()]);
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(ChunkerConfig::sentences().validate().is_ok());
        assert!(ChunkerConfig::paragraphs().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let config = ChunkerConfig::default().with_separators(Vec::<String>::new());
        assert!(config.validate().is_err());

        let config = ChunkerConfig::default().with_separators(["", "."]);
        assert!(config.validate().is_err());

        let config = ChunkerConfig::default().with_max_chunk_chars(0);
        assert!(config.validate().is_err());

        let config = ChunkerConfig::default()
            .with_separators(["\n"])
            .with_placement(SeparatorPlacement::Start)
            .with_max_chunk_chars(64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_serialized_form() {
        let config: ChunkerConfig =
            serde_json::from_str(r#"{"separators":["\n\n"]}"#).expect("valid config json");
        assert_eq!(config.separator_placement, SeparatorPlacement::End);
        assert_eq!(config.max_chunk_chars, None);
    }
}
