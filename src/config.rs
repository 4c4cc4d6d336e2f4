//! Search compiler configuration

use crate::error::{SearchError, SearchResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "SEARCH_BRIDGE_CONFIG";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "SEARCH_BRIDGE";

/// Configuration shared by the compiler, the facet planner and the normalizer
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_page_sizes"))]
pub struct SearchConfig {
    /// Number of hits returned when the request does not set a limit
    #[validate(range(min = 1))]
    pub default_page_size: usize,

    /// Upper bound applied to every requested limit
    #[validate(range(min = 1))]
    pub max_page_size: usize,

    /// Facet page size when neither the facet nor the request sets one
    #[validate(range(min = 1))]
    pub default_facet_limit: usize,

    /// Hard ceiling for a terms aggregation size
    #[validate(range(min = 1))]
    pub max_facet_size: usize,

    /// Minimum bucket count for the legacy engine when the request sets none
    pub default_facet_min_count: u32,

    /// Free-text term meaning "match everything"; overrides all filters
    #[validate(length(min = 1))]
    pub match_all_sentinel: String,

    /// Separator between the two bounds of a range value
    #[validate(length(min = 1))]
    pub range_separator: String,

    /// Bound token meaning "unbounded"
    #[validate(length(min = 1))]
    pub range_wildcard: String,

    /// Prefix marking a negated filter value
    #[validate(length(min = 1))]
    pub negation_prefix: String,

    /// Name prefix of the terms aggregation nested in a multi-select filter aggregation
    #[validate(length(min = 1))]
    pub filtered_aggregation_prefix: String,

    /// Suffix appended to a mapped field to get its autocomplete field
    pub autocomplete_suffix: String,

    /// Completion suggestions returned when the caller sets no limit
    #[validate(range(min = 1))]
    pub default_suggest_limit: usize,

    /// Ask the backend for exact hit totals
    pub track_total_hits: bool,

    /// Timeout applied around the backend call
    #[validate(range(min = 1))]
    pub execution_timeout_ms: u64,

    /// Highlighting settings
    #[validate(nested)]
    pub highlight: HighlightConfig,
}

/// Highlighting settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HighlightConfig {
    /// Marker inserted before a highlighted term
    #[validate(length(min = 1))]
    pub pre_tag: String,

    /// Marker inserted after a highlighted term
    #[validate(length(min = 1))]
    pub post_tag: String,

    /// Fragments per field; 0 returns the whole field value
    pub number_of_fragments: usize,

    /// Snippets per field requested from the legacy engine
    pub snippets: usize,

    /// Snippet size in characters for the legacy engine; 0 means whole value
    pub fragment_size: usize,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            pre_tag: "<em class=\"searchHl\">".to_string(),
            post_tag: "</em>".to_string(),
            number_of_fragments: 0,
            snippets: 10,
            fragment_size: 0,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 1000,
            default_facet_limit: 10,
            max_facet_size: 1_200_000,
            default_facet_min_count: 1,
            match_all_sentinel: "*".to_string(),
            range_separator: ",".to_string(),
            range_wildcard: "*".to_string(),
            negation_prefix: "!".to_string(),
            filtered_aggregation_prefix: "filtered_".to_string(),
            autocomplete_suffix: "Autocomplete".to_string(),
            default_suggest_limit: 10,
            track_total_hits: true,
            execution_timeout_ms: 30_000,
            highlight: HighlightConfig::default(),
        }
    }
}

fn validate_page_sizes(config: &SearchConfig) -> Result<(), ValidationError> {
    if config.default_page_size > config.max_page_size {
        return Err(ValidationError::new(
            "default_page_size must not exceed max_page_size",
        ));
    }
    Ok(())
}

impl SearchConfig {
    /// Load configuration from the embedded defaults, an optional file and the environment
    pub fn load() -> SearchResult<Self> {
        let mut builder = Self::defaults_source();

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(config::File::with_name(&path).required(false));
        }

        let config: SearchConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validated()
    }

    /// Load configuration from a TOML file layered over the embedded defaults
    pub fn load_from(path: impl AsRef<Path>) -> SearchResult<Self> {
        let config: SearchConfig = Self::defaults_source()
            .add_source(
                config::File::from(path.as_ref())
                    .format(config::FileFormat::Toml)
                    .required(true),
            )
            .build()?
            .try_deserialize()?;

        config.validated()
    }

    fn defaults_source() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder().add_source(config::File::from_str(
            include_str!("../config/default.toml"),
            config::FileFormat::Toml,
        ))
    }

    /// Validate and return the configuration
    pub fn validated(self) -> SearchResult<Self> {
        self.validate()?;
        if self.range_separator == self.negation_prefix {
            return Err(SearchError::Configuration(
                "range_separator and negation_prefix must differ".to_string(),
            ));
        }
        Ok(self)
    }

    /// Timeout applied around the backend call
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    /// Effective page size for a requested limit
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }
}

/// Builder for SearchConfig
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SearchConfig::default(),
        }
    }

    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size;
        self
    }

    pub fn max_page_size(mut self, size: usize) -> Self {
        self.config.max_page_size = size;
        self
    }

    pub fn default_facet_limit(mut self, limit: usize) -> Self {
        self.config.default_facet_limit = limit;
        self
    }

    pub fn max_facet_size(mut self, size: usize) -> Self {
        self.config.max_facet_size = size;
        self
    }

    pub fn default_facet_min_count(mut self, count: u32) -> Self {
        self.config.default_facet_min_count = count;
        self
    }

    pub fn match_all_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.config.match_all_sentinel = sentinel.into();
        self
    }

    pub fn range_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.range_separator = separator.into();
        self
    }

    pub fn range_wildcard(mut self, wildcard: impl Into<String>) -> Self {
        self.config.range_wildcard = wildcard.into();
        self
    }

    pub fn negation_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.negation_prefix = prefix.into();
        self
    }

    pub fn autocomplete_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.autocomplete_suffix = suffix.into();
        self
    }

    pub fn track_total_hits(mut self, enabled: bool) -> Self {
        self.config.track_total_hits = enabled;
        self
    }

    pub fn execution_timeout_ms(mut self, millis: u64) -> Self {
        self.config.execution_timeout_ms = millis;
        self
    }

    pub fn highlight_tags(mut self, pre: impl Into<String>, post: impl Into<String>) -> Self {
        self.config.highlight.pre_tag = pre.into();
        self.config.highlight.post_tag = post.into();
        self
    }

    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SearchConfig::default();
        assert_eq!(config.max_page_size, 1000);
        assert_eq!(config.max_facet_size, 1_200_000);
        assert_eq!(config.match_all_sentinel, "*");
        assert!(config.clone().validated().is_ok());
    }

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let loaded: SearchConfig = SearchConfig::defaults_source()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let default = SearchConfig::default();

        assert_eq!(loaded.default_page_size, default.default_page_size);
        assert_eq!(loaded.max_facet_size, default.max_facet_size);
        assert_eq!(loaded.highlight.pre_tag, default.highlight.pre_tag);
        assert_eq!(loaded.filtered_aggregation_prefix, "filtered_");
    }

    #[test]
    fn test_page_size_is_capped() {
        let config = SearchConfigBuilder::new().max_page_size(50).build();
        assert_eq!(config.page_size(Some(500)), 50);
        assert_eq!(config.page_size(Some(5)), 5);
        assert_eq!(config.page_size(None), 20);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SearchConfigBuilder::new()
            .default_page_size(200)
            .max_page_size(100)
            .build();
        assert!(matches!(
            config.validated(),
            Err(SearchError::Configuration(_))
        ));

        let config = SearchConfigBuilder::new().max_facet_size(0).build();
        assert!(config.validated().is_err());

        let config = SearchConfigBuilder::new()
            .range_separator("!")
            .negation_prefix("!")
            .build();
        assert!(config.validated().is_err());
    }
}
