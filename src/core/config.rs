use crate::core::error::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_CACHED_PIPELINES: usize = 256;

/// What `register` does when the name is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationPolicy {
    /// Fail with `DuplicateName` and leave the existing entry untouched.
    #[default]
    Strict,
    /// Swap the entry atomically.
    Replace,
}

/// Catalog settings, usually supplied by the bootstrap layer.
///
/// ```rust
/// use fncatalog::prelude::*;
///
/// let config = CatalogConfig::from_json_str(r#"{ "policy": "replace" }"#).unwrap();
/// assert_eq!(config.policy, RegistrationPolicy::Replace);
/// assert!(config.composition_cache);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub policy: RegistrationPolicy,
    /// Cache derived pipelines by composed key.
    pub composition_cache: bool,
    /// Upper bound on cached pipelines; the oldest is dropped first.
    pub max_cached_pipelines: usize,
    /// Output content type used when a message carries no `accept` header.
    pub default_accept: Option<String>,
    /// Name or composed key that an empty lookup resolves to.
    pub default_definition: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            policy: RegistrationPolicy::Strict,
            composition_cache: true,
            max_cached_pipelines: DEFAULT_MAX_CACHED_PIPELINES,
            default_accept: None,
            default_definition: None,
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_policy(mut self, policy: RegistrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_composition_cache(mut self, enabled: bool) -> Self {
        self.composition_cache = enabled;
        self
    }

    pub fn with_max_cached_pipelines(mut self, max: usize) -> Self {
        self.max_cached_pipelines = max;
        self
    }

    pub fn with_default_accept(mut self, content_type: impl Into<String>) -> Self {
        self.default_accept = Some(content_type.into());
        self
    }

    pub fn with_default_definition(mut self, definition: impl Into<String>) -> Self {
        self.default_definition = Some(definition.into());
        self
    }
}
