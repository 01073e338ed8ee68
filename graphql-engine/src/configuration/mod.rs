//! Logic for loading configuration in to an object model
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use schemars::JsonSchema;
use schemars::r#gen::SchemaSettings;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigurationError;

fn default_parallel_siblings() -> bool {
    true
}

fn default_recursion_limit() -> usize {
    crate::spec::DEFAULT_RECURSION_LIMIT
}

/// The configuration of the engine.
///
/// Every field has a default, an empty document is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Execution of operations
    pub execution: Execution,
}

/// Configuration options pertaining to operation execution.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Execution {
    /// Run sibling fields concurrently. Root fields of mutations always run one after the other.
    /// default: true
    #[serde(default = "default_parallel_siblings")]
    pub parallel_siblings: bool,

    /// Time a single resolver may take, in human-readable format (e.g. `5s`).
    /// No limit if not specified.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "Option<String>")]
    pub resolver_timeout: Option<Duration>,

    /// Recursion limit of the parser, for schema and query documents.
    /// default: 500
    #[serde(default = "default_recursion_limit")]
    pub recursion_limit: usize,
}

impl Default for Execution {
    fn default() -> Self {
        Self {
            parallel_siblings: default_parallel_siblings(),
            resolver_timeout: None,
            recursion_limit: default_recursion_limit(),
        }
    }
}

#[buildstructor::buildstructor]
impl Execution {
    #[builder(visibility = "pub")]
    fn new(
        parallel_siblings: Option<bool>,
        resolver_timeout: Option<Duration>,
        recursion_limit: Option<usize>,
    ) -> Self {
        Self {
            parallel_siblings: parallel_siblings.unwrap_or_else(default_parallel_siblings),
            resolver_timeout,
            recursion_limit: recursion_limit.unwrap_or_else(default_recursion_limit),
        }
    }
}

impl Configuration {
    pub fn new(execution: Execution) -> Self {
        Self { execution }
    }

    /// Load a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let configuration: Configuration = content.parse()?;
        tracing::debug!(path = %path.display(), ?configuration, "configuration loaded");
        Ok(configuration)
    }

    /// Generate a JSON schema for the configuration.
    pub fn json_schema() -> RootSchema {
        let settings = SchemaSettings::draft07().with(|s| {
            s.option_nullable = true;
            s.option_add_null_type = false;
            s.inline_subschemas = true;
        });
        settings.into_generator().into_root_schema_for::<Configuration>()
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // serde_yaml reads an empty document as null
        if s.trim().is_empty() {
            return Ok(Configuration::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }
}
