//! Per-run stack configuration.
//!
//! A stack build gets its environment tag, target location and any extra
//! key/value settings through [`StackConfig`]. Required settings are read
//! with [`StackConfig::require`], which fails the build before anything is
//! declared when a key is missing.

use std::collections::HashMap;

use gantry_graph::GraphError;
use thiserror::Error;

pub type StackResult<T> = Result<T, StackError>;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("Missing required config value '{0}'")]
    MissingConfig(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

/// Configuration handed to a stack builder.
#[derive(Debug, Clone)]
pub struct StackConfig {
    environment: String,
    location: String,
    values: HashMap<String, String>,
}

impl StackConfig {
    pub fn new(environment: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            location: location.into(),
            values: HashMap::new(),
        }
    }

    /// Add an extra setting (builder style).
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Environment tag, e.g. `dev` or `prod`. Woven into resource names so
    /// parallel environments never collide.
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Target location for location-bound resources.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Optional setting.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Required setting; missing keys abort the stack build.
    pub fn require(&self, key: &str) -> StackResult<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| StackError::MissingConfig(key.to_string()))
    }
}
