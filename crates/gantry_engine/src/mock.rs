//! Mock provider for testing.
//!
//! Captures all calls and returns scripted responses, allowing tests to
//! verify scheduling behavior (ordering, parallelism, blocked nodes)
//! without any real infrastructure.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use gantry_graph::Attributes;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{Provider, ProvisionRequest};

/// Captured provisioning call for verification.
#[derive(Debug, Clone)]
pub struct ProvisionCall {
    pub resource_type: String,
    pub name: String,
    pub properties: gantry_graph::ResolvedProperties,
}

/// Mock provider with scripted failures and responses.
#[derive(Clone, Default)]
pub struct MockProvider {
    /// Captured create_or_update calls, in issue order.
    calls: Arc<RwLock<Vec<ProvisionCall>>>,
    /// Logical names that should fail, with the failure message.
    failures: Arc<RwLock<HashMap<String, String>>>,
    /// Scripted attributes per logical name.
    responses: Arc<RwLock<HashMap<String, Attributes>>>,
    /// Simulated per-call latency in milliseconds.
    latency_ms: Arc<RwLock<Option<u64>>>,
}

impl MockProvider {
    /// Create a new mock provider. By default every call succeeds and
    /// echoes the request properties plus a fabricated `id` and `name`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a failure for the named resource.
    pub fn fail_on(self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.write().insert(name.into(), message.into());
        self
    }

    /// Script the attributes returned for the named resource.
    pub fn respond_with(self, name: impl Into<String>, attributes: Attributes) -> Self {
        self.responses.write().insert(name.into(), attributes);
        self
    }

    /// Add artificial latency to every call.
    pub fn with_latency(self, ms: u64) -> Self {
        *self.latency_ms.write() = Some(ms);
        self
    }

    /// All captured calls.
    pub fn calls(&self) -> Vec<ProvisionCall> {
        self.calls.read().clone()
    }

    /// Number of create_or_update calls issued.
    pub fn call_count(&self) -> usize {
        self.calls.read().len()
    }

    /// Logical names in call order.
    pub fn call_order(&self) -> Vec<String> {
        self.calls.read().iter().map(|c| c.name.clone()).collect()
    }

    /// Whether the named resource was ever provisioned.
    pub fn was_called(&self, name: &str) -> bool {
        self.calls.read().iter().any(|c| c.name == name)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn create_or_update(&self, request: &ProvisionRequest) -> ProviderResult<Attributes> {
        self.calls.write().push(ProvisionCall {
            resource_type: request.resource_type.clone(),
            name: request.name.clone(),
            properties: request.properties.clone(),
        });

        let latency = *self.latency_ms.read();
        if let Some(ms) = latency {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }

        if let Some(message) = self.failures.read().get(&request.name) {
            return Err(ProviderError::Failed(message.clone()));
        }

        if let Some(attrs) = self.responses.read().get(&request.name) {
            return Ok(attrs.clone());
        }

        let mut attrs = request.properties.clone();
        attrs.insert(
            "id".to_string(),
            Value::String(format!("mock::{}::{}", request.resource_type, request.name)),
        );
        attrs
            .entry("name".to_string())
            .or_insert_with(|| Value::String(request.name.clone()));
        Ok(attrs)
    }

    async fn delete(&self, _resource_type: &str, _id: &str) -> ProviderResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_graph::ResolvedProperties;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_echoes_properties() {
        let provider = MockProvider::new();
        let mut props = ResolvedProperties::new();
        props.insert("location".to_string(), json!("westeurope"));

        let request = ProvisionRequest::new("azure:resources:ResourceGroup", "rg", props);
        let attrs = provider.create_or_update(&request).await.unwrap();

        assert_eq!(attrs.get("location"), Some(&json!("westeurope")));
        assert_eq!(attrs.get("name"), Some(&json!("rg")));
        assert!(attrs.get("id").is_some());
    }

    #[tokio::test]
    async fn test_mock_scripted_failure() {
        let provider = MockProvider::new().fail_on("rg", "quota exceeded");
        let request = ProvisionRequest::new(
            "azure:resources:ResourceGroup",
            "rg",
            ResolvedProperties::new(),
        );
        let err = provider.create_or_update(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Failed(m) if m == "quota exceeded"));
        // The call is still recorded: the provider was attempted.
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_scripted_response() {
        let mut attrs = Attributes::new();
        attrs.insert("hex".to_string(), json!("c0de"));
        let provider = MockProvider::new().respond_with("suffix", attrs);

        let request =
            ProvisionRequest::new("random:RandomId", "suffix", ResolvedProperties::new());
        let result = provider.create_or_update(&request).await.unwrap();
        assert_eq!(result.get("hex"), Some(&json!("c0de")));
    }
}
