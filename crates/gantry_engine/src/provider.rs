//! Provider seam: the external collaborator that actually mutates
//! infrastructure.
//!
//! The engine treats a provider as an opaque remote call. Retries, if any,
//! belong to the provider; the engine only records success or failure and
//! propagates the consequences through the graph.

use std::sync::Arc;

use async_trait::async_trait;
use gantry_graph::{Attributes, ResolvedProperties};

use crate::error::{ProviderError, ProviderResult};

/// A fully resolved provisioning request for a single resource.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// Provider type string, e.g. `azure:storage:StorageAccount`.
    pub resource_type: String,
    /// Logical name of the resource within its stack.
    pub name: String,
    /// Desired properties with every reference resolved.
    pub properties: ResolvedProperties,
}

impl ProvisionRequest {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        properties: ResolvedProperties,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            properties,
        }
    }

    /// Namespace prefix of the resource type (text before the first `:`).
    pub fn namespace(&self) -> &str {
        namespace_of(&self.resource_type)
    }
}

/// Trait for provider implementations.
///
/// # Thread Safety
///
/// Providers must be `Send + Sync`: independent subtrees of the graph are
/// provisioned concurrently against the same provider instance.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Create the resource, or update it in place if it already exists.
    /// Returns the provisioned resource's attributes.
    async fn create_or_update(&self, request: &ProvisionRequest) -> ProviderResult<Attributes>;

    /// Delete a previously provisioned resource.
    async fn delete(&self, resource_type: &str, id: &str) -> ProviderResult<()>;
}

/// Routes requests to providers by resource-type namespace.
///
/// A stack typically mixes namespaces (`random:*` suffixes next to
/// `azure:*` resources); the composite keeps that routing out of the
/// executor.
#[derive(Default)]
pub struct CompositeProvider {
    routes: Vec<(String, Arc<dyn Provider>)>,
    fallback: Option<Arc<dyn Provider>>,
}

impl CompositeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route a namespace prefix to a provider.
    pub fn route(mut self, namespace: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.routes.push((namespace.into(), provider));
        self
    }

    /// Provider used when no route matches.
    pub fn fallback(mut self, provider: Arc<dyn Provider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    fn provider_for(&self, resource_type: &str) -> ProviderResult<&Arc<dyn Provider>> {
        let namespace = namespace_of(resource_type);
        self.routes
            .iter()
            .find(|(prefix, _)| prefix == namespace)
            .map(|(_, provider)| provider)
            .or(self.fallback.as_ref())
            .ok_or_else(|| ProviderError::Unsupported(resource_type.to_string()))
    }
}

#[async_trait]
impl Provider for CompositeProvider {
    async fn create_or_update(&self, request: &ProvisionRequest) -> ProviderResult<Attributes> {
        self.provider_for(&request.resource_type)?
            .create_or_update(request)
            .await
    }

    async fn delete(&self, resource_type: &str, id: &str) -> ProviderResult<()> {
        self.provider_for(resource_type)?
            .delete(resource_type, id)
            .await
    }
}

fn namespace_of(resource_type: &str) -> &str {
    resource_type.split(':').next().unwrap_or(resource_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProvider;

    #[tokio::test]
    async fn test_composite_routes_by_namespace() {
        let random = MockProvider::new();
        let azure = MockProvider::new();
        let composite = CompositeProvider::new()
            .route("random", Arc::new(random.clone()))
            .fallback(Arc::new(azure.clone()));

        let request = ProvisionRequest::new(
            "random:RandomId",
            "suffix",
            ResolvedProperties::new(),
        );
        composite.create_or_update(&request).await.unwrap();
        assert_eq!(random.call_count(), 1);
        assert_eq!(azure.call_count(), 0);

        let request = ProvisionRequest::new(
            "azure:resources:ResourceGroup",
            "rg",
            ResolvedProperties::new(),
        );
        composite.create_or_update(&request).await.unwrap();
        assert_eq!(azure.call_count(), 1);
    }

    #[tokio::test]
    async fn test_composite_without_route_is_unsupported() {
        let composite = CompositeProvider::new();
        let request =
            ProvisionRequest::new("aws:s3:Bucket", "bucket", ResolvedProperties::new());
        let err = composite.create_or_update(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
    }
}
