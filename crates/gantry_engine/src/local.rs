//! Local stand-in provider.
//!
//! Fabricates deterministic attributes so stacks can be planned and applied
//! end to end without a cloud account. Attributes echo the resolved
//! properties and add the identifiers a real provider would assign; a few
//! resource types get extra synthesized attributes (storage keys, public IP
//! addresses) that downstream resources and exports consume.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use gantry_graph::Attributes;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderResult;
use crate::provider::{Provider, ProvisionRequest};

const LOCAL_DNS_ZONE: &str = "local.gantry.dev";

/// Deterministic simulation provider.
#[derive(Debug, Clone, Default)]
pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }

    fn fingerprint(request: &ProvisionRequest) -> u64 {
        let mut hasher = DefaultHasher::new();
        request.resource_type.hash(&mut hasher);
        request.name.hash(&mut hasher);
        hasher.finish()
    }
}

#[async_trait]
impl Provider for LocalProvider {
    async fn create_or_update(&self, request: &ProvisionRequest) -> ProviderResult<Attributes> {
        let mut attrs = request.properties.clone();
        attrs.insert(
            "id".to_string(),
            Value::String(format!(
                "local::{}::{}",
                request.resource_type, request.name
            )),
        );
        attrs
            .entry("name".to_string())
            .or_insert_with(|| Value::String(request.name.clone()));

        let seed = Self::fingerprint(request);
        match request.resource_type.as_str() {
            "azure:storage:StorageAccount" => {
                attrs.insert(
                    "primaryKey".to_string(),
                    Value::String(format!("{:016x}{:016x}", seed, seed.rotate_left(17))),
                );
            }
            "azure:network:PublicIPAddress" => {
                let bytes = seed.to_be_bytes();
                attrs.insert(
                    "ipAddress".to_string(),
                    Value::String(format!("10.{}.{}.{}", bytes[0], bytes[1], bytes[2].max(1))),
                );
                let label = request
                    .properties
                    .get("dnsSettings")
                    .and_then(|v| v.get("domainNameLabel"))
                    .and_then(Value::as_str);
                if let Some(label) = label {
                    attrs.insert(
                        "fqdn".to_string(),
                        Value::String(format!("{}.{}", label, LOCAL_DNS_ZONE)),
                    );
                }
            }
            _ => {}
        }

        debug!(
            "Locally provisioned {} ({})",
            request.name, request.resource_type
        );
        Ok(attrs)
    }

    async fn delete(&self, resource_type: &str, id: &str) -> ProviderResult<()> {
        debug!("Locally deleted {} ({})", id, resource_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_graph::ResolvedProperties;
    use serde_json::json;

    #[tokio::test]
    async fn test_local_attributes_are_deterministic() {
        let provider = LocalProvider::new();
        let mut props = ResolvedProperties::new();
        props.insert("name".to_string(), json!("rg-iot-c0de-dev"));

        let request =
            ProvisionRequest::new("azure:resources:ResourceGroup", "rg-iot", props.clone());
        let first = provider.create_or_update(&request).await.unwrap();
        let second = provider.create_or_update(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.get("name"), Some(&json!("rg-iot-c0de-dev")));
        assert_eq!(
            first.get("id"),
            Some(&json!("local::azure:resources:ResourceGroup::rg-iot"))
        );
    }

    #[tokio::test]
    async fn test_storage_account_gets_primary_key() {
        let provider = LocalProvider::new();
        let request = ProvisionRequest::new(
            "azure:storage:StorageAccount",
            "storage",
            ResolvedProperties::new(),
        );
        let attrs = provider.create_or_update(&request).await.unwrap();
        let key = attrs.get("primaryKey").and_then(Value::as_str).unwrap();
        assert_eq!(key.len(), 32);
    }

    #[tokio::test]
    async fn test_public_ip_gets_address_and_fqdn() {
        let provider = LocalProvider::new();
        let mut props = ResolvedProperties::new();
        props.insert(
            "dnsSettings".to_string(),
            json!({ "domainNameLabel": "iot-edge-vm-c0de" }),
        );
        let request =
            ProvisionRequest::new("azure:network:PublicIPAddress", "iot-edge-vm", props);
        let attrs = provider.create_or_update(&request).await.unwrap();

        assert!(attrs.get("ipAddress").is_some());
        assert_eq!(
            attrs.get("fqdn"),
            Some(&json!("iot-edge-vm-c0de.local.gantry.dev"))
        );
    }
}
