//! Built-in provider for `random:*` resources.
//!
//! Mirrors the usual pattern of deriving resource names from a short
//! generated suffix, and of generating admin passwords at provisioning
//! time. Generated values are recorded in state like any other attribute,
//! so unchanged re-applies keep them stable.

use async_trait::async_trait;
use gantry_graph::Attributes;
use rand::Rng;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{Provider, ProvisionRequest};

const DEFAULT_SPECIAL: &str = "!@#$%&*()-_=+[]{}<>:?";

/// Provider for `random:RandomId` and `random:RandomPassword`.
#[derive(Debug, Clone, Default)]
pub struct RandomProvider;

impl RandomProvider {
    pub fn new() -> Self {
        Self
    }

    fn random_id(request: &ProvisionRequest) -> ProviderResult<Attributes> {
        let byte_length = request
            .properties
            .get("byteLength")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ProviderError::InvalidProperties(
                    "random:RandomId requires a numeric 'byteLength'".to_string(),
                )
            })?;

        let mut rng = rand::thread_rng();
        let mut hex = String::with_capacity(byte_length as usize * 2);
        for _ in 0..byte_length {
            let byte: u8 = rng.gen();
            hex.push_str(&format!("{:02x}", byte));
        }

        let mut attrs = Attributes::new();
        attrs.insert("hex".to_string(), Value::String(hex));
        attrs.insert("byteLength".to_string(), Value::from(byte_length));
        Ok(attrs)
    }

    fn random_password(request: &ProvisionRequest) -> ProviderResult<Attributes> {
        let length = request
            .properties
            .get("length")
            .and_then(Value::as_u64)
            .unwrap_or(16) as usize;
        let special = request
            .properties
            .get("special")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let special_chars = request
            .properties
            .get("overrideSpecial")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SPECIAL);

        let mut charset: Vec<char> = ('a'..='z').chain('A'..='Z').chain('0'..='9').collect();
        if special {
            charset.extend(special_chars.chars());
        }
        if charset.is_empty() {
            return Err(ProviderError::InvalidProperties(
                "password charset is empty".to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        let password: String = (0..length)
            .map(|_| charset[rng.gen_range(0..charset.len())])
            .collect();

        let mut attrs = Attributes::new();
        attrs.insert("result".to_string(), Value::String(password));
        attrs.insert("length".to_string(), Value::from(length as u64));
        Ok(attrs)
    }
}

#[async_trait]
impl Provider for RandomProvider {
    async fn create_or_update(&self, request: &ProvisionRequest) -> ProviderResult<Attributes> {
        match request.resource_type.as_str() {
            "random:RandomId" => Self::random_id(request),
            "random:RandomPassword" => Self::random_password(request),
            other => Err(ProviderError::Unsupported(other.to_string())),
        }
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

    fn props(pairs: &[(&str, Value)]) -> ResolvedProperties {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_random_id_hex_length() {
        let provider = RandomProvider::new();
        let request = ProvisionRequest::new(
            "random:RandomId",
            "suffix",
            props(&[("byteLength", json!(2))]),
        );
        let attrs = provider.create_or_update(&request).await.unwrap();
        let hex = attrs.get("hex").and_then(Value::as_str).unwrap();
        assert_eq!(hex.len(), 4);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_random_id_requires_byte_length() {
        let provider = RandomProvider::new();
        let request =
            ProvisionRequest::new("random:RandomId", "suffix", ResolvedProperties::new());
        let err = provider.create_or_update(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidProperties(_)));
    }

    #[tokio::test]
    async fn test_random_password_respects_length_and_charset() {
        let provider = RandomProvider::new();
        let request = ProvisionRequest::new(
            "random:RandomPassword",
            "admin-password",
            props(&[
                ("length", json!(16)),
                ("special", json!(true)),
                ("overrideSpecial", json!("_%@")),
            ]),
        );
        let attrs = provider.create_or_update(&request).await.unwrap();
        let password = attrs.get("result").and_then(Value::as_str).unwrap();
        assert_eq!(password.len(), 16);
        assert!(password
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_%@".contains(c)));
    }

    #[tokio::test]
    async fn test_unknown_random_type() {
        let provider = RandomProvider::new();
        let request =
            ProvisionRequest::new("random:RandomPet", "pet", ResolvedProperties::new());
        let err = provider.create_or_update(&request).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
    }
}
