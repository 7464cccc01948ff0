//! End-to-end runs of the built-in stacks against local providers.

use std::sync::Arc;

use gantry_engine::{
    ApplyStatus, CompositeProvider, Executor, LocalProvider, MemoryStateStore, OutputValue,
    RandomProvider,
};
use gantry_stacks::{DataFactoryStack, IotStack, StackBuilder, StackConfig};
use serde_json::Value;

fn local_provider() -> Arc<CompositeProvider> {
    Arc::new(
        CompositeProvider::new()
            .route("random", Arc::new(RandomProvider::new()))
            .fallback(Arc::new(LocalProvider::new())),
    )
}

fn iot_config() -> StackConfig {
    StackConfig::new("dev", "westeurope").with_value("edgeVM.adminUsername", "gantry")
}

fn resolved_string(output: Option<&OutputValue>) -> String {
    match output {
        Some(OutputValue::Resolved(Value::String(s))) => s.clone(),
        other => panic!("expected resolved string output, got {:?}", other),
    }
}

#[tokio::test]
async fn test_iot_stack_applies_end_to_end() {
    let graph = IotStack.build(&iot_config()).unwrap().freeze().unwrap();
    let executor = Executor::new(local_provider(), Arc::new(MemoryStateStore::new()));

    let result = executor.apply(&graph).await.unwrap();
    assert_eq!(result.status, ApplyStatus::Succeeded);
    assert_eq!(result.provisioned(), 11);

    assert_eq!(resolved_string(result.outputs.get("adminUsername")), "gantry");
    assert_eq!(resolved_string(result.outputs.get("adminPassword")).len(), 16);

    // The FQDN carries the generated suffix and the local DNS zone.
    let fqdn = resolved_string(result.outputs.get("fqdn"));
    assert!(fqdn.starts_with("iot-edge-vm-"));
    assert!(fqdn.ends_with(".local.gantry.dev"));

    let hub = resolved_string(result.outputs.get("iotHubName"));
    assert!(hub.starts_with("iot-demo-"));
    assert!(hub.ends_with("-dev"));
}

#[tokio::test]
async fn test_iot_stack_reapply_keeps_generated_values() {
    let store = MemoryStateStore::new();

    let executor = Executor::new(local_provider(), Arc::new(store.clone()));
    let graph = IotStack.build(&iot_config()).unwrap().freeze().unwrap();
    let first = executor.apply(&graph).await.unwrap();

    let executor = Executor::new(local_provider(), Arc::new(store.clone()));
    let graph = IotStack.build(&iot_config()).unwrap().freeze().unwrap();
    let second = executor.apply(&graph).await.unwrap();

    assert_eq!(second.status, ApplyStatus::Succeeded);
    assert_eq!(second.unchanged(), second.nodes.len());
    // Generated password and suffix survive the unchanged re-apply.
    assert_eq!(
        resolved_string(first.outputs.get("adminPassword")),
        resolved_string(second.outputs.get("adminPassword"))
    );
    assert_eq!(
        resolved_string(first.outputs.get("fqdn")),
        resolved_string(second.outputs.get("fqdn"))
    );
}

#[tokio::test]
async fn test_data_factory_stack_applies_end_to_end() {
    let config = StackConfig::new("dev", "westeurope");
    let graph = DataFactoryStack.build(&config).unwrap().freeze().unwrap();
    let executor = Executor::new(local_provider(), Arc::new(MemoryStateStore::new()));

    let result = executor.apply(&graph).await.unwrap();
    assert_eq!(result.status, ApplyStatus::Succeeded);
    assert_eq!(result.provisioned(), 10);

    let account = resolved_string(result.outputs.get("storageAccountName"));
    assert!(account.starts_with("st"));
    assert!(account.ends_with("dev"));

    let key = resolved_string(result.outputs.get("primaryStorageKey"));
    assert_eq!(key.len(), 32);
}

#[tokio::test]
async fn test_environment_tag_separates_stacks() {
    let store = MemoryStateStore::new();

    for env in ["dev", "prod"] {
        let config =
            StackConfig::new(env, "westeurope").with_value("edgeVM.adminUsername", "gantry");
        let graph = IotStack.build(&config).unwrap().freeze().unwrap();
        let executor = Executor::new(local_provider(), Arc::new(store.clone()));
        let result = executor.apply(&graph).await.unwrap();
        assert_eq!(result.status, ApplyStatus::Succeeded);
    }

    assert!(store.get("iot-dev").is_some());
    assert!(store.get("iot-prod").is_some());
}
