//! Stack builder registry.

use std::collections::HashMap;
use std::sync::Arc;

use gantry_graph::ResourceGraph;
use tracing::debug;

use crate::config::{StackConfig, StackResult};
use crate::data_factory::DataFactoryStack;
use crate::iot::IotStack;

/// A named, buildable stack definition.
pub trait StackBuilder: Send + Sync {
    /// Registry key, e.g. `iot`.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Declare the stack's resources and exports into a fresh graph.
    fn build(&self, config: &StackConfig) -> StackResult<ResourceGraph>;
}

/// Registry of available stack builders, keyed by name.
#[derive(Default)]
pub struct StackRegistry {
    builders: HashMap<String, Arc<dyn StackBuilder>>,
}

impl StackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in demo stacks.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(IotStack));
        registry.register(Arc::new(DataFactoryStack));
        registry
    }

    pub fn register(&mut self, builder: Arc<dyn StackBuilder>) {
        debug!("Registering stack builder '{}'", builder.name());
        self.builders.insert(builder.name().to_string(), builder);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StackBuilder>> {
        self.builders.get(name).cloned()
    }

    /// Registered names, sorted for stable listings.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.builders.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = StackRegistry::builtin();
        assert_eq!(registry.names(), vec!["data-factory", "iot"]);
        assert!(registry.get("iot").is_some());
        assert!(registry.get("unknown").is_none());
    }
}
