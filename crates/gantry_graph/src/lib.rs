//! # gantry_graph
//!
//! Declarative resource graph model for gantry.
//!
//! This crate holds the pure-data half of the engine: resource nodes,
//! property bags with deferred output references, the graph builder, and
//! structural validation. Nothing in this crate talks to a provider;
//! side effects live in `gantry_engine`.
//!
//! # Architecture
//!
//! - **Nodes**: declared resources with a type, logical name and properties
//! - **References**: single-assignment cells resolved after provisioning
//! - **Graph**: builder with duplicate-name and cycle validation
//! - **Freeze**: the type boundary between building and applying
//!
//! # Example
//!
//! ```rust
//! use gantry_graph::{PropertyBag, ResourceGraph};
//!
//! let mut graph = ResourceGraph::new("demo");
//! let group = graph
//!     .declare(
//!         "azure:resources:ResourceGroup",
//!         "rg-demo",
//!         PropertyBag::new().set("location", "westeurope"),
//!     )
//!     .unwrap();
//! graph
//!     .declare(
//!         "azure:storage:StorageAccount",
//!         "storage",
//!         PropertyBag::new().set("resourceGroupName", group.output("name")),
//!     )
//!     .unwrap();
//! let frozen = graph.freeze().unwrap();
//! assert_eq!(frozen.len(), 2);
//! ```

pub mod error;
pub mod graph;
pub mod node;
pub mod reference;
pub mod value;

// Re-export main types for convenience
pub use error::{GraphError, GraphResult};
pub use graph::{Export, FrozenGraph, ResourceGraph, ResourceHandle};
pub use node::{NodeId, ResourceNode, ResourceState};
pub use reference::{
    Attributes, OutputCell, OutputReference, ResolutionTable, ResolvedProperties,
};
pub use value::{PropertyBag, PropertyValue, Template, TemplatePart};
