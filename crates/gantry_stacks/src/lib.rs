//! Built-in demo stacks.
//!
//! Each stack is a [`StackBuilder`] that declares its resources into a
//! [`gantry_graph::ResourceGraph`] from a [`StackConfig`]. The CLI looks
//! builders up by name through the [`StackRegistry`].

pub mod config;
pub mod data_factory;
pub mod iot;
pub mod registry;

pub use config::{StackConfig, StackError, StackResult};
pub use data_factory::DataFactoryStack;
pub use iot::IotStack;
pub use registry::{StackBuilder, StackRegistry};
