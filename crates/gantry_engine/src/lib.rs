//! Planning and execution engine for resource graphs.
//!
//! Takes a frozen graph from `gantry_graph` and drives it to completion:
//! diff against prior state, provision in dependency order with maximal
//! parallelism, cascade failures into blocked descendants, and persist the
//! posterior snapshot with the stack's outputs.
//!
//! Providers and state stores are trait objects so the engine stays
//! independent of any concrete backend; `LocalProvider`, `RandomProvider`
//! and `MockProvider` ship in-crate.

pub mod error;
pub mod executor;
pub mod local;
pub mod mock;
pub mod planner;
pub mod provider;
pub mod random;
pub mod state;

pub use error::{EngineError, EngineResult, ProviderError, ProviderResult};
pub use executor::{ApplyResult, ApplyStatus, CancelFlag, Executor, NodeOutcome};
pub use local::LocalProvider;
pub use mock::{MockProvider, ProvisionCall};
pub use planner::{diff_action, preview, Action, PlannedStep, StackPlan, COMPUTED};
pub use provider::{CompositeProvider, Provider, ProvisionRequest};
pub use random::RandomProvider;
pub use state::{
    read_state_file, FileStateStore, MemoryStateStore, OutputValue, ResourceRecord, StackState,
    StateStore,
};
