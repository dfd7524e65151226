//! Network assembly: layer registry, graph builder, and the runnable
//! network.
//!
//! Assembly is split in two phases, mirroring the description/instantiation
//! split of the data model:
//!
//! 1. [`NetworkBuilder`] consumes parsed declarations and produces a
//!    [`NetworkPlan`], a fully wired, parameter-free DAG. Every structural
//!    error (unknown layer types, bad options, unresolved inputs, duplicate
//!    output layers) is caught here.
//! 2. [`NetworkPlan::init`] allocates the parameter tensors on a device and
//!    yields a [`Network`], which owns all parameters for its lifetime.

mod builder;
mod model;
mod registry;

pub use builder::{NetworkBuilder, NetworkPlan, NodeRef, PlannedInput, PlannedLayer};
pub use model::{ForwardMode, Network};
pub use registry::{BuildContext, LayerBuilder, LayerPlan, LayerRegistry, LayerSpec, Shape};
