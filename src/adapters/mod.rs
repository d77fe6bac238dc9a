//! Concrete implementations of the store and registry ports.

pub mod registry;
pub mod store;

pub use registry::{HttpRegistry, InMemoryRegistry};
pub use store::{Dataset, JsonStore};
