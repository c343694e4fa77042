//! Capability domain: identifiers, descriptors, the registry and the invocation seam.
//! The registry is built once at startup and shared by handle; nothing here is global.

pub mod catalog;
pub mod descriptor;
pub mod id;
pub mod invoke;
pub mod registry;

pub use catalog::default_descriptors;
pub use descriptor::{CapabilityCategory, CapabilityDescriptor};
pub use id::{CapabilityId, RouteTarget};
pub use invoke::{with_timeout, CapabilityInvoker};
pub use registry::CapabilityRegistry;
