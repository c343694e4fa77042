//! Capability registry: in-memory catalog of available capabilities.

use crate::capability::catalog::default_descriptors;
use crate::capability::descriptor::{CapabilityCategory, CapabilityDescriptor};
use crate::capability::id::CapabilityId;
use crate::error::OrchestrationError;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::debug;

/// Capability registry
///
/// Built once at process start and shared read-only (usually behind an `Arc`) by the
/// router, the validator and the continuation engine. Re-registration is meant for
/// administrative setup and tests.
#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: BTreeMap<CapabilityId, CapabilityDescriptor>,
}

impl CapabilityRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in content studio catalog
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for descriptor in default_descriptors() {
            // Built-in descriptors only use recognized ids.
            let _ = registry.register(descriptor);
        }
        registry
    }

    /// Register a capability, replacing any descriptor with the same id.
    ///
    /// Returns the replaced descriptor. Unrecognized ids are refused.
    pub fn register(
        &mut self,
        descriptor: CapabilityDescriptor,
    ) -> Result<Option<CapabilityDescriptor>, OrchestrationError> {
        if !descriptor.id.is_recognized() {
            return Err(OrchestrationError::UnknownCapability(
                descriptor.id.as_str().to_string(),
            ));
        }
        debug!(capability = %descriptor.id, "Registering capability");
        Ok(self.capabilities.insert(descriptor.id.clone(), descriptor))
    }

    /// Get a capability descriptor by id
    pub fn get(&self, id: &CapabilityId) -> Option<&CapabilityDescriptor> {
        self.capabilities.get(id)
    }

    /// Get a capability descriptor by free-text name
    pub fn get_by_name(&self, name: &str) -> Option<&CapabilityDescriptor> {
        self.get(&CapabilityId::parse(name))
    }

    pub fn contains(&self, id: &CapabilityId) -> bool {
        self.capabilities.contains_key(id)
    }

    /// All registered capabilities in id order
    pub fn list(&self) -> Vec<&CapabilityDescriptor> {
        self.capabilities.values().collect()
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<&CapabilityDescriptor> {
        self.capabilities
            .values()
            .filter(|descriptor| descriptor.has_tag(tag))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Render the catalog, grouped by category, for the decision-making instruction
    pub fn describe_for_prompt(&self) -> String {
        let mut grouped: BTreeMap<CapabilityCategory, Vec<&CapabilityDescriptor>> =
            BTreeMap::new();
        for descriptor in self.capabilities.values() {
            grouped.entry(descriptor.category).or_default().push(descriptor);
        }

        let mut out = String::new();
        for (category, descriptors) in grouped {
            let _ = writeln!(out, "## {}", category);
            for descriptor in descriptors {
                let _ = writeln!(
                    out,
                    "- {} ({}): {}",
                    descriptor.id, descriptor.label, descriptor.description
                );
                if !descriptor.tags.is_empty() {
                    let tags: Vec<&str> = descriptor.tags.iter().map(String::as_str).collect();
                    let _ = writeln!(out, "  tags: {}", tags.join(", "));
                }
                let _ = writeln!(out, "  inputs: {}", join_or_none(&descriptor.inputs));
                let _ = writeln!(out, "  outputs: {}", join_or_none(&descriptor.outputs));
            }
            out.push('\n');
        }
        out.trim_end().to_string()
    }
}

fn join_or_none(fields: &[String]) -> String {
    if fields.is_empty() {
        "(none)".to_string()
    } else {
        fields.join(", ")
    }
}
