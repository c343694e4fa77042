//! Capability descriptors: declared contract of a capability.

use crate::capability::id::CapabilityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Catalog grouping used when rendering the registry for the decision-making capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityCategory {
    Planning,
    Creative,
    Writing,
    Quality,
    Utility,
}

impl CapabilityCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityCategory::Planning => "Planning",
            CapabilityCategory::Creative => "Creative",
            CapabilityCategory::Writing => "Writing",
            CapabilityCategory::Quality => "Quality",
            CapabilityCategory::Utility => "Utility",
        }
    }
}

impl fmt::Display for CapabilityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique identifier (registry key)
    pub id: CapabilityId,
    /// Short human-readable label
    pub label: String,
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Session-state fields the capability reads
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Session-state fields the capability writes
    #[serde(default)]
    pub outputs: Vec<String>,
    pub category: CapabilityCategory,
}

impl CapabilityDescriptor {
    pub fn new(
        id: CapabilityId,
        label: impl Into<String>,
        description: impl Into<String>,
        category: CapabilityCategory,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            description: description.into(),
            tags: BTreeSet::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            category,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(inputs.into_iter().map(Into::into));
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.extend(outputs.into_iter().map(Into::into));
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// First declared output field, where a dispatched capability stores its result
    pub fn primary_output(&self) -> Option<&str> {
        self.outputs.first().map(String::as_str)
    }
}
