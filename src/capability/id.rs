//! Capability identifiers: the closed set of capabilities the platform knows how to run.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Identifier of a capability.
///
/// Free text coming back from the decision-making capability is mapped through
/// [`CapabilityId::parse`], which is total: anything it does not recognize becomes
/// [`CapabilityId::Unrecognized`]. The registry refuses to hold unrecognized ids, so that
/// variant only ever appears at the decision-parsing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CapabilityId {
    /// Decision-making capability consulted by the router
    Supervisor,
    Ideation,
    WorldBuilding,
    CharacterDesign,
    Outline,
    Drafting,
    Reviewer,
    Refiner,
    Summarizer,
    Unrecognized(String),
}

impl CapabilityId {
    /// All recognized capability ids, in catalog order.
    pub fn known() -> [CapabilityId; 9] {
        [
            CapabilityId::Supervisor,
            CapabilityId::Ideation,
            CapabilityId::WorldBuilding,
            CapabilityId::CharacterDesign,
            CapabilityId::Outline,
            CapabilityId::Drafting,
            CapabilityId::Reviewer,
            CapabilityId::Refiner,
            CapabilityId::Summarizer,
        ]
    }

    /// Map free text onto a capability id.
    ///
    /// Case, surrounding whitespace, `-` and spaces are folded before matching, and a small
    /// set of aliases is accepted.
    pub fn parse(raw: &str) -> Self {
        let normalized = normalize(raw);
        match normalized.as_str() {
            "supervisor" | "planner" | "router" => CapabilityId::Supervisor,
            "ideation" | "brainstorm" | "brainstormer" => CapabilityId::Ideation,
            "world_building" | "worldbuilding" | "world_builder" => CapabilityId::WorldBuilding,
            "character_design" | "characters" | "character_designer" => {
                CapabilityId::CharacterDesign
            }
            "outline" | "outliner" | "plot_outline" => CapabilityId::Outline,
            "drafting" | "drafter" | "writer" | "chapter_writer" => CapabilityId::Drafting,
            "reviewer" | "review" | "critic" => CapabilityId::Reviewer,
            "refiner" | "refine" | "reviser" => CapabilityId::Refiner,
            "summarizer" | "summary" | "summarise" | "summarize" => CapabilityId::Summarizer,
            _ => CapabilityId::Unrecognized(raw.trim().to_string()),
        }
    }

    /// Canonical name
    pub fn as_str(&self) -> &str {
        match self {
            CapabilityId::Supervisor => "supervisor",
            CapabilityId::Ideation => "ideation",
            CapabilityId::WorldBuilding => "world_building",
            CapabilityId::CharacterDesign => "character_design",
            CapabilityId::Outline => "outline",
            CapabilityId::Drafting => "drafting",
            CapabilityId::Reviewer => "reviewer",
            CapabilityId::Refiner => "refiner",
            CapabilityId::Summarizer => "summarizer",
            CapabilityId::Unrecognized(raw) => raw.as_str(),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, CapabilityId::Unrecognized(_))
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CapabilityId::parse(s))
    }
}

impl From<String> for CapabilityId {
    fn from(value: String) -> Self {
        CapabilityId::parse(&value)
    }
}

impl From<&str> for CapabilityId {
    fn from(value: &str) -> Self {
        CapabilityId::parse(value)
    }
}

impl From<CapabilityId> for String {
    fn from(value: CapabilityId) -> Self {
        value.as_str().to_string()
    }
}

/// Where the router sends the turn next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "capability", rename_all = "snake_case")]
pub enum RouteTarget {
    Capability(CapabilityId),
    /// Terminal target: the turn ends without dispatching anything.
    End,
}

impl RouteTarget {
    /// Parse a target name from a decision payload. Terminal spellings map to `End`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "end" | "finish" | "done" | "__end__" | "none" => RouteTarget::End,
            _ => RouteTarget::Capability(CapabilityId::parse(raw)),
        }
    }

    pub fn capability(&self) -> Option<&CapabilityId> {
        match self {
            RouteTarget::Capability(id) => Some(id),
            RouteTarget::End => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, RouteTarget::End)
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Capability(id) => write!(f, "{}", id),
            RouteTarget::End => f.write_str("end"),
        }
    }
}
