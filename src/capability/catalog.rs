//! Built-in content studio catalog.

use crate::capability::descriptor::{CapabilityCategory, CapabilityDescriptor};
use crate::capability::id::CapabilityId;

/// Descriptors for every recognized capability.
pub fn default_descriptors() -> Vec<CapabilityDescriptor> {
    vec![
        CapabilityDescriptor::new(
            CapabilityId::Supervisor,
            "Supervisor",
            "Decides which capability acts next and decomposes larger requests into workflows",
            CapabilityCategory::Planning,
        )
        .with_tags(["routing", "planning"])
        .with_inputs(["user_message", "session_summary"])
        .with_outputs(["workflow_plan"]),
        CapabilityDescriptor::new(
            CapabilityId::Ideation,
            "Ideation",
            "Brainstorms premises, hooks and story concepts from a loose brief",
            CapabilityCategory::Creative,
        )
        .with_tags(["brainstorm", "concept"])
        .with_inputs(["brief"])
        .with_outputs(["ideas"]),
        CapabilityDescriptor::new(
            CapabilityId::WorldBuilding,
            "World building",
            "Develops settings, locations, factions and rules of the story world",
            CapabilityCategory::Creative,
        )
        .with_tags(["setting", "lore"])
        .with_inputs(["ideas", "brief"])
        .with_outputs(["world"]),
        CapabilityDescriptor::new(
            CapabilityId::CharacterDesign,
            "Character design",
            "Creates characters with goals, arcs and relationships",
            CapabilityCategory::Creative,
        )
        .with_tags(["characters", "cast"])
        .with_inputs(["ideas", "world"])
        .with_outputs(["characters"]),
        CapabilityDescriptor::new(
            CapabilityId::Outline,
            "Outline",
            "Produces a chapter-by-chapter outline from the selected concept, world and cast",
            CapabilityCategory::Writing,
        )
        .with_tags(["structure", "long_form"])
        .with_inputs(["ideas", "world", "characters"])
        .with_outputs(["outline"]),
        CapabilityDescriptor::new(
            CapabilityId::Drafting,
            "Drafting",
            "Writes chapter prose following the outline",
            CapabilityCategory::Writing,
        )
        .with_tags(["prose", "long_form"])
        .with_inputs(["outline", "characters"])
        .with_outputs(["draft"]),
        CapabilityDescriptor::new(
            CapabilityId::Reviewer,
            "Reviewer",
            "Scores an artifact against weighted quality categories and lists issues",
            CapabilityCategory::Quality,
        )
        .with_tags(["review", "quality"])
        .with_inputs(["draft"])
        .with_outputs(["quality_report"]),
        CapabilityDescriptor::new(
            CapabilityId::Refiner,
            "Refiner",
            "Revises an artifact to address the issues in a quality report",
            CapabilityCategory::Quality,
        )
        .with_tags(["revision", "quality"])
        .with_inputs(["draft", "quality_report"])
        .with_outputs(["draft"]),
        CapabilityDescriptor::new(
            CapabilityId::Summarizer,
            "Summarizer",
            "Condenses artifacts into synopses and indexes",
            CapabilityCategory::Utility,
        )
        .with_tags(["summary"])
        .with_inputs(["draft"])
        .with_outputs(["summary"]),
    ]
}
