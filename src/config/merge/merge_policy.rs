//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Later sources override earlier ones key by key; tables merge rather than replace.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("gate.accept_threshold", 80)?
        .set_default("gate.max_revisions", 3)?
        .set_default("batch.context_window_chars", 4000)?
        .set_default("router.max_steps_per_turn", 16)?
        .set_default("checkpoint.backend", "sled")?
        .set_default("checkpoint.path", ".stagehand/checkpoints")?
        .set_default("invocation.timeout_secs", 120)
}
