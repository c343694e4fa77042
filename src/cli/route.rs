//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::capability::{CapabilityId, CapabilityInvoker, CapabilityRegistry};
use crate::checkpoint::{CheckpointStore, MemoryCheckpointStore, SledCheckpointStore};
use crate::cli::help::{command_name, needs_provider};
use crate::cli::parse::{Commands, ConfigCommands, SessionCommands};
use crate::cli::presentation::{
    format_batch_outcome, format_catalog, format_config_validation, format_gate_outcome,
    format_plan_validation, format_session, format_session_list, format_turn_report,
};
use crate::batch::BatchSpec;
use crate::config::{CheckpointBackend, ConfigLoader, StagehandConfig};
use crate::error::{CapabilityError, OrchestrationError, StorageError};
use crate::orchestrator::{Collaborators, SessionOrchestrator, TurnInput};
use crate::provider::ProviderInvoker;
use crate::router::Decision;
use crate::workflow::WorkflowValidator;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, Instrument};

/// Stands in for a model provider when none is configured
struct UnconfiguredInvoker;

#[async_trait]
impl CapabilityInvoker for UnconfiguredInvoker {
    async fn invoke(
        &self,
        capability: &CapabilityId,
        _instruction: &str,
    ) -> Result<String, CapabilityError> {
        Err(CapabilityError::Rejected(format!(
            "no model provider configured for '{}'; add a [provider] section",
            capability
        )))
    }
}

/// Runtime context for CLI execution: workspace, loaded config, registry and checkpoint store.
pub struct RunContext {
    workspace_root: PathBuf,
    config: StagehandConfig,
    registry: Arc<CapabilityRegistry>,
    store: Arc<dyn CheckpointStore>,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    ///
    /// The loaded configuration must pass validation.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, OrchestrationError> {
        let config = ConfigLoader::load_with_override(&workspace_root, config_path.as_deref())?;
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            OrchestrationError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Self::with_config(workspace_root, config)
    }

    /// Create run context without validating, for commands that inspect the configuration.
    pub fn unvalidated(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
    ) -> Result<Self, OrchestrationError> {
        let config = ConfigLoader::load_with_override(&workspace_root, config_path.as_deref())?;
        Self::with_config(workspace_root, config)
    }

    fn with_config(workspace_root: PathBuf, config: StagehandConfig) -> Result<Self, OrchestrationError> {

        let store: Arc<dyn CheckpointStore> = match config.checkpoint.backend {
            CheckpointBackend::Memory => Arc::new(MemoryCheckpointStore::new()),
            CheckpointBackend::Sled => {
                let path = workspace_root.join(&config.checkpoint.path);
                std::fs::create_dir_all(&path).map_err(StorageError::IoError)?;
                Arc::new(SledCheckpointStore::open(&path)?)
            }
        };

        Ok(Self {
            workspace_root,
            config,
            registry: Arc::new(CapabilityRegistry::with_defaults()),
            store,
        })
    }

    pub fn config(&self) -> &StagehandConfig {
        &self.config
    }

    fn invoker(&self) -> Result<Arc<dyn CapabilityInvoker>, OrchestrationError> {
        match &self.config.provider {
            Some(provider) => {
                let client = provider.build_client()?;
                Ok(Arc::new(ProviderInvoker::new(
                    Arc::new(client),
                    self.registry.clone(),
                    provider.completion_options(),
                    Duration::from_secs(self.config.invocation.timeout_secs),
                )))
            }
            None => Ok(Arc::new(UnconfiguredInvoker)),
        }
    }

    fn orchestrator(&self) -> Result<SessionOrchestrator, OrchestrationError> {
        let collaborators =
            Collaborators::from_invoker(self.registry.clone(), self.invoker()?, self.store.clone());
        Ok(SessionOrchestrator::new(
            self.registry.clone(),
            collaborators,
            &self.config,
        ))
    }

    /// Execute a command and return its rendered output.
    pub async fn execute(&self, command: &Commands) -> Result<String, OrchestrationError> {
        let started = Instant::now();
        let name = command_name(command);
        let span = info_span!("command", name = %name);
        let result = self.execute_inner(command).instrument(span).await;
        info!(
            command = %name,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    async fn execute_inner(&self, command: &Commands) -> Result<String, OrchestrationError> {
        if needs_provider(command) && self.config.provider.is_none() {
            tracing::warn!("No provider configured; capability calls will fail");
        }
        match command {
            Commands::Catalog { format } => format_catalog(&self.registry, format),
            Commands::Validate { plan } => self.handle_validate(plan),
            Commands::Turn {
                session,
                target,
                message,
            } => {
                let input = TurnInput {
                    utterance: message.clone(),
                    target: target.as_deref().map(CapabilityId::parse),
                };
                if let Some(CapabilityId::Unrecognized(raw)) = &input.target {
                    return Err(OrchestrationError::UnknownCapability(raw.clone()));
                }
                let report = self.orchestrator()?.run_turn(session, input).await?;
                Ok(format_turn_report(&report))
            }
            Commands::Review { session, field } => {
                let outcome = self.orchestrator()?.review_artifact(session, field).await?;
                Ok(format_gate_outcome(&outcome))
            }
            Commands::Generate {
                session,
                kind,
                brief,
                units,
                batches,
                field,
            } => {
                let spec = BatchSpec {
                    kind: kind.clone(),
                    brief: brief.clone(),
                    total_units: *units,
                    total_batches: *batches,
                };
                let field = field.clone().unwrap_or_else(|| kind.replace(' ', "_"));
                let outcome = self
                    .orchestrator()?
                    .generate_in_batches(session, &spec, &field)
                    .await?;
                Ok(format_batch_outcome(&outcome))
            }
            Commands::Session { command } => self.handle_session_command(command).await,
            Commands::Config { command } => self.handle_config_command(command),
        }
    }

    fn handle_validate(&self, plan_path: &Path) -> Result<String, OrchestrationError> {
        let path = if plan_path.is_absolute() {
            plan_path.to_path_buf()
        } else {
            self.workspace_root.join(plan_path)
        };
        let text = std::fs::read_to_string(&path).map_err(StorageError::IoError)?;
        let plan = match Decision::parse(&text) {
            Decision::Multi(multi) => multi.into_plan(),
            Decision::Single(_) => {
                return Err(OrchestrationError::InvalidWorkflow(
                    "file holds a single-step decision, not a plan".to_string(),
                ))
            }
            Decision::Unparsable(reason) => {
                return Err(OrchestrationError::MalformedDecision(reason))
            }
        };
        let result = WorkflowValidator::new(&self.registry).validate(&plan);
        Ok(format_plan_validation(&plan, &result))
    }

    async fn handle_session_command(
        &self,
        command: &SessionCommands,
    ) -> Result<String, OrchestrationError> {
        match command {
            SessionCommands::List => {
                let ids = self.store.list_sessions().await?;
                Ok(format_session_list(&ids))
            }
            SessionCommands::Show { session, format } => match self.store.load(session).await? {
                Some(state) => format_session(&state, format),
                None => Ok(format!("No session '{}'", session)),
            },
            SessionCommands::Clear { session } => {
                self.store.delete(session).await?;
                Ok(format!("Cleared session '{}'", session))
            }
        }
    }

    fn handle_config_command(&self, command: &ConfigCommands) -> Result<String, OrchestrationError> {
        match command {
            ConfigCommands::Show => toml::to_string_pretty(&self.config)
                .map_err(|e| OrchestrationError::ConfigError(e.to_string())),
            ConfigCommands::Validate => {
                let errors = match self.config.validate() {
                    Ok(()) => Vec::new(),
                    Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
                };
                Ok(format_config_validation(&errors))
            }
        }
    }
}
