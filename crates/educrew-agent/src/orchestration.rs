//! # Orchestrator
//!
//! Runs tasks against the crew. For each task the orchestrator:
//!
//! 1. picks an agent through the [`AgentRegistry`], scored on [`TaskHistory`]
//! 2. hands the agent an enriched copy of the task carrying the last
//!    execution pointer and the most recent history records
//! 3. races the agent against the task timeout; the agent keeps running in
//!    the background when it loses
//! 4. finalizes the history record and, on success, updates
//!    [`SharedMemory`] and queues a low-priority memory update for the
//!    memory keeper
//!
//! Failures never surface as errors under [`FallbackStrategy::Graceful`]:
//! the caller receives an [`ExecutionOutcome`] with `success == false` and
//! the error text in the result's reasoning.
//!
//! History and shared memory sit behind plain mutexes that are never held
//! across an await. Two tasks running concurrently may both score agents
//! before either records its start, so selection is eventually consistent.

use chrono::Utc;
use educrew_core::{
    Agent, AgentResult, AgentRole, CrewError, CrewResult, EnrichedTask, ExecutionNote,
    LastExecution, MemoryRequest, Priority, ProfileStore, SharedContext, Task, TaskId, TaskKind,
    TaskPayload,
};
use educrew_responder::RateLimitedClient;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{CrewConfig, FallbackStrategy};
use crate::history::TaskHistory;
use crate::registry::AgentRegistry;
use crate::shared_memory::{MemoryEntry, SharedMemory};
use crate::stats::CrewStats;

/// Emit a per-task lifecycle event at `info` when verbose, `debug` otherwise.
macro_rules! lifecycle {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+)
        } else {
            debug!($($arg)+)
        }
    };
}

const ANONYMOUS_CHILD: &str = "anonymous";
const CREW_INTERACTION: &str = "crew_orchestration";

/// What the caller gets back for one task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    pub task_id: TaskId,
    pub task_kind: TaskKind,
    /// `None` when no agent could be selected.
    pub agent_role: Option<AgentRole>,
    pub result: AgentResult,
    pub execution_time_ms: u64,
    pub success: bool,
    /// Error text when the task failed outside the agent's own logic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl ExecutionOutcome {
    fn failed(
        task_id: TaskId,
        task_kind: TaskKind,
        agent_role: Option<AgentRole>,
        err: &CrewError,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            task_id,
            task_kind,
            agent_role,
            result: AgentResult::failure(format!("Task failed: {}", err)),
            execution_time_ms,
            success: false,
            error: Some(err.to_string()),
            error_code: Some(err.error_code()),
        }
    }
}

/// A registered agent as shown to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub role: AgentRole,
    pub goal: String,
    pub capabilities: BTreeSet<TaskKind>,
}

/// Coordinates the crew. Construct one per crew and share it by reference or
/// `Arc`.
#[derive(Debug)]
pub struct Orchestrator {
    registry: AgentRegistry,
    config: RwLock<CrewConfig>,
    history: Mutex<TaskHistory>,
    memory: Mutex<SharedMemory>,
}

impl Orchestrator {
    /// # Errors
    ///
    /// Returns `CrewError::Config` when `config` fails validation.
    pub fn new(registry: AgentRegistry, config: CrewConfig) -> CrewResult<Self> {
        config.validate()?;
        Ok(Self {
            history: Mutex::new(TaskHistory::new(config.history_capacity)),
            memory: Mutex::new(SharedMemory::new(config.memory_results_per_kind)),
            config: RwLock::new(config),
            registry,
        })
    }

    /// The five standard specialists sharing `client`.
    pub fn standard(
        client: Arc<RateLimitedClient>,
        profiles: Arc<dyn ProfileStore>,
        config: CrewConfig,
    ) -> CrewResult<Self> {
        Self::new(AgentRegistry::standard(client, profiles)?, config)
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Execute one task.
    ///
    /// # Errors
    ///
    /// Only under [`FallbackStrategy::Strict`]: `NoSuitableAgent` when no
    /// agent declares the task kind, `TaskTimeout` when the agent overran,
    /// and `AgentInternalError` when it failed or panicked.
    pub async fn execute(&self, task: Task) -> CrewResult<ExecutionOutcome> {
        let config = self.config();
        match self.dispatch(task, &config).await {
            (outcome, Some(err)) => settle(&config, outcome, err),
            (outcome, None) => Ok(outcome),
        }
    }

    /// Runs one task to a full outcome. The error, if any, is returned
    /// alongside so the caller decides whether it propagates.
    async fn dispatch(
        &self,
        task: Task,
        config: &CrewConfig,
    ) -> (ExecutionOutcome, Option<CrewError>) {
        let task_id = TaskId::generate();
        let kind = task.kind();
        let started = Instant::now();

        let selected = self.registry.select(
            kind,
            &task.required_tools,
            &self.history(),
            config.selection_threshold,
        );
        let agent = match selected {
            Ok(agent) => agent,
            Err(err) => {
                warn!(task_id = %task_id, task_kind = %kind, error = %err, "Agent selection failed");
                let outcome = ExecutionOutcome::failed(task_id, kind, None, &err, 0);
                return (outcome, Some(err));
            }
        };
        let role = agent.role();

        let enriched = self.enrich(task_id.clone(), task.clone(), config);
        self.history().start(task_id.clone(), role, kind);
        lifecycle!(
            config.verbose,
            task_id = %task_id,
            task_kind = %kind,
            agent = %role,
            "Task dispatched"
        );

        let outcome = run_agent(agent, enriched, config.task_timeout()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                let success = result.success;
                let execution_time_ms = self
                    .history()
                    .complete(&task_id, success, Some(result.clone()))
                    .unwrap_or(elapsed_ms);
                if success {
                    self.memory().record_success(&task_id, kind, role, &result);
                    if config.enable_memory && kind != TaskKind::UpdateMemory {
                        self.queue_memory_update(&task, &task_id, role, &result);
                    }
                }
                lifecycle!(
                    config.verbose,
                    task_id = %task_id,
                    agent = %role,
                    success,
                    confidence = result.confidence,
                    execution_time_ms,
                    "Task completed"
                );
                let outcome = ExecutionOutcome {
                    task_id,
                    task_kind: kind,
                    agent_role: Some(role),
                    result,
                    execution_time_ms,
                    success,
                    error: None,
                    error_code: None,
                };
                (outcome, None)
            }
            Err(err) => {
                let execution_time_ms = self
                    .history()
                    .complete(&task_id, false, None)
                    .unwrap_or(elapsed_ms);
                error!(
                    task_id = %task_id,
                    agent = %role,
                    error = %err,
                    code = err.error_code(),
                    "Task failed"
                );
                let outcome =
                    ExecutionOutcome::failed(task_id, kind, Some(role), &err, execution_time_ms);
                (outcome, Some(err))
            }
        }
    }

    /// Execute tasks one after another, each observing the previous ones.
    ///
    /// At most `max_iterations` tasks run. A failed `High` priority task ends
    /// the workflow early; the outcomes produced so far are returned.
    ///
    /// # Errors
    ///
    /// Propagates the first error under [`FallbackStrategy::Strict`].
    pub async fn orchestrate_workflow(&self, tasks: Vec<Task>) -> CrewResult<Vec<ExecutionOutcome>> {
        let max_iterations = self.config().max_iterations;
        if tasks.len() > max_iterations {
            warn!(
                requested = tasks.len(),
                max_iterations, "Workflow truncated to max_iterations"
            );
        }

        let mut outcomes = Vec::with_capacity(tasks.len().min(max_iterations));
        for task in tasks.into_iter().take(max_iterations) {
            let priority = task.priority;
            let outcome = self.execute(task).await?;
            let halt = !outcome.success && priority == Priority::High;
            outcomes.push(outcome);
            if halt {
                warn!(
                    completed = outcomes.len(),
                    "High priority task failed, stopping workflow"
                );
                break;
            }
        }
        Ok(outcomes)
    }

    /// Execute all tasks concurrently. Outcome `i` belongs to `tasks[i]`.
    ///
    /// Errors are turned into failed outcomes regardless of the fallback
    /// strategy; one failure never cancels its siblings.
    pub async fn execute_parallel(&self, tasks: Vec<Task>) -> Vec<ExecutionOutcome> {
        let config = self.config();
        join_all(tasks.into_iter().map(|task| self.dispatch(task, &config)))
            .await
            .into_iter()
            .map(|(outcome, _)| outcome)
            .collect()
    }

    pub fn stats(&self) -> CrewStats {
        let memory_size = self.memory().size();
        CrewStats::compute(&self.history(), memory_size)
    }

    pub fn available_agents(&self) -> Vec<AgentSummary> {
        self.registry
            .agents()
            .iter()
            .map(|agent| {
                let descriptor = agent.descriptor();
                AgentSummary {
                    role: descriptor.role,
                    goal: descriptor.goal.clone(),
                    capabilities: descriptor.capabilities.clone(),
                }
            })
            .collect()
    }

    /// Forget all history and shared memory.
    pub fn clear_history(&self) {
        self.history().clear();
        self.memory().clear();
        info!("Crew history and shared memory cleared");
    }

    /// Change the configuration in place.
    ///
    /// # Errors
    ///
    /// Returns `CrewError::Config` and keeps the old configuration when the
    /// result fails validation.
    pub fn update_config(&self, update: impl FnOnce(&mut CrewConfig)) -> CrewResult<()> {
        let mut next = self.config();
        update(&mut next);
        next.validate()?;

        self.history().set_capacity(next.history_capacity);
        self.memory().set_per_kind(next.memory_results_per_kind);
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = next;
        info!("Crew configuration updated");
        Ok(())
    }

    pub fn config(&self) -> CrewConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_execution(&self) -> Option<LastExecution> {
        self.memory().last_execution().cloned()
    }

    /// Successful results of `kind`, most recent last.
    pub fn memory_results(&self, kind: TaskKind) -> Vec<MemoryEntry> {
        self.memory().results(kind)
    }

    fn history(&self) -> MutexGuard<'_, TaskHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn memory(&self) -> MutexGuard<'_, SharedMemory> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enrich(&self, task_id: TaskId, task: Task, config: &CrewConfig) -> EnrichedTask {
        let last_execution = self.memory().last_execution().cloned();
        let recent_executions = self.history().recent(config.context_recent_executions);
        EnrichedTask {
            task_id,
            task,
            shared_context: SharedContext {
                last_execution,
                recent_executions,
                enriched_at: Utc::now(),
            },
        }
    }

    /// Hand the memory keeper a note about a successful execution. Runs
    /// detached; its outcome is only logged.
    fn queue_memory_update(
        &self,
        task: &Task,
        task_id: &TaskId,
        role: AgentRole,
        result: &AgentResult,
    ) {
        let Some(keeper) = self.registry.first_capable(TaskKind::UpdateMemory) else {
            debug!(task_id = %task_id, "No memory keeper registered, skipping memory update");
            return;
        };
        let keeper = Arc::clone(keeper);

        let request = MemoryRequest {
            child_id: task
                .payload
                .child_id()
                .unwrap_or(ANONYMOUS_CHILD)
                .to_string(),
            interaction_type: CREW_INTERACTION.to_string(),
            execution: Some(ExecutionNote {
                task_id: task_id.clone(),
                task_kind: task.kind(),
                agent_role: role,
                success: result.success,
                confidence: result.confidence,
                data: result.data.clone(),
            }),
            ..Default::default()
        };
        let memory_task = Task::new(TaskPayload::UpdateMemory(request))
            .with_priority(Priority::Low)
            .with_description(format!("Record {} in long-term memory", task.kind()));
        let source = task_id.clone();

        tokio::spawn(async move {
            match keeper.process(EnrichedTask::standalone(memory_task)).await {
                Ok(result) if result.success => {
                    debug!(source_task = %source, "Memory update recorded");
                }
                Ok(result) => {
                    warn!(source_task = %source, reasoning = %result.reasoning, "Memory update rejected");
                }
                Err(err) => {
                    warn!(source_task = %source, error = %err, "Memory update failed");
                }
            }
        });
    }
}

/// Run the agent on its own task so it can outlive a timeout.
async fn run_agent(
    agent: Arc<dyn Agent>,
    task: EnrichedTask,
    timeout: Duration,
) -> CrewResult<AgentResult> {
    let task_id = task.task_id.to_string();
    let handle = tokio::spawn(async move { agent.process(task).await });

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result.map_err(as_agent_failure),
        Ok(Err(join_err)) if join_err.is_panic() => Err(CrewError::AgentInternalError(
            "agent panicked while processing the task".to_string(),
        )),
        Ok(Err(join_err)) => Err(CrewError::AgentInternalError(join_err.to_string())),
        Err(_) => Err(CrewError::TaskTimeout {
            task_id,
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Errors an agent has no business raising are reported as internal.
fn as_agent_failure(err: CrewError) -> CrewError {
    match err {
        CrewError::NoSuitableAgent { .. }
        | CrewError::InvalidRegistry(_)
        | CrewError::ProfileStore(_)
        | CrewError::Config(_) => CrewError::AgentInternalError(err.to_string()),
        other => other,
    }
}

/// Apply the fallback strategy to a failure.
fn settle(
    config: &CrewConfig,
    outcome: ExecutionOutcome,
    err: CrewError,
) -> CrewResult<ExecutionOutcome> {
    match config.fallback_strategy {
        FallbackStrategy::Graceful => Ok(outcome),
        FallbackStrategy::Strict => Err(err),
    }
}
