//! # Educrew
//!
//! Task dispatch and agent coordination for adaptive children's learning
//! apps. A crew of five specialist agents (learning coach, motivation
//! specialist, analytics expert, language specialist and memory keeper)
//! shares one rate-limited client to a text-generation upstream. An
//! orchestrator picks the best agent for each task and keeps a bounded
//! history and a shared result memory that later tasks can observe.
//!
//! ## Crates
//!
//! - [`core`]: tasks, payloads, roles, results, the [`Agent`] trait, errors
//! - [`responder`]: the upstream boundary and the retrying client
//! - [`agent`]: specialists, registry, orchestrator and configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use educrew::{CrewConfig, Orchestrator, Task, TaskPayload, TaskKind};
//! use educrew::core::InMemoryProfileStore;
//! use educrew::responder::{OfflineResponder, RateLimitedClient, RetryPolicy};
//! use std::sync::Arc;
//!
//! # async fn run() -> educrew::CrewResult<()> {
//! let client = Arc::new(RateLimitedClient::new(
//!     Arc::new(OfflineResponder),
//!     RetryPolicy::default(),
//! ));
//! let crew = Orchestrator::standard(
//!     client,
//!     Arc::new(InMemoryProfileStore::new()),
//!     CrewConfig::default(),
//! )?;
//!
//! let outcomes = crew
//!     .orchestrate_workflow(vec![
//!         Task::new(TaskPayload::default_for(TaskKind::GenerateHint)),
//!         Task::new(TaskPayload::default_for(TaskKind::CreateCelebration)),
//!     ])
//!     .await?;
//! assert_eq!(outcomes.len(), 2);
//! # Ok(())
//! # }
//! ```

pub use educrew_agent as agent;
pub use educrew_core as core;
pub use educrew_responder as responder;

pub use educrew_agent::{CrewConfig, ExecutionOutcome, FallbackStrategy, Orchestrator};
pub use educrew_core::{
    Agent, AgentResult, AgentRole, CrewError, CrewResult, Priority, Task, TaskKind, TaskPayload,
};
