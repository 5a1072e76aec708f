//! # Educrew Agent
//!
//! The crew itself: five specialist agents, the registry that picks one per
//! task, and the [`Orchestrator`] that runs tasks one at a time, as a
//! workflow, or as a concurrent batch.
//!
//! ```rust,no_run
//! use educrew_agent::{CrewConfig, Orchestrator};
//! use educrew_core::InMemoryProfileStore;
//! use educrew_responder::{OfflineResponder, RateLimitedClient, RetryPolicy};
//! use std::sync::Arc;
//!
//! # async fn demo() -> educrew_core::CrewResult<()> {
//! let client = Arc::new(RateLimitedClient::new(
//!     Arc::new(OfflineResponder),
//!     RetryPolicy::default(),
//! ));
//! let crew = Orchestrator::standard(
//!     client,
//!     Arc::new(InMemoryProfileStore::new()),
//!     CrewConfig::default(),
//! )?;
//! let task = educrew_core::Task::new(educrew_core::TaskPayload::default_for(
//!     educrew_core::TaskKind::GenerateHint,
//! ));
//! let outcome = crew.execute(task).await?;
//! println!("{}", outcome.result.reasoning);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod history;
pub mod orchestration;
pub mod registry;
pub mod shared_memory;
pub mod specialists;
pub mod stats;

pub use config::{CrewConfig, FallbackStrategy};
pub use history::{TaskExecutionRecord, TaskHistory};
pub use orchestration::{AgentSummary, ExecutionOutcome, Orchestrator};
pub use registry::AgentRegistry;
pub use shared_memory::{MemoryEntry, SharedMemory};
pub use specialists::{Playbook, Specialist};
pub use stats::{AgentStats, CrewStats};
