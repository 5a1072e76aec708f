//! # Educrew Core
//!
//! Core traits and types for the Educrew agent crew: tasks and their typed
//! payloads, agent roles, results, the [`Agent`] contract and the error
//! taxonomy shared by every other crate.

pub mod agent;
pub mod env;
pub mod error;
pub mod identifiers;
pub mod payload;
pub mod profile;
pub mod result;
pub mod role;
pub mod task;

pub use agent::Agent;
pub use env::{ConfigError, EnvLookup, ProcessEnv};
pub use error::{CrewError, CrewResult};
pub use identifiers::TaskId;
pub use payload::{
    ActivityRequest, CelebrationRequest, DifficultyRequest, ExecutionNote, FeedbackRequest,
    HintRequest, Interaction, MemoryRequest, MilestoneInput, PerformanceRequest, SessionData,
};
pub use profile::{InMemoryProfileStore, ProfileStore};
pub use result::{AgentResult, EnrichedTask, LastExecution, RecentExecution, SharedContext};
pub use role::{AgentDescriptor, AgentRole};
pub use task::{Language, Priority, Task, TaskKind, TaskPayload, ToolName};
