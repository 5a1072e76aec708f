//! # Mock Agent
//!
//! An [`Agent`] with a configurable outcome. Clones share the record of the
//! tasks they received.

use async_trait::async_trait;
use educrew_core::{Agent, AgentDescriptor, AgentResult, CrewError, CrewResult, EnrichedTask};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behavior {
    Echo,
    Result(AgentResult),
    Error(CrewError),
    Panic,
}

/// Agent that returns a fixed outcome and records every task it processes.
#[derive(Debug, Clone)]
pub struct MockAgent {
    descriptor: AgentDescriptor,
    behavior: Behavior,
    delay: Option<Duration>,
    received: Arc<Mutex<Vec<EnrichedTask>>>,
}

impl MockAgent {
    /// Succeed with `{ "role", "task_kind" }` data and full confidence.
    pub fn new(descriptor: AgentDescriptor) -> Self {
        Self {
            descriptor,
            behavior: Behavior::Echo,
            delay: None,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return `result` for every task.
    pub fn with_result(mut self, result: AgentResult) -> Self {
        self.behavior = Behavior::Result(result);
        self
    }

    /// Return a failed result with the given reasoning.
    pub fn failing(self, reasoning: impl Into<String>) -> Self {
        self.with_result(AgentResult::failure(reasoning))
    }

    /// Return `Err(err)` from `process`.
    pub fn erroring(mut self, err: CrewError) -> Self {
        self.behavior = Behavior::Error(err);
        self
    }

    /// Panic inside `process`.
    pub fn panicking(mut self) -> Self {
        self.behavior = Behavior::Panic;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Tasks received so far, in arrival order.
    pub fn received(&self) -> Vec<EnrichedTask> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn process(&self, task: EnrichedTask) -> CrewResult<AgentResult> {
        let kind = task.kind();
        self.received.lock().unwrap().push(task);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.behavior {
            Behavior::Echo => Ok(AgentResult::success(
                json!({ "role": self.descriptor.role, "task_kind": kind }),
                "mock",
                1.0,
            )),
            Behavior::Result(result) => Ok(result.clone()),
            Behavior::Error(err) => Err(err.clone()),
            Behavior::Panic => panic!("mock agent {} panicked", self.descriptor.role),
        }
    }
}
