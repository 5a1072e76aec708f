//! Orchestrator-owned cross-task result cache.

use chrono::{DateTime, Utc};
use educrew_core::{AgentResult, AgentRole, LastExecution, TaskId, TaskKind};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// One successful result kept under `"<kind>_results"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryEntry {
    pub task_id: TaskId,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
    pub agent_role: AgentRole,
    pub confidence: f64,
}

/// Per-kind result lists plus the `last_execution` pointer.
#[derive(Debug)]
pub struct SharedMemory {
    results: HashMap<String, VecDeque<MemoryEntry>>,
    last_execution: Option<LastExecution>,
    per_kind: usize,
}

impl SharedMemory {
    pub fn new(per_kind: usize) -> Self {
        Self {
            results: HashMap::new(),
            last_execution: None,
            per_kind,
        }
    }

    /// Record a successful execution.
    ///
    /// The result list only grows when the agent returned data; the
    /// `last_execution` pointer is always moved.
    pub fn record_success(
        &mut self,
        task_id: &TaskId,
        kind: TaskKind,
        role: AgentRole,
        result: &AgentResult,
    ) {
        let now = Utc::now();
        if !result.data.is_null() && self.per_kind > 0 {
            let entries = self.results.entry(kind.results_key()).or_default();
            entries.push_back(MemoryEntry {
                task_id: task_id.clone(),
                timestamp: now,
                payload: result.data.clone(),
                agent_role: role,
                confidence: result.confidence,
            });
            while entries.len() > self.per_kind {
                entries.pop_front();
            }
        }
        self.last_execution = Some(LastExecution {
            task_id: task_id.clone(),
            task_kind: kind,
            agent_role: role,
            timestamp: now,
            success: true,
        });
    }

    pub fn last_execution(&self) -> Option<&LastExecution> {
        self.last_execution.as_ref()
    }

    /// Results of `kind`, most recent last.
    pub fn results(&self, kind: TaskKind) -> Vec<MemoryEntry> {
        self.results
            .get(&kind.results_key())
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of populated keys, counting `last_execution`.
    pub fn size(&self) -> usize {
        self.results.len() + usize::from(self.last_execution.is_some())
    }

    pub fn set_per_kind(&mut self, per_kind: usize) {
        self.per_kind = per_kind;
        for entries in self.results.values_mut() {
            while entries.len() > per_kind {
                entries.pop_front();
            }
        }
        self.results.retain(|_, entries| !entries.is_empty());
    }

    pub fn clear(&mut self) {
        self.results.clear();
        self.last_execution = None;
    }
}
