//! Bounded execution log used for performance scoring.

use chrono::{DateTime, Utc};
use educrew_core::{AgentResult, AgentRole, RecentExecution, TaskId, TaskKind};
use std::collections::VecDeque;
use tokio::time::Instant;
use tracing::debug;

/// One dispatched task.
#[derive(Debug, Clone)]
pub struct TaskExecutionRecord {
    pub task_id: TaskId,
    pub agent_role: AgentRole,
    pub task_kind: TaskKind,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock time spent inside the agent, set on completion.
    pub duration_ms: Option<u64>,
    pub success: bool,
    pub result: Option<AgentResult>,
    started: Instant,
}

impl TaskExecutionRecord {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    fn as_recent(&self) -> RecentExecution {
        RecentExecution {
            task_id: self.task_id.clone(),
            task_kind: self.task_kind,
            agent_role: self.agent_role,
            started_at: self.started_at,
            completed_at: self.completed_at,
            success: self.completed_at.map(|_| self.success),
        }
    }
}

/// Append-only log capped at `capacity`; the oldest record is evicted first.
#[derive(Debug)]
pub struct TaskHistory {
    records: VecDeque<TaskExecutionRecord>,
    capacity: usize,
}

impl TaskHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append an in-flight record.
    pub fn start(&mut self, task_id: TaskId, agent_role: AgentRole, task_kind: TaskKind) {
        self.records.push_back(TaskExecutionRecord {
            task_id,
            agent_role,
            task_kind,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            success: false,
            result: None,
            started: Instant::now(),
        });
        self.evict();
    }

    /// Finalize the record of `task_id` and return its duration.
    ///
    /// Returns `None` when the record was evicted while the task ran.
    pub fn complete(
        &mut self,
        task_id: &TaskId,
        success: bool,
        result: Option<AgentResult>,
    ) -> Option<u64> {
        let Some(record) = self
            .records
            .iter_mut()
            .rev()
            .find(|r| &r.task_id == task_id)
        else {
            debug!(task_id = %task_id, "Execution record evicted before completion");
            return None;
        };
        let duration_ms = record.started.elapsed().as_millis() as u64;
        record.completed_at = Some(Utc::now());
        record.duration_ms = Some(duration_ms);
        record.success = success;
        record.result = result;
        Some(duration_ms)
    }

    /// Success rate of `role` on `kind` over completed records.
    ///
    /// `None` when the role has never completed a task of that kind.
    pub fn success_rate(&self, role: AgentRole, kind: TaskKind) -> Option<f64> {
        let (attempts, successes) = self
            .records
            .iter()
            .filter(|r| r.agent_role == role && r.task_kind == kind && r.is_completed())
            .fold((0usize, 0usize), |(a, s), r| (a + 1, s + usize::from(r.success)));
        (attempts > 0).then(|| successes as f64 / attempts as f64)
    }

    /// The last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<RecentExecution> {
        let skip = self.records.len().saturating_sub(n);
        self.records
            .iter()
            .skip(skip)
            .map(TaskExecutionRecord::as_recent)
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskExecutionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    fn evict(&mut self) {
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(history: &mut TaskHistory, role: AgentRole, kind: TaskKind, success: bool) -> TaskId {
        let id = TaskId::generate();
        history.start(id.clone(), role, kind);
        history.complete(&id, success, Some(AgentResult::success(json!({}), "ok", 1.0)));
        id
    }

    #[test]
    fn test_success_rate_counts_only_matching_completed_records() {
        let mut history = TaskHistory::new(100);
        run(&mut history, AgentRole::LearningCoach, TaskKind::GenerateHint, true);
        run(&mut history, AgentRole::LearningCoach, TaskKind::GenerateHint, false);
        run(&mut history, AgentRole::LearningCoach, TaskKind::AdaptDifficulty, false);
        history.start(TaskId::generate(), AgentRole::LearningCoach, TaskKind::GenerateHint);

        assert_eq!(
            history.success_rate(AgentRole::LearningCoach, TaskKind::GenerateHint),
            Some(0.5)
        );
        assert_eq!(
            history.success_rate(AgentRole::MotivationSpecialist, TaskKind::GenerateHint),
            None
        );
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = TaskHistory::new(3);
        let first = run(&mut history, AgentRole::MemoryKeeper, TaskKind::UpdateMemory, true);
        for _ in 0..3 {
            run(&mut history, AgentRole::MemoryKeeper, TaskKind::UpdateMemory, true);
        }
        assert_eq!(history.len(), 3);
        assert!(history.records().all(|r| r.task_id != first));
        assert_eq!(history.complete(&first, true, None), None);
    }

    #[test]
    fn test_recent_is_oldest_first_and_marks_in_flight() {
        let mut history = TaskHistory::new(10);
        let a = run(&mut history, AgentRole::AnalyticsExpert, TaskKind::AnalyzePerformance, true);
        let b = TaskId::generate();
        history.start(b.clone(), AgentRole::AnalyticsExpert, TaskKind::AnalyzePerformance);

        let recent = history.recent(3);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].task_id, a);
        assert_eq!(recent[0].success, Some(true));
        assert_eq!(recent[1].task_id, b);
        assert_eq!(recent[1].success, None);
    }

    #[test]
    fn test_set_capacity_shrinks() {
        let mut history = TaskHistory::new(10);
        for _ in 0..5 {
            run(&mut history, AgentRole::LearningCoach, TaskKind::GenerateHint, true);
        }
        history.set_capacity(2);
        assert_eq!(history.len(), 2);
        history.clear();
        assert!(history.is_empty());
    }
}
