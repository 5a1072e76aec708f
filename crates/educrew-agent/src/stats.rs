//! Crew-wide execution statistics.

use educrew_core::AgentRole;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::history::{TaskExecutionRecord, TaskHistory};

/// Per-role figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentStats {
    pub total_tasks: usize,
    pub success_rate: f64,
    pub average_execution_time_ms: f64,
}

/// Snapshot of the orchestrator's history and shared memory.
///
/// Rates and averages only count completed executions; `total_tasks`
/// includes tasks still in flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrewStats {
    pub total_tasks: usize,
    pub success_rate: f64,
    pub agent_stats: BTreeMap<AgentRole, AgentStats>,
    pub shared_memory_size: usize,
    pub average_execution_time_ms: f64,
}

#[derive(Default)]
struct Tally {
    total: usize,
    completed: usize,
    successes: usize,
    duration_ms: u64,
}

impl Tally {
    fn add(&mut self, record: &TaskExecutionRecord) {
        self.total += 1;
        if record.is_completed() {
            self.completed += 1;
            self.successes += usize::from(record.success);
            self.duration_ms += record.duration_ms.unwrap_or(0);
        }
    }

    fn success_rate(&self) -> f64 {
        ratio(self.successes as f64, self.completed)
    }

    fn average_ms(&self) -> f64 {
        ratio(self.duration_ms as f64, self.completed)
    }
}

fn ratio(value: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { value / count as f64 }
}

impl CrewStats {
    pub fn compute(history: &TaskHistory, shared_memory_size: usize) -> Self {
        let mut crew = Tally::default();
        let mut per_role: BTreeMap<AgentRole, Tally> = BTreeMap::new();
        for record in history.records() {
            crew.add(record);
            per_role.entry(record.agent_role).or_default().add(record);
        }

        Self {
            total_tasks: crew.total,
            success_rate: crew.success_rate(),
            agent_stats: per_role
                .into_iter()
                .map(|(role, tally)| {
                    (
                        role,
                        AgentStats {
                            total_tasks: tally.total,
                            success_rate: tally.success_rate(),
                            average_execution_time_ms: tally.average_ms(),
                        },
                    )
                })
                .collect(),
            shared_memory_size,
            average_execution_time_ms: crew.average_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use educrew_core::{TaskId, TaskKind};

    #[test]
    fn test_empty_history() {
        let stats = CrewStats::compute(&TaskHistory::new(10), 0);
        assert_eq!(stats, CrewStats::default());
    }

    #[test]
    fn test_rates_ignore_in_flight_tasks() {
        let mut history = TaskHistory::new(10);
        for (role, success) in [
            (AgentRole::LearningCoach, true),
            (AgentRole::LearningCoach, false),
            (AgentRole::MotivationSpecialist, true),
        ] {
            let id = TaskId::generate();
            history.start(id.clone(), role, TaskKind::ProvideFeedback);
            history.complete(&id, success, None);
        }
        history.start(
            TaskId::generate(),
            AgentRole::AnalyticsExpert,
            TaskKind::AnalyzePerformance,
        );

        let stats = CrewStats::compute(&history, 2);
        assert_eq!(stats.total_tasks, 4);
        assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.shared_memory_size, 2);

        let coach = &stats.agent_stats[&AgentRole::LearningCoach];
        assert_eq!(coach.total_tasks, 2);
        assert_eq!(coach.success_rate, 0.5);

        let analytics = &stats.agent_stats[&AgentRole::AnalyticsExpert];
        assert_eq!(analytics.total_tasks, 1);
        assert_eq!(analytics.success_rate, 0.0);
    }
}
