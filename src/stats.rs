//! Dashboard task statistics.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DUE_SOON_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[serde(alias = "pending", alias = "new")]
    Todo,
    #[serde(alias = "doing", alias = "in-progress")]
    InProgress,
    #[serde(alias = "waiting_approval")]
    Review,
    #[serde(alias = "done")]
    Completed,
    #[serde(alias = "canceled")]
    Cancelled,
}

impl TaskStatus {
    /// Completed and cancelled tasks are closed and never count as late.
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub review: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub completion_rate: f64,
}

/// Negative windows count as zero; a horizon past the representable range saturates.
pub fn compute_task_stats(tasks: &[TaskRecord], now: DateTime<Utc>, due_soon_window: Duration) -> TaskStats {
    let window = due_soon_window.max(Duration::zero());
    let horizon = now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC);
    let mut stats = TaskStats::default();
    for task in tasks {
        stats.total += 1;
        match task.status {
            TaskStatus::Todo => stats.todo += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Review => stats.review += 1,
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::Cancelled => stats.cancelled += 1,
        }
        if !task.status.is_open() { continue; }
        if let Some(deadline) = task.deadline {
            if deadline < now {
                stats.overdue += 1;
            } else if deadline <= horizon {
                stats.due_soon += 1;
            }
        }
    }
    let countable = stats.total - stats.cancelled;
    stats.completion_rate = if countable == 0 { 0.0 } else { stats.completed as f64 / countable as f64 };
    stats
}
