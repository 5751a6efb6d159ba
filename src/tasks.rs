//! Pollable status records for long-running batch tasks.
//!
//! The [`TaskRegistry`] is an explicit component: created at process
//! start, passed by reference to whatever issues and polls batch jobs.
//! A `RwLock` lets any number of pollers read while the single batch
//! worker writes.
//!
//! Entries do not live forever. A task that reaches a terminal state is
//! evicted after the registry's TTL, or immediately once a caller
//! [`acknowledge`](TaskRegistry::acknowledge)s it.
//!
//! Cancellation is cooperative: [`TaskRegistry::cancel`] flips a flag on
//! the task's [`TaskHandle`], and the batch worker checks it between
//! items. Nothing is interrupted mid-item.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Terminal and non-terminal task states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    Running,
    Completed,
    Failed { reason: String },
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskState::Running)
    }
}

/// Snapshot of one task's progress, safe to hand to pollers.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub state: TaskState,
    /// Items processed so far (successes and failures both count).
    pub processed: usize,
    /// Total items the task will attempt.
    pub total: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Shared cancellation flag for one task.
#[derive(Debug, Default)]
pub struct TaskHandle {
    cancelled: AtomicBool,
}

impl TaskHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct TaskEntry {
    status: TaskStatus,
    handle: Arc<TaskHandle>,
    /// Set when the task reaches a terminal state; the entry is evicted
    /// once this instant plus the registry TTL has passed.
    finished_instant: Option<Instant>,
}

/// Registry of batch task statuses with TTL-based eviction.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, TaskEntry>>,
    ttl: Duration,
}

impl TaskRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a new task and return its cancellation handle.
    ///
    /// Re-registering an id replaces the previous entry. Expired entries
    /// are swept on every registration, so the registry stays bounded
    /// without a background reaper.
    pub fn register(&self, task_id: &str, total: usize) -> Arc<TaskHandle> {
        let handle = Arc::new(TaskHandle::default());
        let entry = TaskEntry {
            status: TaskStatus {
                task_id: task_id.to_string(),
                state: TaskState::Running,
                processed: 0,
                total,
                started_at: Utc::now(),
                finished_at: None,
            },
            handle: Arc::clone(&handle),
            finished_instant: None,
        };
        let mut tasks = self.tasks.write().expect("task registry lock poisoned");
        Self::sweep(&mut tasks, self.ttl);
        tasks.insert(task_id.to_string(), entry);
        handle
    }

    /// Record progress: `processed` items done out of the task's total.
    pub fn update_progress(&self, task_id: &str, processed: usize) {
        let mut tasks = self.tasks.write().expect("task registry lock poisoned");
        if let Some(entry) = tasks.get_mut(task_id) {
            entry.status.processed = processed;
        }
    }

    /// Move a task to a terminal state and start its TTL clock.
    pub fn finish(&self, task_id: &str, state: TaskState) {
        let mut tasks = self.tasks.write().expect("task registry lock poisoned");
        if let Some(entry) = tasks.get_mut(task_id) {
            entry.status.state = state;
            entry.status.finished_at = Some(Utc::now());
            entry.finished_instant = Some(Instant::now());
        }
    }

    /// Current status, or `None` if the task is unknown or already
    /// evicted.
    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        let tasks = self.tasks.read().expect("task registry lock poisoned");
        let entry = tasks.get(task_id)?;
        if Self::expired(entry, self.ttl) {
            return None;
        }
        Some(entry.status.clone())
    }

    /// Request cooperative cancellation. Returns `false` for unknown
    /// tasks or tasks already in a terminal state.
    pub fn cancel(&self, task_id: &str) -> bool {
        let tasks = self.tasks.read().expect("task registry lock poisoned");
        match tasks.get(task_id) {
            Some(entry) if !entry.status.state.is_terminal() => {
                entry.handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Take the final status and drop the entry immediately, without
    /// waiting for the TTL.
    pub fn acknowledge(&self, task_id: &str) -> Option<TaskStatus> {
        let mut tasks = self.tasks.write().expect("task registry lock poisoned");
        tasks.remove(task_id).map(|e| e.status)
    }

    /// Drop every terminal entry whose TTL has elapsed.
    pub fn evict_expired(&self) {
        let mut tasks = self.tasks.write().expect("task registry lock poisoned");
        Self::sweep(&mut tasks, self.ttl);
    }

    /// Number of live (non-evicted) entries.
    pub fn len(&self) -> usize {
        let tasks = self.tasks.read().expect("task registry lock poisoned");
        tasks.values().filter(|e| !Self::expired(e, self.ttl)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(entry: &TaskEntry, ttl: Duration) -> bool {
        entry
            .finished_instant
            .is_some_and(|t| t.elapsed() >= ttl)
    }

    fn sweep(tasks: &mut HashMap<String, TaskEntry>, ttl: Duration) {
        tasks.retain(|_, e| !Self::expired(e, ttl));
    }
}
