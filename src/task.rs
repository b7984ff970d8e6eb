//! Tasks: creation, classification, completion with evidence, and
//! due-date amendments.
//!
//! Every stored task carries a normalized due date, so the three
//! display buckets (active, completed, overdue) are exhaustive and
//! mutually exclusive for any reference date. A completed task is
//! immutable; completing one requires both a comment and an evidence
//! image reference.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::date::{format_dmy, validate_due_date};
use crate::error::{Error, Result};
use crate::material::MaterialStore;
use crate::member::MemberStore;
use crate::notification::NotificationStore;
use crate::permission::{role_allows, ProjectAction, Role};
use crate::project::ProjectStore;
use crate::storage::Storage;

const TASK_ID_PREFIX: &str = "tsk";
const TASK_ID_SUFFIX_LEN: usize = 8;

/// Task workflow status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "en_progreso")]
    InProgress,
    #[serde(rename = "completada")]
    Completed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskStatus::Pending => "pendiente",
            TaskStatus::InProgress => "en_progreso",
            TaskStatus::Completed => "completada",
        };
        write!(f, "{name}")
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baja")]
    Low,
}

impl Priority {
    fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::High => "alta",
            Priority::Medium => "media",
            Priority::Low => "baja",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "alta" | "high" => Ok(Priority::High),
            "media" | "medium" => Ok(Priority::Medium),
            "baja" | "low" => Ok(Priority::Low),
            other => Err(Error::InvalidArgument(format!(
                "unknown priority '{other}' (expected alta|media|baja)"
            ))),
        }
    }
}

/// One amendment to a task's due date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueDateChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<NaiveDate>,
    pub new: NaiveDate,
    pub reason: String,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Material units consumed by a task at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialAllocation {
    pub material_id: String,
    pub name: String,
    pub quantity: u64,
}

/// Completion proof: both fields are mandatory to close a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub comment: String,
    /// Reference to the uploaded evidence image
    pub evidence: String,
    pub completed_at: DateTime<Utc>,
}

/// A task record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub assignee: String,
    pub assignee_name: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub status: TaskStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<Completion>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub due_date_changes: Vec<DueDateChange>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub materials: Vec<MaterialAllocation>,
}

/// Registry of all tasks on the site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksRegistry {
    pub tasks: Vec<TaskRecord>,
}

/// Input fields for creating a task
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    /// (material id, units) pairs consumed when the task is created
    pub materials: Vec<(String, u64)>,
}

// =============================================================================
// Classification
// =============================================================================

/// The three display buckets
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskBuckets {
    pub active: Vec<TaskRecord>,
    pub completed: Vec<TaskRecord>,
    pub overdue: Vec<TaskRecord>,
}

/// Partition tasks into active/completed/overdue relative to `as_of`.
///
/// Completed wins regardless of date; the rest split on a date-only
/// comparison of the due date against `as_of`.
pub fn classify(tasks: Vec<TaskRecord>, as_of: NaiveDate) -> TaskBuckets {
    let mut buckets = TaskBuckets::default();
    for task in tasks {
        if task.status == TaskStatus::Completed {
            buckets.completed.push(task);
        } else if task.due_date < as_of {
            buckets.overdue.push(task);
        } else {
            buckets.active.push(task);
        }
    }
    for bucket in [
        &mut buckets.active,
        &mut buckets.completed,
        &mut buckets.overdue,
    ] {
        bucket.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
                .then_with(|| a.id.cmp(&b.id))
        });
    }
    buckets
}

/// Summary counters for a project screen
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TaskStatistics {
    pub completed: usize,
    pub total: usize,
    pub overdue: usize,
    pub in_progress: usize,
}

/// Plain counts by predicate, using the same due-date field and
/// date-only comparison as the classifier
pub fn statistics(tasks: &[TaskRecord], as_of: NaiveDate) -> TaskStatistics {
    TaskStatistics {
        completed: tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Completed)
            .count(),
        total: tasks.len(),
        overdue: tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Completed && task.due_date < as_of)
            .count(),
        in_progress: tasks
            .iter()
            .filter(|task| task.status == TaskStatus::InProgress)
            .count(),
    }
}

/// Role-scoped visibility filter, applied before classification.
///
/// An empleado sees only their own tasks; a supervisor sees their own
/// plus those assigned to empleados; a gerente sees everything.
pub fn visible_to(
    tasks: Vec<TaskRecord>,
    viewer_id: &str,
    role: Role,
    worker_ids: &HashSet<String>,
) -> Vec<TaskRecord> {
    match role {
        Role::Manager => tasks,
        Role::Supervisor => tasks
            .into_iter()
            .filter(|task| task.assignee == viewer_id || worker_ids.contains(&task.assignee))
            .collect(),
        Role::Worker => tasks
            .into_iter()
            .filter(|task| task.assignee == viewer_id)
            .collect(),
    }
}

/// Optional list filters (priority, assignee)
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub priority: Option<Priority>,
    pub assignee: Option<String>,
}

impl TaskFilter {
    pub fn apply(&self, tasks: Vec<TaskRecord>) -> Vec<TaskRecord> {
        tasks
            .into_iter()
            .filter(|task| {
                self.priority
                    .map(|priority| task.priority == priority)
                    .unwrap_or(true)
            })
            .filter(|task| {
                self.assignee
                    .as_deref()
                    .map(|assignee| task.assignee == assignee)
                    .unwrap_or(true)
            })
            .collect()
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
}

impl TaskStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Create a task and consume its material allocations.
    ///
    /// The task write and the per-material stock decrements are an
    /// ordered series of independent writes: a failure partway leaves
    /// the task and earlier decrements committed.
    pub fn create(
        &self,
        draft: TaskDraft,
        acting_user_id: &str,
        today: NaiveDate,
    ) -> Result<TaskRecord> {
        let projects = ProjectStore::new(self.storage.clone());
        let project = projects.ensure_open(&draft.project_id)?;

        let members = MemberStore::new(self.storage.clone());
        let role = members
            .accepted_role(&draft.project_id, acting_user_id)?
            .ok_or_else(|| Error::Forbidden("you are not a member of this project".to_string()))?;
        if !role_allows(role, ProjectAction::CreateTask) {
            return Err(Error::Forbidden("your role may not create tasks".to_string()));
        }

        let title = draft.title.trim();
        if title.is_empty() {
            return Err(Error::Validation("task title cannot be empty".to_string()));
        }

        let crew = members.list_accepted(&draft.project_id)?;
        let assignee = crew
            .iter()
            .find(|member| member.user_id.as_deref() == Some(draft.assignee.as_str()))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "assignee {} is not an accepted member of the project",
                    draft.assignee
                ))
            })?;
        let assignee_name = assignee
            .username
            .clone()
            .unwrap_or_else(|| assignee.email.clone());

        validate_due_date(draft.due_date, today, project.end_date)?;

        let materials = MaterialStore::new(self.storage.clone());
        let mut allocations = Vec::with_capacity(draft.materials.len());
        for (material_id, quantity) in &draft.materials {
            let material = materials.get(material_id)?;
            if material.project_id != draft.project_id {
                return Err(Error::Validation(format!(
                    "material {material_id} does not belong to project {}",
                    draft.project_id
                )));
            }
            allocations.push(MaterialAllocation {
                material_id: material.id,
                name: material.name,
                quantity: *quantity,
            });
        }

        let record = TaskRecord {
            id: generate_task_id(),
            project_id: draft.project_id.clone(),
            title: title.to_string(),
            description: draft.description.and_then(|value| {
                let trimmed = value.trim().to_string();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed)
                }
            }),
            assignee: draft.assignee.clone(),
            assignee_name,
            priority: draft.priority,
            due_date: draft.due_date,
            status: TaskStatus::Pending,
            created_by: acting_user_id.to_string(),
            created_at: Utc::now(),
            completion: None,
            due_date_changes: Vec::new(),
            materials: allocations,
        };

        let created = self.storage.update_registry(
            &self.storage.tasks_file(),
            |registry: &mut TasksRegistry| {
                registry.tasks.push(record.clone());
                Ok(record.clone())
            },
        )?;

        for (material_id, quantity) in &draft.materials {
            materials.allocate(&draft.project_id, material_id, *quantity)?;
        }

        tracing::debug!(task = %created.id, project = %created.project_id, "task created");
        Ok(created)
    }

    /// Fetch a task by id
    pub fn get(&self, task_id: &str) -> Result<TaskRecord> {
        let registry: TasksRegistry = self.storage.read_registry(&self.storage.tasks_file())?;
        registry
            .tasks
            .into_iter()
            .find(|task| task.id == task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    /// All tasks of a project, unscoped
    pub fn list_project(&self, project_id: &str) -> Result<Vec<TaskRecord>> {
        let registry: TasksRegistry = self.storage.read_registry(&self.storage.tasks_file())?;
        Ok(registry
            .tasks
            .into_iter()
            .filter(|task| task.project_id == project_id)
            .collect())
    }

    /// Tasks of a project the acting user is allowed to see.
    ///
    /// No accepted role means no scope: the caller gets an empty list,
    /// not an error (reads on finalized projects pass the permission
    /// check even without a membership).
    pub fn list_visible(&self, project_id: &str, viewer_id: &str) -> Result<Vec<TaskRecord>> {
        let members = MemberStore::new(self.storage.clone());
        let Some(role) = members.accepted_role(project_id, viewer_id)? else {
            return Ok(Vec::new());
        };
        let worker_ids = members.worker_ids(project_id)?;
        Ok(visible_to(
            self.list_project(project_id)?,
            viewer_id,
            role,
            &worker_ids,
        ))
    }

    /// Open tasks assigned to a user across all projects
    pub fn assigned_open(&self, user_id: &str) -> Result<Vec<TaskRecord>> {
        let registry: TasksRegistry = self.storage.read_registry(&self.storage.tasks_file())?;
        Ok(registry
            .tasks
            .into_iter()
            .filter(|task| task.assignee == user_id && task.status != TaskStatus::Completed)
            .collect())
    }

    /// Move a pending task into progress
    pub fn start(&self, task_id: &str, acting_user_id: &str) -> Result<TaskRecord> {
        let task = self.get(task_id)?;
        let projects = ProjectStore::new(self.storage.clone());
        projects.ensure_open(&task.project_id)?;
        self.ensure_can_manage(&task, acting_user_id)?;

        self.storage.update_registry(
            &self.storage.tasks_file(),
            |registry: &mut TasksRegistry| {
                let task = registry
                    .tasks
                    .iter_mut()
                    .find(|task| task.id == task_id)
                    .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
                match task.status {
                    TaskStatus::Completed => {
                        Err(Error::Validation("task is already completed".to_string()))
                    }
                    TaskStatus::InProgress => {
                        Err(Error::Validation("task is already in progress".to_string()))
                    }
                    TaskStatus::Pending => {
                        task.status = TaskStatus::InProgress;
                        Ok(task.clone())
                    }
                }
            },
        )
    }

    /// Complete a task. Both a comment and an evidence image reference
    /// are required; a completed task accepts no further transitions.
    pub fn complete(
        &self,
        task_id: &str,
        acting_user_id: &str,
        comment: &str,
        evidence: &str,
    ) -> Result<TaskRecord> {
        let task = self.get(task_id)?;
        let projects = ProjectStore::new(self.storage.clone());
        projects.ensure_open(&task.project_id)?;
        self.ensure_can_manage(&task, acting_user_id)?;

        let comment = comment.trim();
        if comment.is_empty() {
            return Err(Error::Validation(
                "a completion comment is required".to_string(),
            ));
        }
        let evidence = evidence.trim();
        if evidence.is_empty() {
            return Err(Error::Validation(
                "a completion evidence image is required".to_string(),
            ));
        }

        self.storage.update_registry(
            &self.storage.tasks_file(),
            |registry: &mut TasksRegistry| {
                let task = registry
                    .tasks
                    .iter_mut()
                    .find(|task| task.id == task_id)
                    .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
                if task.status == TaskStatus::Completed {
                    return Err(Error::Validation("task is already completed".to_string()));
                }
                task.status = TaskStatus::Completed;
                task.completion = Some(Completion {
                    comment: comment.to_string(),
                    evidence: evidence.to_string(),
                    completed_at: Utc::now(),
                });
                Ok(task.clone())
            },
        )
    }

    /// Amend a task's due date. Gerente only; appends a history entry
    /// and notifies the assignee when someone else's task moved.
    pub fn change_due_date(
        &self,
        task_id: &str,
        new_due: NaiveDate,
        reason: &str,
        acting_user_id: &str,
        today: NaiveDate,
    ) -> Result<TaskRecord> {
        let task = self.get(task_id)?;
        let projects = ProjectStore::new(self.storage.clone());
        let project = projects.ensure_open(&task.project_id)?;

        let members = MemberStore::new(self.storage.clone());
        let role = members.accepted_role(&task.project_id, acting_user_id)?;
        if role != Some(Role::Manager) {
            return Err(Error::Forbidden(
                "only the gerente may change a due date".to_string(),
            ));
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::Validation(
                "a reason for the date change is required".to_string(),
            ));
        }
        validate_due_date(new_due, today, project.end_date)?;

        let updated = self.storage.update_registry(
            &self.storage.tasks_file(),
            |registry: &mut TasksRegistry| {
                let task = registry
                    .tasks
                    .iter_mut()
                    .find(|task| task.id == task_id)
                    .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
                if task.status == TaskStatus::Completed {
                    return Err(Error::Validation("task is already completed".to_string()));
                }
                let previous = task.due_date;
                task.due_date = new_due;
                task.due_date_changes.push(DueDateChange {
                    previous: Some(previous),
                    new: new_due,
                    reason: reason.to_string(),
                    changed_by: acting_user_id.to_string(),
                    changed_at: Utc::now(),
                });
                Ok(task.clone())
            },
        )?;

        if updated.assignee != acting_user_id {
            let notifications = NotificationStore::new(self.storage.clone());
            let previous = updated
                .due_date_changes
                .last()
                .and_then(|change| change.previous);
            notifications.record_date_change(
                &updated.assignee,
                &updated.project_id,
                &updated.id,
                &format!("Due date changed on task: {}", updated.title),
                &format!(
                    "The due date moved from {} to {}. Reason: {reason}",
                    previous
                        .map(format_dmy)
                        .unwrap_or_else(|| "unknown".to_string()),
                    format_dmy(new_due)
                ),
                previous,
                new_due,
            )?;
        }

        Ok(updated)
    }

    /// Drop every task of a project; returns how many were removed
    pub fn remove_all_for_project(&self, project_id: &str) -> Result<usize> {
        self.storage.update_registry(
            &self.storage.tasks_file(),
            |registry: &mut TasksRegistry| {
                let before = registry.tasks.len();
                registry.tasks.retain(|task| task.project_id != project_id);
                Ok(before - registry.tasks.len())
            },
        )
    }

    /// Task-level management guard: workers only touch their own
    /// tasks, supervisors their own and their empleados', gerentes any.
    fn ensure_can_manage(&self, task: &TaskRecord, acting_user_id: &str) -> Result<()> {
        let members = MemberStore::new(self.storage.clone());
        let role = members
            .accepted_role(&task.project_id, acting_user_id)?
            .ok_or_else(|| Error::Forbidden("you are not a member of this project".to_string()))?;
        match role {
            Role::Manager => Ok(()),
            Role::Supervisor => {
                let worker_ids = members.worker_ids(&task.project_id)?;
                if task.assignee == acting_user_id || worker_ids.contains(&task.assignee) {
                    Ok(())
                } else {
                    Err(Error::Forbidden(
                        "supervisors may only manage their own or empleados' tasks".to_string(),
                    ))
                }
            }
            Role::Worker => {
                if task.assignee == acting_user_id {
                    Ok(())
                } else {
                    Err(Error::Forbidden(
                        "empleados may only manage their own tasks".to_string(),
                    ))
                }
            }
        }
    }
}

fn generate_task_id() -> String {
    let raw = Ulid::new().to_string().to_ascii_lowercase();
    format!(
        "{TASK_ID_PREFIX}-{}",
        &raw[raw.len() - TASK_ID_SUFFIX_LEN..]
    )
}
