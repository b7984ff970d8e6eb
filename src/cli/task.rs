//! obra task command implementations.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{Local, NaiveDate};

use crate::config::Config;
use crate::date::{format_dmy, parse_input};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::permission::{Policy, ProjectAction};
use crate::session::{SessionStore, UserProfile};
use crate::storage::Storage;
use crate::task::{
    classify, statistics, Priority, TaskBuckets, TaskDraft, TaskFilter, TaskRecord, TaskStore,
};

pub struct NewOptions {
    pub project: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: String,
    pub priority: String,
    pub due: String,
    pub materials: Vec<String>,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub project: String,
    pub bucket: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ShowOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct StartOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct CompleteOptions {
    pub id: String,
    pub comment: String,
    pub evidence: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct DueOptions {
    pub id: String,
    pub date: String,
    pub reason: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct StatsOptions {
    pub project: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct TaskListOutput {
    as_of: NaiveDate,
    active: usize,
    completed: usize,
    overdue: usize,
    buckets: TaskBuckets,
}

struct TaskContext {
    storage: Storage,
    config: Config,
    acting: UserProfile,
    today: NaiveDate,
}

fn load_context(site: Option<PathBuf>) -> Result<TaskContext> {
    let storage = Storage::discover(site.as_deref())?;
    let config = Config::load_from_site(&storage.site_root().to_path_buf());
    let acting = SessionStore::new(storage.clone()).current_user()?;
    Ok(TaskContext {
        storage,
        config,
        acting,
        today: Local::now().date_naive(),
    })
}

/// Resolve a member reference given as an email or a user id
fn resolve_user(storage: &Storage, reference: &str) -> Result<String> {
    let sessions = SessionStore::new(storage.clone());
    if reference.contains('@') {
        return match sessions.profile_by_email(reference)? {
            Some(profile) => Ok(profile.id),
            None => Err(Error::UserNotFound(reference.to_string())),
        };
    }
    Ok(sessions.profile(reference)?.id)
}

fn parse_allocations(raw: &[String]) -> Result<Vec<(String, u64)>> {
    raw.iter()
        .map(|entry| {
            let (id, quantity) = entry.split_once(':').ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "invalid material allocation '{entry}': expected <material-id>:<units>"
                ))
            })?;
            let quantity: u64 = quantity.trim().parse().map_err(|_| {
                Error::InvalidArgument(format!("invalid unit count in allocation '{entry}'"))
            })?;
            Ok((id.trim().to_string(), quantity))
        })
        .collect()
}

fn task_line(task: &TaskRecord) -> String {
    format!(
        "{} {} [{}] {} due {} -> {}",
        task.id,
        task.title,
        task.priority,
        task.status,
        format_dmy(task.due_date),
        task.assignee_name
    )
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.project, ProjectAction::CreateTask, &ctx.acting.id)?;

    let due_date = parse_input(&options.due, &ctx.config.dates)?;
    let priority = Priority::from_str(&options.priority)?;
    let assignee = resolve_user(&ctx.storage, &options.assignee)?;
    let materials = parse_allocations(&options.materials)?;

    let store = TaskStore::new(ctx.storage.clone());
    let task = store.create(
        TaskDraft {
            project_id: options.project,
            title: options.title,
            description: options.description,
            assignee,
            priority,
            due_date,
            materials,
        },
        &ctx.acting.id,
        ctx.today,
    )?;

    let mut human = HumanOutput::new("Task created");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Title", task.title.clone());
    human.push_summary("Assignee", task.assignee_name.clone());
    human.push_summary("Due", format_dmy(task.due_date));
    if !task.materials.is_empty() {
        for allocation in &task.materials {
            human.push_detail(format!(
                "consumed {} x {}",
                allocation.quantity, allocation.name
            ));
        }
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "task new",
        &task,
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.project, ProjectAction::ViewTasks, &ctx.acting.id)?;

    let filter = TaskFilter {
        priority: options
            .priority
            .as_deref()
            .map(Priority::from_str)
            .transpose()?,
        assignee: options
            .assignee
            .as_deref()
            .map(|reference| resolve_user(&ctx.storage, reference))
            .transpose()?,
    };

    let store = TaskStore::new(ctx.storage.clone());
    let visible = store.list_visible(&options.project, &ctx.acting.id)?;
    let buckets = classify(filter.apply(visible), ctx.today);

    let output = TaskListOutput {
        as_of: ctx.today,
        active: buckets.active.len(),
        completed: buckets.completed.len(),
        overdue: buckets.overdue.len(),
        buckets,
    };

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Active", output.active.to_string());
    human.push_summary("Completed", output.completed.to_string());
    human.push_summary("Overdue", output.overdue.to_string());

    let bucket = options.bucket.as_deref();
    if bucket.is_none() || bucket == Some("active") {
        for task in &output.buckets.active {
            human.push_detail(format!("active   {}", task_line(task)));
        }
    }
    if bucket.is_none() || bucket == Some("completed") {
        for task in &output.buckets.completed {
            human.push_detail(format!("completed {}", task_line(task)));
        }
    }
    if bucket.is_none() || bucket == Some("overdue") {
        for task in &output.buckets.overdue {
            human.push_detail(format!("overdue  {}", task_line(task)));
        }
    }
    if let Some(bucket) = bucket {
        if !matches!(bucket, "active" | "completed" | "overdue") {
            return Err(Error::InvalidArgument(format!(
                "unknown bucket '{bucket}' (expected active|completed|overdue)"
            )));
        }
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "task list",
        &output,
        Some(&human),
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = TaskStore::new(ctx.storage.clone());
    let task = store.get(&options.id)?;

    let policy = Policy::new(ctx.storage.clone());
    policy.require(&task.project_id, ProjectAction::ViewTasks, &ctx.acting.id)?;

    // Same scope rule as the list: you only get details of tasks you
    // could see there.
    let visible = store.list_visible(&task.project_id, &ctx.acting.id)?;
    if !visible.iter().any(|candidate| candidate.id == task.id) {
        return Err(Error::Forbidden(
            "this task is not visible to your role".to_string(),
        ));
    }

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Priority", task.priority.to_string());
    human.push_summary("Assignee", task.assignee_name.clone());
    human.push_summary("Due", format_dmy(task.due_date));
    if let Some(description) = task.description.as_ref() {
        human.push_summary("Description", description.clone());
    }
    if let Some(completion) = task.completion.as_ref() {
        human.push_summary("Completed", completion.completed_at.to_rfc3339());
        human.push_summary("Comment", completion.comment.clone());
        human.push_summary("Evidence", completion.evidence.clone());
    }
    for change in &task.due_date_changes {
        let previous = change
            .previous
            .map(format_dmy)
            .unwrap_or_else(|| "unknown".to_string());
        human.push_detail(format!(
            "due date {} -> {} ({})",
            previous,
            format_dmy(change.new),
            change.reason
        ));
    }
    for allocation in &task.materials {
        human.push_detail(format!(
            "material {} x {}",
            allocation.quantity, allocation.name
        ));
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "task show",
        &task,
        Some(&human),
    )
}

pub fn run_start(options: StartOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = TaskStore::new(ctx.storage.clone());
    let task = store.get(&options.id)?;

    let policy = Policy::new(ctx.storage.clone());
    policy.require(&task.project_id, ProjectAction::ManageTask, &ctx.acting.id)?;

    let task = store.start(&options.id, &ctx.acting.id)?;
    let mut human = HumanOutput::new("Task started");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Status", task.status.to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "task start",
        &task,
        Some(&human),
    )
}

pub fn run_complete(options: CompleteOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = TaskStore::new(ctx.storage.clone());
    let task = store.get(&options.id)?;

    let policy = Policy::new(ctx.storage.clone());
    policy.require(&task.project_id, ProjectAction::ManageTask, &ctx.acting.id)?;

    let task = store.complete(&options.id, &ctx.acting.id, &options.comment, &options.evidence)?;
    let mut human = HumanOutput::new("Task completed");
    human.push_summary("ID", task.id.clone());
    if let Some(completion) = task.completion.as_ref() {
        human.push_summary("Evidence", completion.evidence.clone());
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "task complete",
        &task,
        Some(&human),
    )
}

pub fn run_due(options: DueOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = TaskStore::new(ctx.storage.clone());
    let task = store.get(&options.id)?;

    let policy = Policy::new(ctx.storage.clone());
    policy.require(
        &task.project_id,
        ProjectAction::ChangeDueDate,
        &ctx.acting.id,
    )?;

    let new_due = parse_input(&options.date, &ctx.config.dates)?;
    let task = store.change_due_date(
        &options.id,
        new_due,
        &options.reason,
        &ctx.acting.id,
        ctx.today,
    )?;

    let mut human = HumanOutput::new("Due date changed");
    human.push_summary("ID", task.id.clone());
    human.push_summary("Due", format_dmy(task.due_date));
    human.push_summary("Changes", task.due_date_changes.len().to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "task due",
        &task,
        Some(&human),
    )
}

pub fn run_stats(options: StatsOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.project, ProjectAction::ViewTasks, &ctx.acting.id)?;

    let store = TaskStore::new(ctx.storage.clone());
    let tasks = store.list_project(&options.project)?;
    let stats = statistics(&tasks, ctx.today);

    let completion_pct = if stats.total == 0 {
        0
    } else {
        (stats.completed * 100 + stats.total / 2) / stats.total
    };

    let mut human = HumanOutput::new("Task statistics");
    human.push_summary("Total", stats.total.to_string());
    human.push_summary("Completed", stats.completed.to_string());
    human.push_summary("In progress", stats.in_progress.to_string());
    human.push_summary("Overdue", stats.overdue.to_string());
    human.push_summary("Completion", format!("{completion_pct}%"));
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "task stats",
        &stats,
        Some(&human),
    )
}
