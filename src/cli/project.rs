//! obra project command implementations.

use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Config;
use crate::date::{format_dmy, parse_input};
use crate::error::Result;
use crate::material::MaterialStore;
use crate::member::MemberStore;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::permission::{Policy, ProjectAction};
use crate::project::{ProjectDraft, ProjectRecord, ProjectState, ProjectStore};
use crate::session::{SessionStore, UserProfile};
use crate::storage::Storage;
use crate::task::TaskStore;

pub struct NewOptions {
    pub name: String,
    pub client: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start: String,
    pub end: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub state: Option<String>,
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

pub struct PermissionsOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct FinalizeOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct RmOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<ProjectRecord>,
}

#[derive(serde::Serialize)]
struct ProjectRmOutput {
    id: String,
    members_removed: usize,
    tasks_removed: usize,
    materials_removed: usize,
}

struct ProjectContext {
    storage: Storage,
    config: Config,
    acting: UserProfile,
}

fn load_context(site: Option<PathBuf>) -> Result<ProjectContext> {
    let storage = Storage::discover(site.as_deref())?;
    let config = Config::load_from_site(&storage.site_root().to_path_buf());
    let acting = SessionStore::new(storage.clone()).current_user()?;
    Ok(ProjectContext {
        storage,
        config,
        acting,
    })
}

pub fn run_new(options: NewOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let start_date = parse_input(&options.start, &ctx.config.dates)?;
    let end_date = parse_input(&options.end, &ctx.config.dates)?;

    let store = ProjectStore::new(ctx.storage.clone());
    let project = store.create(
        ProjectDraft {
            name: options.name,
            client: options.client,
            location: options.location,
            description: options.description,
            start_date,
            end_date,
        },
        &ctx.acting.id,
        &ctx.acting.email,
        &ctx.acting.username,
    )?;

    let mut human = HumanOutput::new("Project created");
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    human.push_summary(
        "Window",
        format!(
            "{} .. {}",
            format_dmy(project.start_date),
            format_dmy(project.end_date)
        ),
    );
    human.push_next_step(format!(
        "obra member invite {} --email <email> --role empleado",
        project.id
    ));
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project new",
        &project,
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let state = options
        .state
        .as_deref()
        .map(ProjectState::from_str)
        .transpose()?;

    let store = ProjectStore::new(ctx.storage.clone());
    let projects = store.list_for_user(&ctx.acting.id, state)?;
    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };

    let mut human = HumanOutput::new("Projects");
    human.push_summary("Total", output.total.to_string());
    for project in &output.projects {
        human.push_detail(format!(
            "{} {} [{}] due {}",
            project.id,
            project.name,
            project.state,
            format_dmy(project.end_date)
        ));
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project list",
        &output,
        Some(&human),
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.id, ProjectAction::ViewProject, &ctx.acting.id)?;

    let project = ProjectStore::new(ctx.storage.clone()).get(&options.id)?;
    let mut human = HumanOutput::new(format!("Project {}", project.id));
    human.push_summary("Name", project.name.clone());
    human.push_summary("State", project.state.to_string());
    if let Some(client) = project.client.as_ref() {
        human.push_summary("Client", client.clone());
    }
    if let Some(location) = project.location.as_ref() {
        human.push_summary("Location", location.clone());
    }
    human.push_summary("Start", format_dmy(project.start_date));
    human.push_summary("End", format_dmy(project.end_date));
    human.push_summary("Gerente", project.manager.clone());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project show",
        &project,
        Some(&human),
    )
}

pub fn run_permissions(options: PermissionsOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    let permissions = policy.permission_set(&options.id, &ctx.acting.id)?;

    let mut human = HumanOutput::new(format!("Permissions on {}", options.id));
    human.push_summary("Invite", permissions.can_invite.to_string());
    human.push_summary("Remove members", permissions.can_remove_members.to_string());
    human.push_summary("Create tasks", permissions.can_create_tasks.to_string());
    human.push_summary(
        "Finalize project",
        permissions.can_finalize_project.to_string(),
    );
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project permissions",
        &permissions,
        Some(&human),
    )
}

pub fn run_finalize(options: FinalizeOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let project = ProjectStore::new(ctx.storage.clone()).finalize(&options.id, &ctx.acting.id)?;

    let mut human = HumanOutput::new("Project finalized");
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    human.push_detail("The project is read-only from here on".to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project finalize",
        &project,
        Some(&human),
    )
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.id, ProjectAction::DeleteProject, &ctx.acting.id)?;

    // Ordered series of independent writes; a failure partway leaves
    // the earlier removals committed.
    let project = ProjectStore::new(ctx.storage.clone()).delete(&options.id)?;
    let members_removed =
        MemberStore::new(ctx.storage.clone()).remove_all_for_project(&options.id)?;
    let tasks_removed = TaskStore::new(ctx.storage.clone()).remove_all_for_project(&options.id)?;
    let materials_removed =
        MaterialStore::new(ctx.storage.clone()).remove_all_for_project(&options.id)?;

    let output = ProjectRmOutput {
        id: project.id.clone(),
        members_removed,
        tasks_removed,
        materials_removed,
    };
    let mut human = HumanOutput::new("Project deleted");
    human.push_summary("ID", project.id);
    human.push_summary("Members removed", members_removed.to_string());
    human.push_summary("Tasks removed", tasks_removed.to_string());
    human.push_summary("Materials removed", materials_removed.to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "project rm",
        &output,
        Some(&human),
    )
}
