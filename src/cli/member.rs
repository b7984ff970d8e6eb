//! obra member command implementations.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Result;
use crate::member::{MemberRecord, MemberStore};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::permission::{Policy, ProjectAction, Role};
use crate::session::{SessionStore, UserProfile};
use crate::storage::Storage;

pub struct InviteOptions {
    pub project: String,
    pub email: String,
    pub role: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct AcceptOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct RejectOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct RmOptions {
    pub project: String,
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub project: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct MemberListOutput {
    total: usize,
    members: Vec<MemberRecord>,
}

#[derive(serde::Serialize)]
struct MemberChangeOutput {
    id: String,
}

struct MemberContext {
    storage: Storage,
    acting: UserProfile,
}

fn load_context(site: Option<PathBuf>) -> Result<MemberContext> {
    let storage = Storage::discover(site.as_deref())?;
    let acting = SessionStore::new(storage.clone()).current_user()?;
    Ok(MemberContext { storage, acting })
}

pub fn run_invite(options: InviteOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let role = Role::from_str(&options.role)?;
    let store = MemberStore::new(ctx.storage.clone());
    let invitation = store.invite(&options.project, &options.email, role, &ctx.acting.id)?;

    let mut human = HumanOutput::new("Invitation sent");
    human.push_summary("ID", invitation.id.clone());
    human.push_summary("Email", invitation.email.clone());
    human.push_summary("Role", invitation.role.to_string());
    human.push_next_step(format!(
        "the invitee runs: obra member accept {}",
        invitation.id
    ));
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "member invite",
        &invitation,
        Some(&human),
    )
}

pub fn run_accept(options: AcceptOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = MemberStore::new(ctx.storage.clone());
    let member = store.accept(&options.id, &ctx.acting)?;

    let mut human = HumanOutput::new("Invitation accepted");
    human.push_summary("Project", member.project_id.clone());
    human.push_summary("Role", member.role.to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "member accept",
        &member,
        Some(&human),
    )
}

pub fn run_reject(options: RejectOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = MemberStore::new(ctx.storage.clone());
    let rejected = store.reject(&options.id, &ctx.acting)?;

    let output = MemberChangeOutput {
        id: rejected.id.clone(),
    };
    let mut human = HumanOutput::new("Invitation rejected");
    human.push_summary("Project", rejected.project_id);
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "member reject",
        &output,
        Some(&human),
    )
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = MemberStore::new(ctx.storage.clone());
    let removed = store.remove(&options.project, &options.id, &ctx.acting.id)?;

    let output = MemberChangeOutput {
        id: removed.id.clone(),
    };
    let mut human = HumanOutput::new("Member removed");
    human.push_summary("Email", removed.email);
    human.push_summary("Role", removed.role.to_string());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "member rm",
        &output,
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.project, ProjectAction::ViewProject, &ctx.acting.id)?;

    let store = MemberStore::new(ctx.storage.clone());
    let members = store.list_accepted(&options.project)?;
    let output = MemberListOutput {
        total: members.len(),
        members,
    };

    let mut human = HumanOutput::new("Crew");
    human.push_summary("Total", output.total.to_string());
    for member in &output.members {
        let name = member.username.as_deref().unwrap_or(&member.email);
        human.push_detail(format!("{} {} [{}]", member.id, name, member.role));
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "member list",
        &output,
        Some(&human),
    )
}
