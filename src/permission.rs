//! Role-based access rules for projects.
//!
//! Roles form a closed set: Gerente (manager), Supervisor, Empleado
//! (worker). Actions are resolved against an explicit table rather than
//! scattered string comparisons, and a finalized project short-circuits
//! everything except read access before any role is consulted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::member::MemberStore;
use crate::project::{ProjectState, ProjectStore};
use crate::storage::Storage;

/// Crew role within a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "gerente")]
    Manager,
    #[serde(rename = "supervisor")]
    Supervisor,
    #[serde(rename = "empleado")]
    Worker,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Manager => "gerente",
            Role::Supervisor => "supervisor",
            Role::Worker => "empleado",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gerente" | "manager" => Ok(Role::Manager),
            "supervisor" => Ok(Role::Supervisor),
            "empleado" | "worker" => Ok(Role::Worker),
            other => Err(Error::InvalidArgument(format!(
                "unknown role '{other}' (expected gerente|supervisor|empleado)"
            ))),
        }
    }
}

/// Action on a project subject to permission checks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProjectAction {
    #[serde(rename = "ver_proyecto")]
    ViewProject,
    #[serde(rename = "ver_tareas")]
    ViewTasks,
    #[serde(rename = "invitar")]
    Invite,
    #[serde(rename = "crear_tarea")]
    CreateTask,
    #[serde(rename = "gestionar_tarea")]
    ManageTask,
    #[serde(rename = "eliminar_miembro")]
    RemoveMember,
    #[serde(rename = "finalizar_proyecto")]
    FinalizeProject,
    #[serde(rename = "eliminar_proyecto")]
    DeleteProject,
    #[serde(rename = "cambiar_fecha_vencimiento")]
    ChangeDueDate,
}

impl ProjectAction {
    /// Read-oriented actions that stay allowed on a finalized project
    pub fn is_read_only(self) -> bool {
        matches!(self, ProjectAction::ViewProject | ProjectAction::ViewTasks)
    }
}

impl fmt::Display for ProjectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectAction::ViewProject => "ver_proyecto",
            ProjectAction::ViewTasks => "ver_tareas",
            ProjectAction::Invite => "invitar",
            ProjectAction::CreateTask => "crear_tarea",
            ProjectAction::ManageTask => "gestionar_tarea",
            ProjectAction::RemoveMember => "eliminar_miembro",
            ProjectAction::FinalizeProject => "finalizar_proyecto",
            ProjectAction::DeleteProject => "eliminar_proyecto",
            ProjectAction::ChangeDueDate => "cambiar_fecha_vencimiento",
        };
        write!(f, "{name}")
    }
}

/// The role/action table for non-finalized projects.
///
/// The manager row is total; supervisors may invite and create tasks;
/// workers only view and manage their own tasks. Anything not granted
/// here is denied.
pub fn role_allows(role: Role, action: ProjectAction) -> bool {
    if role == Role::Manager {
        return true;
    }
    match action {
        ProjectAction::ViewProject | ProjectAction::ViewTasks | ProjectAction::ManageTask => true,
        ProjectAction::Invite | ProjectAction::CreateTask => role == Role::Supervisor,
        ProjectAction::RemoveMember
        | ProjectAction::FinalizeProject
        | ProjectAction::DeleteProject
        | ProjectAction::ChangeDueDate => false,
    }
}

/// Resolve an action against project state and (optional) accepted role.
///
/// Finalized state is evaluated first and short-circuits the role
/// lookup; an absent membership denies rather than erroring.
pub fn resolve_with(state: ProjectState, role: Option<Role>, action: ProjectAction) -> bool {
    if state == ProjectState::Finalized {
        return action.is_read_only();
    }
    match role {
        Some(role) => role_allows(role, action),
        None => false,
    }
}

/// Check an invitation's target role against the inviter's role.
///
/// A supervisor may only bring in workers; only a manager may grant
/// supervisor or manager roles.
pub fn check_invite_role(inviter: Role, invitee: Role) -> Result<()> {
    match inviter {
        Role::Manager => Ok(()),
        Role::Supervisor if invitee == Role::Worker => Ok(()),
        Role::Supervisor => Err(Error::Forbidden(format!(
            "a supervisor may only invite empleados, not {invitee}"
        ))),
        Role::Worker => Err(Error::Forbidden(
            "empleados may not invite members".to_string(),
        )),
    }
}

/// Precomputed booleans for the actions a screen needs up front
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PermissionSet {
    pub can_invite: bool,
    pub can_remove_members: bool,
    pub can_create_tasks: bool,
    pub can_finalize_project: bool,
}

impl PermissionSet {
    pub fn for_member(state: ProjectState, role: Option<Role>) -> Self {
        Self {
            can_invite: resolve_with(state, role, ProjectAction::Invite),
            can_remove_members: resolve_with(state, role, ProjectAction::RemoveMember),
            can_create_tasks: resolve_with(state, role, ProjectAction::CreateTask),
            can_finalize_project: resolve_with(state, role, ProjectAction::FinalizeProject),
        }
    }
}

/// Store-backed permission resolver
#[derive(Debug, Clone)]
pub struct Policy {
    projects: ProjectStore,
    members: MemberStore,
}

impl Policy {
    pub fn new(storage: Storage) -> Self {
        Self {
            projects: ProjectStore::new(storage.clone()),
            members: MemberStore::new(storage),
        }
    }

    /// Decide whether `user_id` may perform `action` on the project.
    ///
    /// A missing project is an error; a missing membership is a plain
    /// deny.
    pub fn resolve(&self, project_id: &str, action: ProjectAction, user_id: &str) -> Result<bool> {
        let project = self.projects.get(project_id)?;
        let role = self.members.accepted_role(project_id, user_id)?;
        Ok(resolve_with(project.state, role, action))
    }

    /// Like [`Policy::resolve`], but turning a deny into `Forbidden`
    pub fn require(&self, project_id: &str, action: ProjectAction, user_id: &str) -> Result<()> {
        if self.resolve(project_id, action, user_id)? {
            Ok(())
        } else {
            Err(Error::Forbidden(format!(
                "action '{action}' is not allowed on project {project_id}"
            )))
        }
    }

    /// Precompute the booleans a project screen renders against
    pub fn permission_set(&self, project_id: &str, user_id: &str) -> Result<PermissionSet> {
        let project = self.projects.get(project_id)?;
        let role = self.members.accepted_role(project_id, user_id)?;
        Ok(PermissionSet::for_member(project.state, role))
    }
}
