//! Crew membership and invitations.
//!
//! One record per (project, person): created as a pending invitation
//! addressed to an email, promoted to an accepted membership when the
//! invitee signs in and accepts, or deleted on rejection/removal.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::permission::{check_invite_role, role_allows, ProjectAction, Role};
use crate::project::{ProjectState, ProjectStore};
use crate::session::UserProfile;
use crate::storage::Storage;

const MEMBER_ID_PREFIX: &str = "mbr";
const MEMBER_ID_SUFFIX_LEN: usize = 8;

/// Invitation/membership status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Pending,
    Accepted,
}

/// A membership record (pending invitation or accepted member)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: String,
    pub project_id: String,
    /// Set once the invitee accepts; pending invitations only carry an
    /// email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub role: Role,
    pub status: MemberStatus,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub invited_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

/// Registry of all memberships on the site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MembersRegistry {
    pub members: Vec<MemberRecord>,
}

#[derive(Debug, Clone)]
pub struct MemberStore {
    storage: Storage,
}

impl MemberStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Record the project creator as its accepted gerente
    pub fn add_manager(
        &self,
        project_id: &str,
        user_id: &str,
        email: &str,
        username: &str,
    ) -> Result<MemberRecord> {
        let now = Utc::now();
        let record = MemberRecord {
            id: generate_member_id(),
            project_id: project_id.to_string(),
            user_id: Some(user_id.to_string()),
            role: Role::Manager,
            status: MemberStatus::Accepted,
            email: email.to_string(),
            username: Some(username.to_string()),
            invited_at: now,
            accepted_at: Some(now),
        };
        self.storage.update_registry(
            &self.storage.members_file(),
            |registry: &mut MembersRegistry| {
                registry.members.push(record.clone());
                Ok(record.clone())
            },
        )
    }

    /// Invite an email to a project with a role.
    ///
    /// Re-checks project state and the inviter's table row even though
    /// screens consult the permission set first.
    pub fn invite(
        &self,
        project_id: &str,
        email: &str,
        role: Role,
        acting_user_id: &str,
    ) -> Result<MemberRecord> {
        let projects = ProjectStore::new(self.storage.clone());
        let project = projects.get(project_id)?;
        if project.state == ProjectState::Finalized {
            return Err(Error::ProjectFinalized(project_id.to_string()));
        }

        let inviter_role = self
            .accepted_role(project_id, acting_user_id)?
            .ok_or_else(|| Error::Forbidden("you are not a member of this project".to_string()))?;
        if !role_allows(inviter_role, ProjectAction::Invite) {
            return Err(Error::Forbidden(
                "your role may not invite members".to_string(),
            ));
        }
        check_invite_role(inviter_role, role)?;

        let email = email.trim().to_ascii_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(Error::Validation(format!("invalid email: '{email}'")));
        }

        let record = MemberRecord {
            id: generate_member_id(),
            project_id: project_id.to_string(),
            user_id: None,
            role,
            status: MemberStatus::Pending,
            email: email.clone(),
            username: None,
            invited_at: Utc::now(),
            accepted_at: None,
        };

        self.storage.update_registry(
            &self.storage.members_file(),
            |registry: &mut MembersRegistry| {
                let already = registry.members.iter().any(|member| {
                    member.project_id == project_id && member.email.eq_ignore_ascii_case(&email)
                });
                if already {
                    return Err(Error::Validation(format!(
                        "{email} has already been invited to this project"
                    )));
                }
                registry.members.push(record.clone());
                Ok(record.clone())
            },
        )
    }

    /// Accept a pending invitation addressed to the acting user's email
    pub fn accept(&self, invitation_id: &str, acting: &UserProfile) -> Result<MemberRecord> {
        let invitation = self.get(invitation_id)?;
        if !invitation.email.eq_ignore_ascii_case(&acting.email) {
            return Err(Error::Forbidden(
                "this invitation is not addressed to you".to_string(),
            ));
        }
        if invitation.status == MemberStatus::Accepted {
            return Err(Error::Validation("invitation already accepted".to_string()));
        }

        let projects = ProjectStore::new(self.storage.clone());
        let project = projects.get(&invitation.project_id)?;
        if project.state == ProjectState::Finalized {
            return Err(Error::ProjectFinalized(invitation.project_id.clone()));
        }

        self.storage.update_registry(
            &self.storage.members_file(),
            |registry: &mut MembersRegistry| {
                let member = registry
                    .members
                    .iter_mut()
                    .find(|member| member.id == invitation_id)
                    .ok_or_else(|| Error::InvitationNotFound(invitation_id.to_string()))?;
                member.user_id = Some(acting.id.clone());
                member.username = Some(acting.username.clone());
                member.status = MemberStatus::Accepted;
                member.accepted_at = Some(Utc::now());
                Ok(member.clone())
            },
        )
    }

    /// Reject a pending invitation addressed to the acting user's email
    /// (deletes it)
    pub fn reject(&self, invitation_id: &str, acting: &UserProfile) -> Result<MemberRecord> {
        let invitation = self.get(invitation_id)?;
        if !invitation.email.eq_ignore_ascii_case(&acting.email) {
            return Err(Error::Forbidden(
                "this invitation is not addressed to you".to_string(),
            ));
        }
        if invitation.status == MemberStatus::Accepted {
            return Err(Error::Validation(
                "invitation already accepted; ask the gerente to remove you".to_string(),
            ));
        }

        self.storage.update_registry(
            &self.storage.members_file(),
            |registry: &mut MembersRegistry| {
                let index = registry
                    .members
                    .iter()
                    .position(|member| member.id == invitation_id)
                    .ok_or_else(|| Error::InvitationNotFound(invitation_id.to_string()))?;
                Ok(registry.members.remove(index))
            },
        )
    }

    /// Remove a member or invitation. Gerente of the project only, and
    /// only while the project is open.
    pub fn remove(
        &self,
        project_id: &str,
        member_id: &str,
        acting_user_id: &str,
    ) -> Result<MemberRecord> {
        let projects = ProjectStore::new(self.storage.clone());
        let project = projects.get(project_id)?;
        if project.state == ProjectState::Finalized {
            return Err(Error::ProjectFinalized(project_id.to_string()));
        }
        if project.manager != acting_user_id {
            return Err(Error::Forbidden(
                "only the gerente may remove members".to_string(),
            ));
        }

        self.storage.update_registry(
            &self.storage.members_file(),
            |registry: &mut MembersRegistry| {
                let index = registry
                    .members
                    .iter()
                    .position(|member| member.id == member_id && member.project_id == project_id)
                    .ok_or_else(|| Error::MemberNotFound(member_id.to_string()))?;
                Ok(registry.members.remove(index))
            },
        )
    }

    /// Fetch a membership record by id
    pub fn get(&self, member_id: &str) -> Result<MemberRecord> {
        let registry: MembersRegistry = self.storage.read_registry(&self.storage.members_file())?;
        registry
            .members
            .into_iter()
            .find(|member| member.id == member_id)
            .ok_or_else(|| Error::InvitationNotFound(member_id.to_string()))
    }

    /// Accepted members of a project
    pub fn list_accepted(&self, project_id: &str) -> Result<Vec<MemberRecord>> {
        let registry: MembersRegistry = self.storage.read_registry(&self.storage.members_file())?;
        Ok(registry
            .members
            .into_iter()
            .filter(|member| {
                member.project_id == project_id && member.status == MemberStatus::Accepted
            })
            .collect())
    }

    /// Pending invitations addressed to an email
    pub fn pending_for_email(&self, email: &str) -> Result<Vec<MemberRecord>> {
        let registry: MembersRegistry = self.storage.read_registry(&self.storage.members_file())?;
        Ok(registry
            .members
            .into_iter()
            .filter(|member| {
                member.status == MemberStatus::Pending && member.email.eq_ignore_ascii_case(email)
            })
            .collect())
    }

    /// The user's accepted role in a project, if any
    pub fn accepted_role(&self, project_id: &str, user_id: &str) -> Result<Option<Role>> {
        let registry: MembersRegistry = self.storage.read_registry(&self.storage.members_file())?;
        Ok(registry
            .members
            .iter()
            .find(|member| {
                member.project_id == project_id
                    && member.status == MemberStatus::Accepted
                    && member.user_id.as_deref() == Some(user_id)
            })
            .map(|member| member.role))
    }

    /// Ids of projects where the user holds an accepted membership
    pub fn accepted_project_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let registry: MembersRegistry = self.storage.read_registry(&self.storage.members_file())?;
        let mut ids: Vec<String> = registry
            .members
            .into_iter()
            .filter(|member| {
                member.status == MemberStatus::Accepted
                    && member.user_id.as_deref() == Some(user_id)
            })
            .map(|member| member.project_id)
            .collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    /// User ids of accepted empleados in a project (supervisor
    /// visibility scope)
    pub fn worker_ids(&self, project_id: &str) -> Result<HashSet<String>> {
        Ok(self
            .list_accepted(project_id)?
            .into_iter()
            .filter(|member| member.role == Role::Worker)
            .filter_map(|member| member.user_id)
            .collect())
    }

    /// Drop every membership of a project; returns how many were removed
    pub fn remove_all_for_project(&self, project_id: &str) -> Result<usize> {
        self.storage.update_registry(
            &self.storage.members_file(),
            |registry: &mut MembersRegistry| {
                let before = registry.members.len();
                registry
                    .members
                    .retain(|member| member.project_id != project_id);
                Ok(before - registry.members.len())
            },
        )
    }
}

fn generate_member_id() -> String {
    let raw = Ulid::new().to_string().to_ascii_lowercase();
    format!(
        "{MEMBER_ID_PREFIX}-{}",
        &raw[raw.len() - MEMBER_ID_SUFFIX_LEN..]
    )
}
