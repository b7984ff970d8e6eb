//! Project entities for obra.
//!
//! A project groups crew members, tasks, and materials. The user who
//! creates it becomes its gerente and receives an accepted membership
//! in the same operation (an ordered pair of writes, not a
//! transaction). Finalizing is one-way: a finalized project only ever
//! serves reads afterwards.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::member::MemberStore;
use crate::permission::Role;
use crate::storage::Storage;

const PROJECT_ID_PREFIX: &str = "prj";
const PROJECT_ID_SUFFIX_LEN: usize = 8;

/// Lifecycle state of a project
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProjectState {
    Active,
    Pending,
    Finalized,
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectState::Active => "active",
            ProjectState::Pending => "pending",
            ProjectState::Finalized => "finalized",
        };
        write!(f, "{name}")
    }
}

impl FromStr for ProjectState {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ProjectState::Active),
            "pending" => Ok(ProjectState::Pending),
            "finalized" => Ok(ProjectState::Finalized),
            other => Err(Error::InvalidArgument(format!(
                "unknown project state '{other}' (expected active|pending|finalized)"
            ))),
        }
    }
}

/// A project record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub state: ProjectState,
    /// User id of the gerente who owns the project
    pub manager: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Input fields for creating a project
#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub name: String,
    pub client: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Registry of all projects on the site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectsRegistry {
    pub projects: Vec<ProjectRecord>,
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    storage: Storage,
}

impl ProjectStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Create a project; the creator becomes its gerente with an
    /// accepted membership. Two ordered writes, no transaction.
    pub fn create(
        &self,
        draft: ProjectDraft,
        manager_id: &str,
        manager_email: &str,
        manager_name: &str,
    ) -> Result<ProjectRecord> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("project name cannot be empty".to_string()));
        }
        if draft.end_date < draft.start_date {
            return Err(Error::Validation(format!(
                "project end date {} precedes start date {}",
                draft.end_date, draft.start_date
            )));
        }

        let record = ProjectRecord {
            id: self.generate_project_id()?,
            name: name.to_string(),
            client: normalize_optional(draft.client),
            location: normalize_optional(draft.location),
            description: normalize_optional(draft.description),
            start_date: draft.start_date,
            end_date: draft.end_date,
            state: ProjectState::Active,
            manager: manager_id.to_string(),
            created_at: Utc::now(),
            finalized_at: None,
        };

        let created = self.storage.update_registry(
            &self.storage.projects_file(),
            |registry: &mut ProjectsRegistry| {
                registry.projects.push(record.clone());
                Ok(record.clone())
            },
        )?;

        let members = MemberStore::new(self.storage.clone());
        members.add_manager(&created.id, manager_id, manager_email, manager_name)?;

        tracing::debug!(project = %created.id, "project created");
        Ok(created)
    }

    /// Fetch a project by id
    pub fn get(&self, project_id: &str) -> Result<ProjectRecord> {
        let registry: ProjectsRegistry =
            self.storage.read_registry(&self.storage.projects_file())?;
        registry
            .projects
            .into_iter()
            .find(|project| project.id == project_id)
            .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))
    }

    /// Projects the user holds an accepted membership in, optionally
    /// filtered by lifecycle state
    pub fn list_for_user(
        &self,
        user_id: &str,
        state: Option<ProjectState>,
    ) -> Result<Vec<ProjectRecord>> {
        let members = MemberStore::new(self.storage.clone());
        let project_ids: HashSet<String> =
            members.accepted_project_ids(user_id)?.into_iter().collect();

        let registry: ProjectsRegistry =
            self.storage.read_registry(&self.storage.projects_file())?;
        let mut projects: Vec<ProjectRecord> = registry
            .projects
            .into_iter()
            .filter(|project| project_ids.contains(&project.id))
            .filter(|project| state.map(|state| project.state == state).unwrap_or(true))
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(projects)
    }

    /// Finalize a project. Gerente only, one-way; finalizing an already
    /// finalized project fails and leaves the record untouched.
    pub fn finalize(&self, project_id: &str, acting_user_id: &str) -> Result<ProjectRecord> {
        let members = MemberStore::new(self.storage.clone());
        let role = members.accepted_role(project_id, acting_user_id)?;

        self.storage.update_registry(
            &self.storage.projects_file(),
            |registry: &mut ProjectsRegistry| {
                let project = registry
                    .projects
                    .iter_mut()
                    .find(|project| project.id == project_id)
                    .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
                if project.state == ProjectState::Finalized {
                    return Err(Error::ProjectFinalized(project_id.to_string()));
                }
                if role != Some(Role::Manager) {
                    return Err(Error::Forbidden(
                        "only the gerente may finalize the project".to_string(),
                    ));
                }
                project.state = ProjectState::Finalized;
                project.finalized_at = Some(Utc::now());
                Ok(project.clone())
            },
        )
    }

    /// Remove a project record. Mutation against a finalized project is
    /// rejected here even if the caller skipped the permission check.
    pub fn delete(&self, project_id: &str) -> Result<ProjectRecord> {
        self.storage.update_registry(
            &self.storage.projects_file(),
            |registry: &mut ProjectsRegistry| {
                let index = registry
                    .projects
                    .iter()
                    .position(|project| project.id == project_id)
                    .ok_or_else(|| Error::ProjectNotFound(project_id.to_string()))?;
                if registry.projects[index].state == ProjectState::Finalized {
                    return Err(Error::ProjectFinalized(project_id.to_string()));
                }
                Ok(registry.projects.remove(index))
            },
        )
    }

    /// Guard helper for mutating flows: error unless the project is
    /// still open
    pub fn ensure_open(&self, project_id: &str) -> Result<ProjectRecord> {
        let project = self.get(project_id)?;
        if project.state == ProjectState::Finalized {
            return Err(Error::ProjectFinalized(project_id.to_string()));
        }
        Ok(project)
    }

    fn generate_project_id(&self) -> Result<String> {
        let registry: ProjectsRegistry =
            self.storage.read_registry(&self.storage.projects_file())?;
        let existing: HashSet<String> = registry
            .projects
            .into_iter()
            .map(|project| project.id)
            .collect();
        loop {
            let raw = Ulid::new().to_string().to_ascii_lowercase();
            let candidate = format!(
                "{PROJECT_ID_PREFIX}-{}",
                &raw[raw.len() - PROJECT_ID_SUFFIX_LEN..]
            );
            if !existing.contains(&candidate) {
                return Ok(candidate);
            }
        }
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
