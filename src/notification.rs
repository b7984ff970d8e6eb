//! Notification feed.
//!
//! The feed a user sees is derived on read by joining three sources:
//! pending invitations addressed to their email, open tasks assigned to
//! them in projects that are still open, and persisted due-date-change
//! records. Only the date-change records are stored; they carry the
//! read flag.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::member::MemberStore;
use crate::permission::Role;
use crate::project::{ProjectState, ProjectStore};
use crate::session::UserProfile;
use crate::storage::Storage;
use crate::task::{Priority, TaskStatus, TaskStore};

const NOTIFICATION_ID_PREFIX: &str = "ntf";
const NOTIFICATION_ID_SUFFIX_LEN: usize = 8;

/// A persisted due-date-change notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateChangeRecord {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub task_id: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_due: Option<NaiveDate>,
    pub new_due: NaiveDate,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Registry of persisted notifications
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsRegistry {
    pub notifications: Vec<DateChangeRecord>,
}

/// One entry in a user's derived feed
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedItem {
    Invitation {
        id: String,
        project_id: String,
        project_name: String,
        role: Role,
        invited_at: DateTime<Utc>,
    },
    Task {
        id: String,
        project_id: String,
        project_name: String,
        title: String,
        status: TaskStatus,
        priority: Priority,
        due_date: NaiveDate,
        assigned_at: DateTime<Utc>,
    },
    DateChange {
        id: String,
        project_id: String,
        task_id: String,
        title: String,
        message: String,
        read: bool,
        occurred_at: DateTime<Utc>,
    },
}

impl FeedItem {
    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            FeedItem::Invitation { invited_at, .. } => *invited_at,
            FeedItem::Task { assigned_at, .. } => *assigned_at,
            FeedItem::DateChange { occurred_at, .. } => *occurred_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationStore {
    storage: Storage,
}

impl NotificationStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Persist a due-date-change notification for a user
    #[allow(clippy::too_many_arguments)]
    pub fn record_date_change(
        &self,
        user_id: &str,
        project_id: &str,
        task_id: &str,
        title: &str,
        message: &str,
        previous_due: Option<NaiveDate>,
        new_due: NaiveDate,
    ) -> Result<DateChangeRecord> {
        let record = DateChangeRecord {
            id: generate_notification_id(),
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
            task_id: task_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            previous_due,
            new_due,
            read: false,
            created_at: Utc::now(),
        };
        self.storage.update_registry(
            &self.storage.notifications_file(),
            |registry: &mut NotificationsRegistry| {
                registry.notifications.push(record.clone());
                Ok(record.clone())
            },
        )
    }

    /// Persisted notifications addressed to a user, newest first
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<DateChangeRecord>> {
        let registry: NotificationsRegistry = self
            .storage
            .read_registry(&self.storage.notifications_file())?;
        let mut records: Vec<DateChangeRecord> = registry
            .notifications
            .into_iter()
            .filter(|record| record.user_id == user_id)
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    /// Flag a notification as read. The record must belong to the
    /// acting user; returns whether the flag changed.
    pub fn mark_read(&self, notification_id: &str, acting_user_id: &str) -> Result<bool> {
        self.storage.update_registry(
            &self.storage.notifications_file(),
            |registry: &mut NotificationsRegistry| {
                let record = registry
                    .notifications
                    .iter_mut()
                    .find(|record| record.id == notification_id)
                    .ok_or_else(|| Error::InvitationNotFound(notification_id.to_string()))?;
                if record.user_id != acting_user_id {
                    return Err(Error::Forbidden(
                        "this notification is not addressed to you".to_string(),
                    ));
                }
                if record.read {
                    return Ok(false);
                }
                record.read = true;
                Ok(true)
            },
        )
    }

    /// Build the derived feed for a user, sorted newest first.
    ///
    /// Invitations surface as long as their project still exists; task
    /// entries are suppressed once the project finalizes.
    pub fn feed(&self, user: &UserProfile) -> Result<Vec<FeedItem>> {
        let projects = ProjectStore::new(self.storage.clone());
        let members = MemberStore::new(self.storage.clone());
        let tasks = TaskStore::new(self.storage.clone());

        let mut items = Vec::new();

        for invitation in members.pending_for_email(&user.email)? {
            let Ok(project) = projects.get(&invitation.project_id) else {
                continue;
            };
            items.push(FeedItem::Invitation {
                id: invitation.id,
                project_id: project.id.clone(),
                project_name: project.name,
                role: invitation.role,
                invited_at: invitation.invited_at,
            });
        }

        for task in tasks.assigned_open(&user.id)? {
            let Ok(project) = projects.get(&task.project_id) else {
                continue;
            };
            if project.state == ProjectState::Finalized {
                continue;
            }
            items.push(FeedItem::Task {
                id: task.id,
                project_id: project.id.clone(),
                project_name: project.name,
                title: task.title,
                status: task.status,
                priority: task.priority,
                due_date: task.due_date,
                assigned_at: task.created_at,
            });
        }

        for record in self.list_for_user(&user.id)? {
            items.push(FeedItem::DateChange {
                id: record.id,
                project_id: record.project_id,
                task_id: record.task_id,
                title: record.title,
                message: record.message,
                read: record.read,
                occurred_at: record.created_at,
            });
        }

        items.sort_by(|a, b| b.occurred_at().cmp(&a.occurred_at()));
        Ok(items)
    }
}

fn generate_notification_id() -> String {
    let raw = Ulid::new().to_string().to_ascii_lowercase();
    format!(
        "{NOTIFICATION_ID_PREFIX}-{}",
        &raw[raw.len() - NOTIFICATION_ID_SUFFIX_LEN..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectDraft;
    use crate::task::TaskDraft;
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn profile(id: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            username: id.to_string(),
            created_at: Utc::now(),
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        storage: Storage,
        notifications: NotificationStore,
        project_id: String,
    }

    fn setup() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().expect("init");
        let project = ProjectStore::new(storage.clone())
            .create(
                ProjectDraft {
                    name: "Bodega".to_string(),
                    client: None,
                    location: None,
                    description: None,
                    start_date: date(2024, 1, 1),
                    end_date: date(2024, 12, 31),
                },
                "boss",
                "boss@example.com",
                "boss",
            )
            .expect("create project");
        Fixture {
            _dir: dir,
            notifications: NotificationStore::new(storage.clone()),
            storage,
            project_id: project.id,
        }
    }

    #[test]
    fn mark_read_flips_once_and_checks_owner() {
        let fx = setup();
        let record = fx
            .notifications
            .record_date_change(
                "ana",
                &fx.project_id,
                "tsk-1",
                "Due date changed on task: Colar losa",
                "moved",
                Some(date(2024, 7, 1)),
                date(2024, 8, 1),
            )
            .expect("record");

        let err = fx
            .notifications
            .mark_read(&record.id, "bob")
            .expect_err("not the addressee");
        match err {
            Error::Forbidden(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(fx.notifications.mark_read(&record.id, "ana").expect("read"));
        assert!(!fx.notifications.mark_read(&record.id, "ana").expect("again"));
    }

    #[test]
    fn feed_joins_three_sources() {
        let fx = setup();
        let members = MemberStore::new(fx.storage.clone());
        let tasks = TaskStore::new(fx.storage.clone());

        // Pending invitation for ana
        members
            .invite(&fx.project_id, "ana@example.com", Role::Worker, "boss")
            .expect("invite");

        // Accepted worker bob with an open task and a date change
        let invitation = members
            .invite(&fx.project_id, "bob@example.com", Role::Worker, "boss")
            .expect("invite bob");
        members.accept(&invitation.id, &profile("bob")).expect("accept");
        let task = tasks
            .create(
                TaskDraft {
                    project_id: fx.project_id.clone(),
                    title: "Colar losa".to_string(),
                    description: None,
                    assignee: "bob".to_string(),
                    priority: Priority::Medium,
                    due_date: date(2024, 7, 1),
                    materials: Vec::new(),
                },
                "boss",
                date(2024, 6, 1),
            )
            .expect("create task");
        tasks
            .change_due_date(&task.id, date(2024, 8, 1), "rain delay", "boss", date(2024, 6, 1))
            .expect("change due date");

        let ana_feed = fx.notifications.feed(&profile("ana")).expect("ana feed");
        assert_eq!(ana_feed.len(), 1);
        assert!(matches!(ana_feed[0], FeedItem::Invitation { .. }));

        let bob_feed = fx.notifications.feed(&profile("bob")).expect("bob feed");
        assert_eq!(bob_feed.len(), 2);
        assert!(bob_feed
            .iter()
            .any(|item| matches!(item, FeedItem::Task { .. })));
        assert!(bob_feed
            .iter()
            .any(|item| matches!(item, FeedItem::DateChange { .. })));
    }

    #[test]
    fn finalized_projects_drop_task_entries_from_feed() {
        let fx = setup();
        let members = MemberStore::new(fx.storage.clone());
        let tasks = TaskStore::new(fx.storage.clone());

        let invitation = members
            .invite(&fx.project_id, "bob@example.com", Role::Worker, "boss")
            .expect("invite bob");
        members.accept(&invitation.id, &profile("bob")).expect("accept");
        tasks
            .create(
                TaskDraft {
                    project_id: fx.project_id.clone(),
                    title: "Colar losa".to_string(),
                    description: None,
                    assignee: "bob".to_string(),
                    priority: Priority::Medium,
                    due_date: date(2024, 7, 1),
                    materials: Vec::new(),
                },
                "boss",
                date(2024, 6, 1),
            )
            .expect("create task");

        ProjectStore::new(fx.storage.clone())
            .finalize(&fx.project_id, "boss")
            .expect("finalize");

        let feed = fx.notifications.feed(&profile("bob")).expect("feed");
        assert!(feed.is_empty());
    }
}
