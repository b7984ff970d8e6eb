//! obra notify command implementations.

use std::path::PathBuf;

use crate::date::format_dmy;
use crate::error::Result;
use crate::notification::{FeedItem, NotificationStore};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::{SessionStore, UserProfile};
use crate::storage::Storage;

pub struct ListOptions {
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ReadOptions {
    pub id: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct FeedOutput {
    total: usize,
    items: Vec<FeedItem>,
}

#[derive(serde::Serialize)]
struct ReadOutput {
    id: String,
    changed: bool,
}

struct NotifyContext {
    storage: Storage,
    acting: UserProfile,
}

fn load_context(site: Option<PathBuf>) -> Result<NotifyContext> {
    let storage = Storage::discover(site.as_deref())?;
    let acting = SessionStore::new(storage.clone()).current_user()?;
    Ok(NotifyContext { storage, acting })
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = NotificationStore::new(ctx.storage.clone());
    let items = store.feed(&ctx.acting)?;
    let output = FeedOutput {
        total: items.len(),
        items,
    };

    let mut human = HumanOutput::new("Notifications");
    human.push_summary("Total", output.total.to_string());
    for item in &output.items {
        match item {
            FeedItem::Invitation {
                id,
                project_name,
                role,
                ..
            } => {
                human.push_detail(format!(
                    "invitation {id}: join '{project_name}' as {role}"
                ));
            }
            FeedItem::Task {
                id,
                project_name,
                title,
                due_date,
                ..
            } => {
                human.push_detail(format!(
                    "task {id}: '{title}' in '{project_name}' due {}",
                    format_dmy(*due_date)
                ));
            }
            FeedItem::DateChange {
                id, title, read, ..
            } => {
                let marker = if *read { "" } else { " [new]" };
                human.push_detail(format!("date change {id}: {title}{marker}"));
            }
        }
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "notify list",
        &output,
        Some(&human),
    )
}

pub fn run_read(options: ReadOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = NotificationStore::new(ctx.storage.clone());
    let changed = store.mark_read(&options.id, &ctx.acting.id)?;

    let output = ReadOutput {
        id: options.id.clone(),
        changed,
    };
    let human = HumanOutput::new(if changed {
        "Notification marked as read"
    } else {
        "Notification was already read"
    });
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "notify read",
        &output,
        Some(&human),
    )
}
