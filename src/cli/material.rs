//! obra material command implementations.

use std::path::PathBuf;

use crate::error::Result;
use crate::material::{MaterialRecord, MaterialStore};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::permission::{Policy, ProjectAction};
use crate::session::{SessionStore, UserProfile};
use crate::storage::Storage;

pub struct AddOptions {
    pub project: String,
    pub name: String,
    pub unit: String,
    pub quantity: u64,
    pub description: Option<String>,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub project: String,
    pub search: Option<String>,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct SetStockOptions {
    pub id: String,
    pub quantity: i64,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct MaterialListOutput {
    total: usize,
    materials: Vec<MaterialRecord>,
}

struct MaterialContext {
    storage: Storage,
    acting: UserProfile,
}

fn load_context(site: Option<PathBuf>) -> Result<MaterialContext> {
    let storage = Storage::discover(site.as_deref())?;
    let acting = SessionStore::new(storage.clone()).current_user()?;
    Ok(MaterialContext { storage, acting })
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.project, ProjectAction::ViewProject, &ctx.acting.id)?;

    let store = MaterialStore::new(ctx.storage.clone());
    let material = store.add(
        &options.project,
        &options.name,
        &options.unit,
        options.quantity,
        options.description,
        &ctx.acting.id,
    )?;

    let mut human = HumanOutput::new("Material added");
    human.push_summary("ID", material.id.clone());
    human.push_summary("Name", material.name.clone());
    human.push_summary(
        "Stock",
        format!("{} {}", material.quantity, material.unit),
    );
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "material add",
        &material,
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let policy = Policy::new(ctx.storage.clone());
    policy.require(&options.project, ProjectAction::ViewProject, &ctx.acting.id)?;

    let store = MaterialStore::new(ctx.storage.clone());
    let materials = store.list(&options.project, options.search.as_deref())?;
    let output = MaterialListOutput {
        total: materials.len(),
        materials,
    };

    let mut human = HumanOutput::new("Materials");
    human.push_summary("Total", output.total.to_string());
    for material in &output.materials {
        human.push_detail(format!(
            "{} {} ({} {})",
            material.id, material.name, material.quantity, material.unit
        ));
    }
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "material list",
        &output,
        Some(&human),
    )
}

pub fn run_set_stock(options: SetStockOptions) -> Result<()> {
    let ctx = load_context(options.site)?;
    let store = MaterialStore::new(ctx.storage.clone());
    let current = store.get(&options.id)?;

    let policy = Policy::new(ctx.storage.clone());
    policy.require(
        &current.project_id,
        ProjectAction::ViewProject,
        &ctx.acting.id,
    )?;

    let material = store.set_stock(&current.project_id, &options.id, options.quantity)?;

    let mut human = HumanOutput::new("Stock updated");
    human.push_summary("ID", material.id.clone());
    human.push_summary(
        "Stock",
        format!("{} {}", material.quantity, material.unit),
    );
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "material set-stock",
        &material,
        Some(&human),
    )
}
