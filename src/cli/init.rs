//! obra init command implementation.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Storage;

pub struct InitOptions {
    pub name: Option<String>,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct InitOutput {
    site_root: PathBuf,
    created: bool,
    config_written: bool,
}

pub fn run(options: InitOptions) -> Result<()> {
    let root = match options.site {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let storage = Storage::new(root.clone());
    let created = !storage.is_initialized();
    storage.init()?;

    let config_path = root.join(".obra.toml");
    let config_written = options.name.is_some() || !config_path.exists();
    if config_written {
        let mut config = Config::default();
        if options.name.is_some() {
            config.site.name = options.name.clone();
        }
        config.save(&config_path)?;
    }

    let output = InitOutput {
        site_root: root.clone(),
        created,
        config_written,
    };
    let mut human = HumanOutput::new(if created {
        "Site initialized"
    } else {
        "Site already initialized"
    });
    human.push_summary("Path", root.display().to_string());
    if let Some(name) = options.name.as_ref() {
        human.push_summary("Name", name.clone());
    }
    human.push_next_step("obra auth signup --email <email> --name <name> --password <password>");
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "init",
        &output,
        Some(&human),
    )
}
