//! obra auth command implementations.

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::session::SessionStore;
use crate::storage::Storage;

pub struct SignupOptions {
    pub email: String,
    pub name: String,
    pub password: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct LoginOptions {
    pub email: String,
    pub password: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct LogoutOptions {
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct WhoamiOptions {
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct PasswdOptions {
    pub current: String,
    pub new: String,
    pub site: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct LogoutOutput {
    signed_out: bool,
}

#[derive(serde::Serialize)]
struct PasswdOutput {
    changed: bool,
}

fn load_store(site: Option<PathBuf>) -> Result<SessionStore> {
    let storage = Storage::discover(site.as_deref())?;
    Ok(SessionStore::new(storage))
}

pub fn run_signup(options: SignupOptions) -> Result<()> {
    let store = load_store(options.site)?;
    let profile = store.sign_up(&options.email, &options.name, &options.password)?;

    let mut human = HumanOutput::new("Account created and signed in");
    human.push_summary("User", profile.id.clone());
    human.push_summary("Email", profile.email.clone());
    human.push_summary("Name", profile.username.clone());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "auth signup",
        &profile,
        Some(&human),
    )
}

pub fn run_login(options: LoginOptions) -> Result<()> {
    let store = load_store(options.site)?;
    let profile = store.sign_in(&options.email, &options.password)?;

    let mut human = HumanOutput::new("Signed in");
    human.push_summary("User", profile.id.clone());
    human.push_summary("Email", profile.email.clone());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "auth login",
        &profile,
        Some(&human),
    )
}

pub fn run_logout(options: LogoutOptions) -> Result<()> {
    let store = load_store(options.site)?;
    let signed_out = store.sign_out()?;

    let output = LogoutOutput { signed_out };
    let human = HumanOutput::new(if signed_out {
        "Signed out"
    } else {
        "No session to sign out"
    });
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "auth logout",
        &output,
        Some(&human),
    )
}

pub fn run_whoami(options: WhoamiOptions) -> Result<()> {
    let store = load_store(options.site)?;
    let profile = store.current_user()?;

    let mut human = HumanOutput::new("Signed in as");
    human.push_summary("User", profile.id.clone());
    human.push_summary("Email", profile.email.clone());
    human.push_summary("Name", profile.username.clone());
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "auth whoami",
        &profile,
        Some(&human),
    )
}

pub fn run_passwd(options: PasswdOptions) -> Result<()> {
    let store = load_store(options.site)?;
    store.change_password(&options.current, &options.new)?;

    let output = PasswdOutput { changed: true };
    let human = HumanOutput::new("Password changed");
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "auth passwd",
        &output,
        Some(&human),
    )
}
