use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// An initialized site directory with helpers for driving the CLI.
///
/// The session file is per site, so tests switch users by logging in
/// as each account before acting.
pub struct TestSite {
    dir: TempDir,
}

#[allow(dead_code)]
impl TestSite {
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let site = Self { dir };
        site.cmd().arg("init").assert().success();
        Ok(site)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A command rooted at this site
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("obra").expect("obra binary");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run a command with --json and return the envelope's data field
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let envelope: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(envelope["status"].as_str(), Some("success"));
        envelope["data"].clone()
    }

    /// Sign up an account (leaves it signed in); returns the user id
    pub fn signup(&self, email: &str, name: &str) -> String {
        let data = self.json(&[
            "auth",
            "signup",
            "--email",
            email,
            "--name",
            name,
            "--password",
            "hunter22",
        ]);
        data["id"].as_str().expect("user id").to_string()
    }

    /// Switch the session to an existing account
    pub fn login(&self, email: &str) {
        self.cmd()
            .args(["auth", "login", "--email", email, "--password", "hunter22"])
            .assert()
            .success();
    }

    /// Create a project spanning the next year; returns its id
    pub fn create_project(&self, name: &str) -> String {
        let data = self.json(&[
            "project",
            "new",
            name,
            "--start",
            &dmy_from_today(0),
            "--end",
            &dmy_from_today(365),
        ]);
        data["id"].as_str().expect("project id").to_string()
    }

    /// Invite an email and accept as that user; returns the membership id
    pub fn add_member(&self, project_id: &str, email: &str, role: &str) -> String {
        let invitation = self.json(&["member", "invite", project_id, "--email", email, "--role", role]);
        let invitation_id = invitation["id"].as_str().expect("invitation id");
        self.login(email);
        let member = self.json(&["member", "accept", invitation_id]);
        member["id"].as_str().expect("member id").to_string()
    }
}

/// Format today + offset_days as DD-MM-YYYY
#[allow(dead_code)]
pub fn dmy_from_today(offset_days: i64) -> String {
    (chrono::Local::now().date_naive() + chrono::Duration::days(offset_days))
        .format("%d-%m-%Y")
        .to_string()
}
