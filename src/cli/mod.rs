//! Command-line interface for obra
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand area is implemented in its own submodule.

use clap::{Parser, Subcommand};

use crate::error::Result;

mod auth;
mod init;
mod material;
mod member;
mod notify;
mod project;
mod task;
mod weather;

/// obra - site coordination for small construction crews
///
/// Projects, crew roles, tasks with due dates and completion evidence,
/// material inventory, and a weather advisory, all against a shared
/// site directory.
#[derive(Parser, Debug)]
#[command(name = "obra")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the site directory (defaults to the current directory)
    #[arg(long, global = true, env = "OBRA_SITE")]
    pub site: Option<std::path::PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a site directory
    Init {
        /// Site display name written to .obra.toml
        #[arg(long)]
        name: Option<String>,
    },

    /// Accounts and the signed-in session
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Crew membership and invitations
    #[command(subcommand)]
    Member(MemberCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Material inventory
    #[command(subcommand)]
    Material(MaterialCommands),

    /// Notification feed
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Weather advisory for the site
    Weather,
}

/// Auth subcommands
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Register an account and sign in
    Signup {
        /// Email address
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Password (at least 6 characters)
        #[arg(long)]
        password: String,
    },

    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Change the password (re-authenticates first)
    Passwd {
        /// Current password
        #[arg(long)]
        current: String,

        /// New password
        #[arg(long)]
        new: String,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project; you become its gerente
    New {
        /// Project name
        name: String,

        /// Client name
        #[arg(long)]
        client: Option<String>,

        /// Site location
        #[arg(long)]
        location: Option<String>,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,

        /// Start date (DD-MM-YYYY)
        #[arg(long)]
        start: String,

        /// End date (DD-MM-YYYY)
        #[arg(long)]
        end: String,
    },

    /// List projects you belong to
    List {
        /// Filter by lifecycle state: active, pending, finalized
        #[arg(long)]
        state: Option<String>,
    },

    /// Show one project
    Show {
        /// Project id
        id: String,
    },

    /// Show what you may do on a project
    Permissions {
        /// Project id
        id: String,
    },

    /// Finalize a project (gerente only, irreversible)
    Finalize {
        /// Project id
        id: String,
    },

    /// Delete a project and its memberships, tasks, and materials
    Rm {
        /// Project id
        id: String,
    },
}

/// Member subcommands
#[derive(Subcommand, Debug)]
pub enum MemberCommands {
    /// Invite an email to a project
    Invite {
        /// Project id
        project: String,

        /// Invitee email
        #[arg(long)]
        email: String,

        /// Role: gerente, supervisor, empleado
        #[arg(long, default_value = "empleado")]
        role: String,
    },

    /// Accept an invitation addressed to you
    Accept {
        /// Invitation id
        id: String,
    },

    /// Reject an invitation addressed to you
    Reject {
        /// Invitation id
        id: String,
    },

    /// Remove a member (gerente only)
    Rm {
        /// Project id
        project: String,

        /// Membership id
        id: String,
    },

    /// List accepted members of a project
    List {
        /// Project id
        project: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    New {
        /// Project id
        project: String,

        /// Task title
        title: String,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,

        /// Assignee (member email or user id)
        #[arg(long)]
        assignee: String,

        /// Priority: alta, media, baja
        #[arg(long, default_value = "media")]
        priority: String,

        /// Due date (DD-MM-YYYY)
        #[arg(long)]
        due: String,

        /// Material allocation as <material-id>:<units> (repeatable)
        #[arg(long = "material")]
        materials: Vec<String>,
    },

    /// List tasks you can see, bucketed by due date
    List {
        /// Project id
        project: String,

        /// Only one bucket: active, completed, overdue
        #[arg(long)]
        bucket: Option<String>,

        /// Filter by priority: alta, media, baja
        #[arg(long)]
        priority: Option<String>,

        /// Filter by assignee (member email or user id)
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Show one task
    Show {
        /// Task id
        id: String,
    },

    /// Move a pending task into progress
    Start {
        /// Task id
        id: String,
    },

    /// Complete a task with a comment and evidence image
    Complete {
        /// Task id
        id: String,

        /// Completion comment
        #[arg(long)]
        comment: String,

        /// Evidence image reference (URL or path)
        #[arg(long)]
        evidence: String,
    },

    /// Change a task's due date (gerente only)
    Due {
        /// Task id
        id: String,

        /// New due date (DD-MM-YYYY)
        #[arg(long)]
        date: String,

        /// Reason for the change
        #[arg(long)]
        reason: String,
    },

    /// Task statistics for a project
    Stats {
        /// Project id
        project: String,
    },
}

/// Material subcommands
#[derive(Subcommand, Debug)]
pub enum MaterialCommands {
    /// Add a material to a project's inventory
    Add {
        /// Project id
        project: String,

        /// Material name
        name: String,

        /// Unit of measure (sacos, m3, piezas, ...)
        #[arg(long)]
        unit: String,

        /// Units on hand
        #[arg(long)]
        quantity: u64,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// List a project's materials
    List {
        /// Project id
        project: String,

        /// Filter by a name substring
        #[arg(long)]
        search: Option<String>,
    },

    /// Set a material's on-hand stock
    SetStock {
        /// Material id
        id: String,

        /// New quantity (negative clamps to zero)
        #[arg(long, allow_hyphen_values = true)]
        quantity: i64,
    },
}

/// Notify subcommands
#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// Show your notification feed
    List,

    /// Mark a notification as read
    Read {
        /// Notification id
        id: String,
    },
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init { name } => init::run(init::InitOptions {
                name,
                site: self.site,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Auth(cmd) => match cmd {
                AuthCommands::Signup {
                    email,
                    name,
                    password,
                } => auth::run_signup(auth::SignupOptions {
                    email,
                    name,
                    password,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                AuthCommands::Login { email, password } => auth::run_login(auth::LoginOptions {
                    email,
                    password,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                AuthCommands::Logout => auth::run_logout(auth::LogoutOptions {
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                AuthCommands::Whoami => auth::run_whoami(auth::WhoamiOptions {
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                AuthCommands::Passwd { current, new } => auth::run_passwd(auth::PasswdOptions {
                    current,
                    new,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::New {
                    name,
                    client,
                    location,
                    description,
                    start,
                    end,
                } => project::run_new(project::NewOptions {
                    name,
                    client,
                    location,
                    description,
                    start,
                    end,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                ProjectCommands::List { state } => project::run_list(project::ListOptions {
                    state,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                ProjectCommands::Show { id } => project::run_show(project::ShowOptions {
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                ProjectCommands::Permissions { id } => {
                    project::run_permissions(project::PermissionsOptions {
                        id,
                        site: self.site,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
                ProjectCommands::Finalize { id } => {
                    project::run_finalize(project::FinalizeOptions {
                        id,
                        site: self.site,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
                ProjectCommands::Rm { id } => project::run_rm(project::RmOptions {
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Member(cmd) => match cmd {
                MemberCommands::Invite {
                    project,
                    email,
                    role,
                } => member::run_invite(member::InviteOptions {
                    project,
                    email,
                    role,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                MemberCommands::Accept { id } => member::run_accept(member::AcceptOptions {
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                MemberCommands::Reject { id } => member::run_reject(member::RejectOptions {
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                MemberCommands::Rm { project, id } => member::run_rm(member::RmOptions {
                    project,
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                MemberCommands::List { project } => member::run_list(member::ListOptions {
                    project,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::New {
                    project,
                    title,
                    description,
                    assignee,
                    priority,
                    due,
                    materials,
                } => task::run_new(task::NewOptions {
                    project,
                    title,
                    description,
                    assignee,
                    priority,
                    due,
                    materials,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::List {
                    project,
                    bucket,
                    priority,
                    assignee,
                } => task::run_list(task::ListOptions {
                    project,
                    bucket,
                    priority,
                    assignee,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions {
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Start { id } => task::run_start(task::StartOptions {
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Complete {
                    id,
                    comment,
                    evidence,
                } => task::run_complete(task::CompleteOptions {
                    id,
                    comment,
                    evidence,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Due { id, date, reason } => task::run_due(task::DueOptions {
                    id,
                    date,
                    reason,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                TaskCommands::Stats { project } => task::run_stats(task::StatsOptions {
                    project,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Material(cmd) => match cmd {
                MaterialCommands::Add {
                    project,
                    name,
                    unit,
                    quantity,
                    description,
                } => material::run_add(material::AddOptions {
                    project,
                    name,
                    unit,
                    quantity,
                    description,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                MaterialCommands::List { project, search } => {
                    material::run_list(material::ListOptions {
                        project,
                        search,
                        site: self.site,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
                MaterialCommands::SetStock { id, quantity } => {
                    material::run_set_stock(material::SetStockOptions {
                        id,
                        quantity,
                        site: self.site,
                        json: self.json,
                        quiet: self.quiet,
                    })
                }
            },
            Commands::Notify(cmd) => match cmd {
                NotifyCommands::List => notify::run_list(notify::ListOptions {
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
                NotifyCommands::Read { id } => notify::run_read(notify::ReadOptions {
                    id,
                    site: self.site,
                    json: self.json,
                    quiet: self.quiet,
                }),
            },
            Commands::Weather => weather::run(weather::WeatherOptions {
                site: self.site,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
