//! obra - Site coordination library
//!
//! This library provides the core functionality for the obra CLI tool:
//! project, crew, task, and inventory coordination for small
//! construction teams working against a shared site directory.
//!
//! # Core Concepts
//!
//! - **Projects**: the unit of work, with a lifecycle that ends in an
//!   irreversible finalized state
//! - **Roles**: gerente, supervisor, and empleado, resolved against an
//!   explicit permission table
//! - **Tasks**: due dates, priorities, completion evidence, and the
//!   active/completed/overdue display buckets
//! - **Materials**: per-project inventory consumed by task allocations
//! - **Notifications**: a feed derived from invitations, assigned
//!   tasks, and due-date changes
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.obra.toml`
//! - `error`: Error types and result aliases
//! - `storage`: JSON registries under `.obra/` with locked writes
//! - `session`: Accounts, password hashing, and the signed-in session
//! - `permission`: Role/action table and the store-backed resolver
//! - `date`: Boundary date parsing, validity, and formatting
//! - `project`, `member`, `task`, `material`, `notification`: entity
//!   stores
//! - `weather`: Advisory thresholds and the provider client
//! - `lock`: File locking and atomic writes

pub mod cli;
pub mod config;
pub mod date;
pub mod error;
pub mod lock;
pub mod material;
pub mod member;
pub mod notification;
pub mod output;
pub mod permission;
pub mod project;
pub mod session;
pub mod storage;
pub mod task;
pub mod weather;

pub use error::{Error, Result};
