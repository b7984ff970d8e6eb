//! Storage layer for obra
//!
//! A site directory holds all shared state under `.obra/`. The layout
//! plays the role of a small document store: one JSON registry per
//! collection, fetched by id or by equality filter, mutated through
//! locked read-modify-write cycles.
//!
//! # Directory Structure
//!
//! ```text
//! .obra/
//!   session                     # Signed-in user id (per machine)
//!   users.json                  # Registered users
//!   projects.json               # Projects
//!   members.json                # Memberships and pending invitations
//!   tasks.json                  # Tasks
//!   materials.json              # Material inventory
//!   notifications.json          # Due-date change notifications
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Name of the site data directory
pub const DATA_DIR: &str = ".obra";

/// Storage manager for a site directory
#[derive(Debug, Clone)]
pub struct Storage {
    /// Path to the site root (where `.obra/` lives)
    site_root: PathBuf,
}

impl Storage {
    /// Create a storage manager rooted at the given site directory
    pub fn new(site_root: PathBuf) -> Self {
        Self { site_root }
    }

    /// Open an initialized site, walking up from `start` until a
    /// directory containing `.obra/` is found.
    pub fn discover(start: Option<&Path>) -> Result<Self> {
        let start = match start {
            Some(path) => path.to_path_buf(),
            None => std::env::current_dir()?,
        };

        let mut current = start.clone();
        loop {
            if current.join(DATA_DIR).is_dir() {
                return Ok(Self::new(current));
            }
            if !current.pop() {
                return Err(Error::NotASite(start));
            }
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    /// Path to the site root directory
    pub fn site_root(&self) -> &Path {
        &self.site_root
    }

    /// Path to the `.obra/` data directory
    pub fn data_dir(&self) -> PathBuf {
        self.site_root.join(DATA_DIR)
    }

    /// Path to the signed-in session file
    pub fn session_file(&self) -> PathBuf {
        self.data_dir().join("session")
    }

    /// Path to the users registry
    pub fn users_file(&self) -> PathBuf {
        self.data_dir().join("users.json")
    }

    /// Path to the projects registry
    pub fn projects_file(&self) -> PathBuf {
        self.data_dir().join("projects.json")
    }

    /// Path to the memberships registry
    pub fn members_file(&self) -> PathBuf {
        self.data_dir().join("members.json")
    }

    /// Path to the tasks registry
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir().join("tasks.json")
    }

    /// Path to the materials registry
    pub fn materials_file(&self) -> PathBuf {
        self.data_dir().join("materials.json")
    }

    /// Path to the notifications registry
    pub fn notifications_file(&self) -> PathBuf {
        self.data_dir().join("notifications.json")
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize the `.obra/` directory structure
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(self.data_dir())?;
        Ok(())
    }

    /// Check if the site has been initialized
    pub fn is_initialized(&self) -> bool {
        self.data_dir().is_dir()
    }

    // =========================================================================
    // File I/O helpers (atomic writes for safety)
    // =========================================================================

    /// Write JSON data atomically (write to temp, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    /// Read JSON data from a file
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        let data: T = serde_json::from_str(&content)?;
        Ok(data)
    }

    /// Read a registry file, or its default when absent
    pub fn read_registry<R>(&self, path: &Path) -> Result<R>
    where
        R: Default + DeserializeOwned,
    {
        if !path.exists() {
            return Ok(R::default());
        }
        self.read_json(path)
    }

    /// Locked read-modify-write cycle over a registry file
    ///
    /// Acquires the sidecar lock, loads the registry (default when the
    /// file is absent), applies `f`, and writes the result back
    /// atomically. Concurrent obra processes serialize here.
    pub fn update_registry<R, T, F>(&self, path: &Path, f: F) -> Result<T>
    where
        R: Default + Serialize + DeserializeOwned,
        F: FnOnce(&mut R) -> Result<T>,
    {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let _lock = FileLock::acquire(lock::lock_path(path), DEFAULT_LOCK_TIMEOUT_MS)?;

        let mut registry: R = self.read_registry(path)?;
        let result = f(&mut registry)?;

        let json = serde_json::to_string_pretty(&registry)?;
        lock::write_atomic(path, json.as_bytes())?;

        Ok(result)
    }

    // =========================================================================
    // Session persistence
    // =========================================================================

    /// Read the signed-in user id, if any
    pub fn read_session(&self) -> Option<String> {
        let raw = fs::read_to_string(self.session_file()).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Persist the signed-in user id
    pub fn write_session(&self, user_id: &str) -> Result<()> {
        self.init()?;
        lock::write_atomic(self.session_file(), format!("{user_id}\n").as_bytes())
    }

    /// Remove the session file; returns whether one existed
    pub fn clear_session(&self) -> Result<bool> {
        let path = self.session_file();
        if path.exists() {
            fs::remove_file(path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn storage_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let storage = Storage::new(root.clone());

        assert_eq!(storage.data_dir(), root.join(".obra"));
        assert_eq!(storage.users_file(), root.join(".obra/users.json"));
        assert_eq!(storage.projects_file(), root.join(".obra/projects.json"));
        assert_eq!(storage.tasks_file(), root.join(".obra/tasks.json"));
        assert_eq!(storage.session_file(), root.join(".obra/session"));
    }

    #[test]
    fn discover_walks_up() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let storage = Storage::new(root.clone());
        storage.init().unwrap();

        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = Storage::discover(Some(&nested)).unwrap();
        assert_eq!(found.site_root(), root);
    }

    #[test]
    fn discover_fails_outside_site() {
        let temp = TempDir::new().unwrap();
        let err = Storage::discover(Some(temp.path())).unwrap_err();
        match err {
            Error::NotASite(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn update_registry_round_trip() {
        #[derive(Default, serde::Serialize, serde::Deserialize)]
        struct Registry {
            entries: Vec<String>,
        }

        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());
        storage.init().unwrap();

        let path = storage.users_file();
        storage
            .update_registry(&path, |registry: &mut Registry| {
                registry.entries.push("one".to_string());
                Ok(())
            })
            .unwrap();
        storage
            .update_registry(&path, |registry: &mut Registry| {
                registry.entries.push("two".to_string());
                Ok(())
            })
            .unwrap();

        let registry: Registry = storage.read_registry(&path).unwrap();
        assert_eq!(registry.entries, vec!["one", "two"]);
    }

    #[test]
    fn session_round_trip() {
        let temp = TempDir::new().unwrap();
        let storage = Storage::new(temp.path().to_path_buf());

        assert!(storage.read_session().is_none());
        storage.write_session("user-1").unwrap();
        assert_eq!(storage.read_session(), Some("user-1".to_string()));
        assert!(storage.clear_session().unwrap());
        assert!(storage.read_session().is_none());
        assert!(!storage.clear_session().unwrap());
    }
}
