//! User accounts and the signed-in session.
//!
//! Every rule-evaluating call takes the acting user explicitly; the
//! session file only exists so the CLI can resolve who is acting.
//! Resolution order:
//! 1) Persisted session in `.obra/session`
//! 2) Nothing: the command fails with `NotAuthenticated`

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHasher};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::Storage;

const MIN_PASSWORD_LEN: usize = 6;

/// A registered user, as stored in the users registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public view of a user, safe to emit
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<&UserRecord> for UserProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            created_at: user.created_at,
        }
    }
}

/// Registry of all users on the site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersRegistry {
    pub users: Vec<UserRecord>,
}

impl UsersRegistry {
    pub fn find_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&UserRecord> {
        self.users.iter().find(|user| user.id == id)
    }
}

/// Store for accounts and the per-machine session
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: Storage,
}

impl SessionStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Register a new account and sign it in
    pub fn sign_up(&self, email: &str, username: &str, password: &str) -> Result<UserProfile> {
        let email = normalize_email(email)?;
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Validation("display name cannot be empty".to_string()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: email.clone(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
            created_at: Utc::now(),
        };

        let profile = self.storage.update_registry(
            &self.storage.users_file(),
            |registry: &mut UsersRegistry| {
                if registry.find_by_email(&email).is_some() {
                    return Err(Error::Validation(format!(
                        "email already registered: {email}"
                    )));
                }
                let profile = UserProfile::from(&record);
                registry.users.push(record);
                Ok(profile)
            },
        )?;

        self.storage.write_session(&profile.id)?;
        Ok(profile)
    }

    /// Sign in with email and password
    pub fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile> {
        let email = normalize_email(email)?;
        let registry: UsersRegistry = self.storage.read_registry(&self.storage.users_file())?;
        let user = registry
            .find_by_email(&email)
            .ok_or(Error::InvalidCredentials)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(Error::InvalidCredentials);
        }

        self.storage.write_session(&user.id)?;
        Ok(UserProfile::from(user))
    }

    /// Clear the session; returns whether one existed
    pub fn sign_out(&self) -> Result<bool> {
        self.storage.clear_session()
    }

    /// The signed-in user, or `NotAuthenticated`
    pub fn current_user(&self) -> Result<UserProfile> {
        let user_id = self.storage.read_session().ok_or(Error::NotAuthenticated)?;
        let registry: UsersRegistry = self.storage.read_registry(&self.storage.users_file())?;
        let user = registry
            .find_by_id(&user_id)
            .ok_or(Error::NotAuthenticated)?;
        Ok(UserProfile::from(user))
    }

    /// Change the signed-in user's password, re-authenticating first
    pub fn change_password(&self, current: &str, new: &str) -> Result<()> {
        let acting = self.current_user()?;
        if new.len() < MIN_PASSWORD_LEN {
            return Err(Error::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        self.storage.update_registry(
            &self.storage.users_file(),
            |registry: &mut UsersRegistry| {
                let user = registry
                    .users
                    .iter_mut()
                    .find(|user| user.id == acting.id)
                    .ok_or(Error::NotAuthenticated)?;
                if !verify_password(current, &user.password_hash)? {
                    return Err(Error::InvalidCredentials);
                }
                user.password_hash = hash_password(new)?;
                Ok(())
            },
        )
    }

    /// Look up a user's public profile by id
    pub fn profile(&self, user_id: &str) -> Result<UserProfile> {
        let registry: UsersRegistry = self.storage.read_registry(&self.storage.users_file())?;
        registry
            .find_by_id(user_id)
            .map(UserProfile::from)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    /// Look up a user's public profile by email, if registered
    pub fn profile_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let email = normalize_email(email)?;
        let registry: UsersRegistry = self.storage.read_registry(&self.storage.users_file())?;
        Ok(registry.find_by_email(&email).map(UserProfile::from))
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let trimmed = email.trim().to_ascii_lowercase();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(Error::Validation(format!("invalid email: '{}'", email.trim())));
    }
    Ok(trimmed)
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| Error::PasswordHash(err.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|err| Error::PasswordHash(err.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path().to_path_buf());
        storage.init().expect("init");
        (dir, SessionStore::new(storage))
    }

    #[test]
    fn sign_up_then_sign_in() {
        let (_dir, store) = setup_store();
        let profile = store
            .sign_up("ana@example.com", "Ana", "hunter22")
            .expect("sign up");
        assert_eq!(profile.email, "ana@example.com");

        store.sign_out().expect("sign out");
        let again = store.sign_in("Ana@Example.com", "hunter22").expect("sign in");
        assert_eq!(again.id, profile.id);
        assert_eq!(store.current_user().expect("current").id, profile.id);
    }

    #[test]
    fn wrong_password_rejected() {
        let (_dir, store) = setup_store();
        store
            .sign_up("ana@example.com", "Ana", "hunter22")
            .expect("sign up");
        let err = store.sign_in("ana@example.com", "wrong!!").expect_err("bad password");
        match err {
            Error::InvalidCredentials => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_email_rejected() {
        let (_dir, store) = setup_store();
        store
            .sign_up("ana@example.com", "Ana", "hunter22")
            .expect("sign up");
        let err = store
            .sign_up("ANA@example.com", "Other", "hunter23")
            .expect_err("duplicate email");
        match err {
            Error::Validation(_) => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn current_user_requires_session() {
        let (_dir, store) = setup_store();
        match store.current_user() {
            Err(Error::NotAuthenticated) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn change_password_reauthenticates() {
        let (_dir, store) = setup_store();
        store
            .sign_up("ana@example.com", "Ana", "hunter22")
            .expect("sign up");

        let err = store
            .change_password("not-the-password", "newpass1")
            .expect_err("wrong current password");
        match err {
            Error::InvalidCredentials => {}
            other => panic!("unexpected error: {other:?}"),
        }

        store
            .change_password("hunter22", "newpass1")
            .expect("change password");
        store.sign_out().expect("sign out");
        store
            .sign_in("ana@example.com", "newpass1")
            .expect("sign in with new password");
    }
}
