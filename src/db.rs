//! Credential store - flat JSON document of username -> argon2 hash
//!
//! The whole document is read on every lookup and rewritten on every
//! registration. Registrations inside one process are serialised; separate
//! processes sharing the file are last-writer-wins.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use thiserror::Error;
use tokio::sync::Mutex;

/// Username -> PHC hash string
pub type Credentials = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("username already exists")]
    UsernameTaken,

    #[error("username and password cannot be empty")]
    EmptyField,

    #[error("credential file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("credential file is not a valid document: {0}")]
    Format(#[from] serde_json::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    /// Open the store, creating an empty document if none exists
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();

        if tokio::fs::try_exists(&path).await? {
            // Fail at startup rather than on the first login
            let raw = tokio::fs::read(&path).await?;
            serde_json::from_slice::<Credentials>(&raw)?;
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            write_document(&path, &Credentials::new()).await?;
            tracing::info!("Created empty credential store at {}", path.display());
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full mapping
    pub async fn load(&self) -> Result<Credentials, CredentialError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Credentials::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Overwrite the full mapping
    pub async fn save(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        write_document(&self.path, credentials).await
    }

    /// True iff the user exists and the password matches its stored hash
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<bool, CredentialError> {
        let credentials = self.load().await?;

        let Some(stored) = credentials.get(username) else {
            return Ok(false);
        };

        let parsed_hash = PasswordHash::new(stored)
            .map_err(|e| CredentialError::Hash(format!("stored hash for '{}' is invalid: {}", username, e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Register a new user; the first registration of a username wins
    pub async fn register(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        if username.trim().is_empty() || password.trim().is_empty() {
            return Err(CredentialError::EmptyField);
        }

        let _guard = self.write_lock.lock().await;

        let mut credentials = self.load().await?;
        if credentials.contains_key(username) {
            return Err(CredentialError::UsernameTaken);
        }

        credentials.insert(username.to_string(), hash_password(password)?);
        self.save(&credentials).await?;

        Ok(())
    }
}

/// Salted argon2 hash in PHC string format
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| CredentialError::Hash(e.to_string()))
}

async fn write_document(path: &Path, credentials: &Credentials) -> Result<(), CredentialError> {
    let body = serde_json::to_vec_pretty(credentials)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
