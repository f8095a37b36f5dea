//! Per-session state and the in-process session registry

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use super::dataset::Dataset;
use crate::logic::detection::{Detector, Verdict};
use crate::logic::navigation::Page;

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub page: Page,
    pub user: Option<String>,
    pub remembered_user: Option<String>,
    pub detector: Option<Arc<Detector>>,
    pub staged_dataset: Option<Arc<Dataset>>,
    pub datasets_uploaded: u64,
    pub test_files_checked: u64,
    pub last_result: Option<Verdict>,
}

/// Counters shown on the home page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub datasets_uploaded: u64,
    pub test_files_checked: u64,
    pub last_result: String,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            page: Page::default(),
            user: None,
            remembered_user: None,
            detector: None,
            staged_dataset: None,
            datasets_uploaded: 0,
            test_files_checked: 0,
            last_result: None,
        }
    }

    /// Feature columns of the current model, if any
    pub fn features(&self) -> Option<&[String]> {
        self.detector.as_deref().map(Detector::features)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            datasets_uploaded: self.datasets_uploaded,
            test_files_checked: self.test_files_checked,
            last_result: self
                .last_result
                .map(|v| v.as_str().to_string())
                .unwrap_or_else(|| "None".to_string()),
        }
    }

    pub fn log_in(&mut self, username: &str, remember: bool) {
        self.user = Some(username.to_string());
        if remember {
            self.remembered_user = Some(username.to_string());
        }
    }

    /// Counters, last result and the trained model outlive the login
    pub fn log_out(&mut self) {
        self.user = None;
    }

    pub fn record_training(&mut self, detector: Detector) {
        self.detector = Some(Arc::new(detector));
        self.datasets_uploaded += 1;
    }

    pub fn record_detection(&mut self, verdict: Verdict) {
        self.test_files_checked += 1;
        self.last_result = Some(verdict);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

struct Entry {
    session: Session,
    last_seen: Instant,
}

impl Entry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }
}

/// All live sessions, keyed by id. A session idle for longer than `ttl` is
/// treated as gone and dropped on the next access or sweep.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Start a session with default state
    pub fn create(&self) -> Session {
        let session = Session::new();
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        sessions.retain(|_, entry| !entry.is_expired(self.ttl, now));
        sessions.insert(session.id, Entry { session: session.clone(), last_seen: now });
        session
    }

    /// Mark a session as active. Returns false (and drops the entry) when it
    /// is unknown or has expired.
    pub fn touch(&self, id: Uuid) -> bool {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&id) {
            Some(entry) if !entry.is_expired(self.ttl, now) => {
                entry.last_seen = now;
                true
            }
            Some(_) => {
                sessions.remove(&id);
                tracing::debug!("Session {} expired", id);
                false
            }
            None => false,
        }
    }

    /// Snapshot of a live session
    pub fn get(&self, id: Uuid) -> Option<Session> {
        let now = Instant::now();
        self.sessions
            .read()
            .get(&id)
            .filter(|entry| !entry.is_expired(self.ttl, now))
            .map(|entry| entry.session.clone())
    }

    /// Mutate a session in place. `f` runs under the write lock, so it must
    /// not block; it either fully applies or, by returning `Err`, leaves the
    /// session as it was.
    pub fn update<T, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<T, E>,
    ) -> Option<Result<T, E>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        if sessions.get(&id)?.is_expired(self.ttl, now) {
            sessions.remove(&id);
            return None;
        }
        let entry = sessions.get_mut(&id)?;

        let mut draft = entry.session.clone();
        let result = f(&mut draft);
        if result.is_ok() {
            entry.session = draft;
        }
        entry.last_seen = now;
        Some(result)
    }

    /// Drop every expired session; returns how many were removed
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| !entry.is_expired(self.ttl, now));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
