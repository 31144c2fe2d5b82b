//! Authenticated teacher state, owned by one `Session` handle.
//!
//! The session moves `Init -> Booting -> Ready` once, on the first
//! `refresh()`. After that only the identity changes, through `refresh`,
//! `login` and `logout`. Readers take snapshots or subscribe.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::{TeacherApi, Teacher};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, no identity check issued yet.
    Init,
    /// First identity check in flight.
    Booting,
    /// First identity check resolved.
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub teacher: Option<Teacher>,
    pub phase: SessionPhase,
}

impl SessionSnapshot {
    /// True until the first identity check resolves.
    ///
    /// "Booting" is not the same as "signed out": callers must wait.
    pub fn booting(&self) -> bool {
        self.phase != SessionPhase::Ready
    }

    pub fn is_authenticated(&self) -> bool {
        self.teacher.is_some()
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            teacher: None,
            phase: SessionPhase::Init,
        }
    }
}

/// Cloneable handle to the session; clones share state.
#[derive(Clone)]
pub struct Session {
    api: TeacherApi,
    state: Arc<watch::Sender<SessionSnapshot>>,
}

impl Session {
    pub fn new(api: TeacherApi) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());
        Self {
            api,
            state: Arc::new(state),
        }
    }

    pub fn api(&self) -> &TeacherApi {
        &self.api
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn teacher(&self) -> Option<Teacher> {
        self.state.borrow().teacher.clone()
    }

    pub fn booting(&self) -> bool {
        self.state.borrow().booting()
    }

    /// Receive every change to the session.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Wait until the first identity check resolved.
    pub async fn ready(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        let snapshot = match rx.wait_for(|s| !s.booting()).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Re-check the identity with the backend.
    ///
    /// Any failure, including "not signed in", leaves the session without
    /// a teacher. Never fails.
    pub async fn refresh(&self) {
        self.state.send_modify(|s| {
            if s.phase == SessionPhase::Init {
                s.phase = SessionPhase::Booting;
            }
        });

        let teacher = match self.api.me(None).await {
            Ok(teacher) => Some(teacher),
            Err(e) => {
                debug!(error = %e, "No active session");
                None
            }
        };

        self.state.send_modify(|s| {
            if s.phase != SessionPhase::Ready {
                info!(authenticated = teacher.is_some(), "Session boot complete");
            }
            s.teacher = teacher;
            s.phase = SessionPhase::Ready;
        });
    }

    /// Sign in. On failure the session stays signed out and the error is returned.
    pub async fn login(&self, login: &str, password: &str) -> Result<Teacher, ApiError> {
        let login = login.trim();
        if login.is_empty() || password.is_empty() {
            return Err(ApiError::Validation("Enter login and password".to_string()));
        }

        let teacher = self.api.login(login, password).await?;
        info!(teacher_id = teacher.id, "Signed in");
        self.state.send_modify(|s| {
            s.teacher = Some(teacher.clone());
            s.phase = SessionPhase::Ready;
        });
        Ok(teacher)
    }

    /// Sign out. Local identity is cleared only once the backend confirmed.
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.api.logout().await?;
        self.state.send_modify(|s| s.teacher = None);
        info!("Signed out");
        Ok(())
    }
}
