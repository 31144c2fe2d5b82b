//! One group: join code, and pending/approved join requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::api::{Group, JoinRequest, JoinStatus, TeacherApi};
use crate::error::ApiError;
use crate::poller::{callback, Foreground, Poller};
use crate::views::optimistic::{MutationPhase, OptimisticRemoval, Settled};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Deny,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabCounts {
    pub pending: i64,
    pub approved: i64,
}

pub struct GroupDetailView {
    api: TeacherApi,
    group_id: i64,
    pub group: Option<Group>,
    pub tab: JoinStatus,
    pub requests: Vec<JoinRequest>,
    pub loading: bool,
    pub busy: bool,
    pub err: Option<String>,
    pub last_mutation: Option<MutationPhase>,
}

impl GroupDetailView {
    pub fn new(api: TeacherApi, group_id: i64) -> Self {
        Self {
            api,
            group_id,
            group: None,
            tab: JoinStatus::Pending,
            requests: Vec::new(),
            loading: true,
            busy: false,
            err: None,
            last_mutation: None,
        }
    }

    pub fn group_id(&self) -> i64 {
        self.group_id
    }

    pub fn join_code(&self) -> Option<&str> {
        self.group
            .as_ref()
            .map(|g| g.code.as_str())
            .filter(|c| !c.is_empty())
    }

    async fn load_group(&mut self) -> Result<(), ApiError> {
        self.group = Some(self.api.group_detail(self.group_id, None).await?);
        Ok(())
    }

    async fn load_requests(&mut self) -> Result<(), ApiError> {
        self.requests = self.api.join_requests(self.group_id, self.tab, None).await?;
        Ok(())
    }

    pub async fn load_all(&mut self) {
        if self.group_id <= 0 {
            return;
        }
        self.err = None;
        self.loading = true;
        let result = match self.load_group().await {
            Ok(()) => self.load_requests().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.err = Some(e.to_string());
        }
        self.loading = false;
    }

    /// Show another tab; only the request list is reloaded.
    pub async fn switch_tab(&mut self, tab: JoinStatus) {
        self.tab = tab;
        self.err = None;
        if let Err(e) = self.load_requests().await {
            self.err = Some(e.to_string());
            self.requests.clear();
        }
    }

    /// Background refresh used by the poller; failures keep the current list.
    pub async fn refresh_requests(&mut self) {
        if self.busy {
            return;
        }
        if let Err(e) = self.load_requests().await {
            debug!(group_id = self.group_id, error = %e, "Join request refresh failed");
        }
    }

    pub fn counts(&self) -> TabCounts {
        let listed = self.requests.len() as i64;
        TabCounts {
            pending: match self.tab {
                JoinStatus::Pending => listed,
                JoinStatus::Approved => self.group.as_ref().map_or(0, |g| g.pending_count),
            },
            approved: match self.tab {
                JoinStatus::Approved => listed,
                JoinStatus::Pending => 0,
            },
        }
    }

    /// Issue a new join code. Returns it on success.
    pub async fn rotate_code(&mut self) -> Option<String> {
        if self.busy || self.group_id <= 0 {
            return None;
        }
        self.busy = true;
        self.err = None;
        let code = match self.api.rotate_code(self.group_id).await {
            Ok(code) => {
                if let Some(group) = self.group.as_mut() {
                    group.code = code.clone();
                }
                Some(code)
            }
            Err(e) => {
                self.err = Some(e.to_string());
                None
            }
        };
        self.busy = false;
        code
    }

    pub async fn approve(&mut self, student_id: i64) -> Option<Settled> {
        self.adjudicate(student_id, Decision::Approve).await
    }

    pub async fn deny(&mut self, student_id: i64) -> Option<Settled> {
        self.adjudicate(student_id, Decision::Deny).await
    }

    /// Remove the request locally, tell the server, then reconcile.
    ///
    /// A confirmed mutation is followed by a refresh of the group and the
    /// list; a rejected one restores the item and re-fetches the list.
    /// Returns `None` while another mutation is in flight.
    async fn adjudicate(&mut self, student_id: i64, decision: Decision) -> Option<Settled> {
        if self.busy {
            return None;
        }
        self.busy = true;
        self.err = None;

        let mut removal = OptimisticRemoval::new();
        removal.apply(&mut self.requests, |r| r.student_id == student_id);

        let result = match decision {
            Decision::Approve => self.api.approve_student(self.group_id, student_id).await,
            Decision::Deny => self.api.deny_student(self.group_id, student_id).await,
        };

        let settled = removal.settle(&mut self.requests, result);
        match &settled {
            Settled::Confirmed => {
                let refreshed = match self.load_group().await {
                    Ok(()) => self.load_requests().await,
                    Err(e) => Err(e),
                };
                if let Err(e) = refreshed {
                    debug!(group_id = self.group_id, error = %e, "Refresh after mutation failed");
                }
            }
            Settled::RolledBack { error } => {
                self.err = Some(error.clone());
                if let Err(e) = self.load_requests().await {
                    debug!(group_id = self.group_id, error = %e, "Corrective re-fetch failed");
                }
            }
        }

        self.last_mutation = Some(removal.phase());
        self.busy = false;
        Some(settled)
    }

    /// Poller that keeps the join request list fresh.
    pub fn poller(
        view: Arc<Mutex<Self>>,
        interval: Duration,
        foreground: Arc<dyn Foreground>,
        run_on_focus: bool,
    ) -> Poller {
        let cb = callback(move || {
            let view = Arc::clone(&view);
            async move {
                view.lock().await.refresh_requests().await;
            }
        });
        Poller::new(interval, foreground, run_on_focus, cb)
    }
}
