//! Assignments of a group, their submissions and grading.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::api::{
    Analysis, Assignment, AssignmentWithFile, Submission, TeacherApi, UploadFile, UploadOptions,
};
use crate::error::ApiError;
use crate::poller::{callback, Foreground, Poller};

pub const MIN_TITLE_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Form contents for a new assignment.
#[derive(Debug)]
pub struct AssignmentDraft {
    pub title: String,
    pub description: String,
    pub file: Option<UploadFile>,
}

/// Checks run before any request is made.
pub fn validate_draft(title: &str, description: &str, has_file: bool) -> Result<(), ApiError> {
    if title.trim().chars().count() < MIN_TITLE_CHARS {
        return Err(ApiError::Validation(format!(
            "Title must be at least {} characters.",
            MIN_TITLE_CHARS
        )));
    }
    if description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
        return Err(ApiError::Validation(format!(
            "Description must be at least {} characters.",
            MIN_DESCRIPTION_CHARS
        )));
    }
    if !has_file {
        return Err(ApiError::Validation(
            "An assignment file is required.".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_score(score: f64, max: f64) -> Result<(), ApiError> {
    if !score.is_finite() || score < 0.0 || score > max {
        return Err(ApiError::Validation(format!(
            "Score must be between 0 and {}.",
            max
        )));
    }
    Ok(())
}

pub struct AssignmentsView {
    api: TeacherApi,
    group_id: i64,
    pub assignments: Vec<Assignment>,
    pub loading: bool,
    pub err: Option<String>,
    /// Short success message, shown once.
    pub notice: Option<String>,
    pub analysis: Option<Analysis>,
    pub analyzing: bool,
    pub creating: bool,
    pub open_assignment: Option<i64>,
    pub submissions: Vec<Submission>,
    pub submissions_loading: bool,
    pub busy_submission: Option<i64>,
}

impl AssignmentsView {
    pub fn new(api: TeacherApi, group_id: i64) -> Self {
        Self {
            api,
            group_id,
            assignments: Vec::new(),
            loading: true,
            err: None,
            notice: None,
            analysis: None,
            analyzing: false,
            creating: false,
            open_assignment: None,
            submissions: Vec::new(),
            submissions_loading: false,
            busy_submission: None,
        }
    }

    /// Reload the assignment list. `silent` keeps the loading flag untouched.
    pub async fn load(&mut self, silent: bool) {
        if !silent {
            self.loading = true;
        }
        self.err = None;
        match self.api.assignments(self.group_id, None).await {
            Ok(list) => self.assignments = list,
            Err(e) => self.err = Some(e.to_string()),
        }
        if !silent {
            self.loading = false;
        }
    }

    pub async fn load_submissions(&mut self, assignment_id: i64, silent: bool) {
        if !silent {
            self.submissions_loading = true;
        }
        match self.api.submissions(assignment_id, None).await {
            Ok(list) => self.submissions = list,
            Err(e) => {
                self.err = Some(e.to_string());
                self.submissions.clear();
            }
        }
        if !silent {
            self.submissions_loading = false;
        }
    }

    /// Poll target: refresh the open submissions panel, if any.
    ///
    /// The view is unlocked while the request is in flight; a response for
    /// a panel that was closed or switched meanwhile is dropped.
    pub async fn refresh_open_submissions(view: &Mutex<Self>) {
        let (api, id) = {
            let view = view.lock().await;
            match (view.busy_submission, view.open_assignment) {
                (None, Some(id)) => (view.api.clone(), id),
                _ => return,
            }
        };

        let result = api.submissions(id, None).await;

        let mut view = view.lock().await;
        match result {
            Ok(list) if view.open_assignment == Some(id) && view.busy_submission.is_none() => {
                view.submissions = list;
            }
            Ok(_) => debug!(assignment_id = id, "Dropped submissions for a stale panel"),
            Err(e) => debug!(assignment_id = id, error = %e, "Submission refresh failed"),
        }
    }

    /// Toggle the submissions panel for `assignment_id`.
    pub async fn open_submissions(&mut self, assignment_id: i64) {
        if self.open_assignment == Some(assignment_id) {
            self.open_assignment = None;
            return;
        }
        self.open_assignment = Some(assignment_id);
        self.load_submissions(assignment_id, false).await;
    }

    pub async fn analyze(&mut self, title: &str, description: &str) -> Option<Analysis> {
        if self.analyzing {
            return None;
        }
        let title = title.trim();
        if title.chars().count() < MIN_TITLE_CHARS {
            self.err = Some(format!(
                "Title must be at least {} characters.",
                MIN_TITLE_CHARS
            ));
            return None;
        }

        self.err = None;
        self.analyzing = true;
        let analysis = match self.api.analyze_assignment(title, description.trim()).await {
            Ok(analysis) => {
                self.analysis = analysis.clone();
                self.notice = Some("AI analysis ready".to_string());
                analysis
            }
            Err(e) => {
                self.err = Some(e.to_string());
                None
            }
        };
        self.analyzing = false;
        analysis
    }

    /// Validate, then create the assignment with its file in one request.
    pub async fn create(&mut self, draft: AssignmentDraft, opts: UploadOptions) -> bool {
        if self.creating {
            return false;
        }
        self.err = None;

        let title = draft.title.trim().to_string();
        let description = draft.description.trim().to_string();
        if let Err(e) = validate_draft(&title, &description, draft.file.is_some()) {
            self.err = Some(e.to_string());
            return false;
        }
        let Some(file) = draft.file else {
            return false;
        };

        self.creating = true;
        let input = AssignmentWithFile {
            group_id: self.group_id,
            title,
            description,
            file,
        };
        let created = match self.api.create_assignment_with_file(input, opts).await {
            Ok(created) => {
                if created.analysis.is_some() {
                    self.analysis = created.analysis;
                }
                self.notice = Some("Assignment created".to_string());
                self.load(true).await;
                true
            }
            Err(e) => {
                self.err = Some(e.to_string());
                false
            }
        };
        self.creating = false;
        created
    }

    pub async fn delete(&mut self, assignment_id: i64) -> bool {
        self.err = None;
        match self.api.delete_assignment(assignment_id).await {
            Ok(()) => {
                self.notice = Some("Assignment deleted".to_string());
                if self.open_assignment == Some(assignment_id) {
                    self.open_assignment = None;
                    self.submissions.clear();
                }
                self.load(true).await;
                true
            }
            Err(e) => {
                self.err = Some(e.to_string());
                false
            }
        }
    }

    /// Ask the AI to grade one submission, then refresh the panel.
    pub async fn grade(&mut self, submission_id: i64) -> bool {
        if self.busy_submission.is_some() {
            return false;
        }
        self.busy_submission = Some(submission_id);
        self.err = None;
        let graded = match self.api.grade_submission(submission_id).await {
            Ok(()) => {
                self.notice = Some("AI grade ready".to_string());
                self.reload_open_panel().await;
                true
            }
            Err(e) => {
                self.err = Some(e.to_string());
                false
            }
        };
        self.busy_submission = None;
        graded
    }

    /// Store the teacher's own score and feedback. A `None` score clears
    /// the override so the AI score shows again.
    pub async fn override_grade(
        &mut self,
        submission_id: i64,
        score: Option<f64>,
        feedback: Option<&str>,
    ) -> bool {
        if self.busy_submission.is_some() {
            return false;
        }
        self.err = None;

        let max = self
            .submissions
            .iter()
            .find(|s| s.id == submission_id)
            .map_or(f64::MAX, Submission::max);
        if let Some(Err(e)) = score.map(|score| validate_score(score, max)) {
            self.err = Some(e.to_string());
            return false;
        }

        self.busy_submission = Some(submission_id);
        let saved = match self.api.override_grade(submission_id, score, feedback).await {
            Ok(()) => {
                self.notice = Some("Override saved".to_string());
                self.reload_open_panel().await;
                true
            }
            Err(e) => {
                self.err = Some(e.to_string());
                false
            }
        };
        self.busy_submission = None;
        saved
    }

    async fn reload_open_panel(&mut self) {
        if let Some(id) = self.open_assignment {
            self.load_submissions(id, true).await;
        }
    }

    /// Poller that keeps the open submissions panel fresh.
    pub fn poller(
        view: Arc<Mutex<Self>>,
        interval: Duration,
        foreground: Arc<dyn Foreground>,
        run_on_focus: bool,
    ) -> Poller {
        let cb = callback(move || {
            let view = Arc::clone(&view);
            async move {
                Self::refresh_open_submissions(&view).await;
            }
        });
        Poller::new(interval, foreground, run_on_focus, cb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_needs_title_description_and_file() {
        assert!(validate_draft("ab", "long enough text", true).is_err());
        assert!(validate_draft("Essay", "short", true).is_err());
        let err = validate_draft("Essay", "Describe the water cycle", false).unwrap_err();
        assert!(err.is_validation());
        assert!(validate_draft("Essay", "Describe the water cycle", true).is_ok());
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        assert!(validate_draft("Ўқи", "Matnni o'qing va tahlil qiling", true).is_ok());
    }

    #[test]
    fn score_bounds() {
        assert!(validate_score(0.0, 100.0).is_ok());
        assert!(validate_score(100.0, 100.0).is_ok());
        assert!(validate_score(-1.0, 100.0).is_err());
        assert!(validate_score(101.0, 100.0).is_err());
        assert!(validate_score(f64::NAN, 100.0).is_err());
    }
}
