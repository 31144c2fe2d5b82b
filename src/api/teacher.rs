//! Typed wrappers over every teacher endpoint.

use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::api::client::{ApiClient, RequestOptions};
use crate::api::envelope::Envelope;
use crate::api::query::build_query;
use crate::api::types::{
    Analysis, Assignment, CreatedAssignment, Group, JoinRequest, JoinStatus, NewAssignment,
    Submission, Teacher, UploadMeta,
};
use crate::api::upload::{UploadFile, UploadForm, UploadOptions, Uploader};
use crate::config::Config;
use crate::error::ApiError;

const MUTATION_TIMEOUT_MS: u64 = 20_000;
const ANALYZE_TIMEOUT_MS: u64 = 30_000;
const CREATE_ASSIGNMENT_TIMEOUT_MS: u64 = 25_000;
const GRADE_TIMEOUT_MS: u64 = 35_000;

/// Fields for the one-shot multipart create endpoint.
#[derive(Debug)]
pub struct AssignmentWithFile {
    pub group_id: i64,
    pub title: String,
    pub description: String,
    pub file: UploadFile,
}

#[derive(Debug, Clone)]
pub struct TeacherApi {
    client: ApiClient,
    uploader: Uploader,
}

impl TeacherApi {
    pub fn new(client: ApiClient, uploader: Uploader) -> Self {
        Self { client, uploader }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        config.validate()?;
        let client = ApiClient::new(&config.api)?;
        let uploader = Uploader::new(client.clone(), &config.upload);
        Ok(Self::new(client, uploader))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    async fn post(&self, path: &str, body: serde_json::Value, timeout_ms: Option<u64>) -> Result<Envelope, ApiError> {
        let mut opts = RequestOptions::post().json(&body)?;
        if let Some(ms) = timeout_ms {
            opts = opts.timeout_ms(ms);
        }
        self.client.request(path, opts).await
    }

    async fn get(&self, path: &str, cancel: Option<CancellationToken>) -> Result<Envelope, ApiError> {
        self.client
            .request(path, RequestOptions::get().with_cancel(cancel))
            .await
    }

    // auth

    pub async fn login(&self, login: &str, password: &str) -> Result<Teacher, ApiError> {
        self.post(
            "/auth/login.php",
            json!({ "login": login, "password": password }),
            Some(MUTATION_TIMEOUT_MS),
        )
        .await?
        .require("teacher")
    }

    pub async fn me(&self, cancel: Option<CancellationToken>) -> Result<Teacher, ApiError> {
        self.get("/auth/me.php", cancel).await?.require("teacher")
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.client
            .request("/auth/logout.php", RequestOptions::post())
            .await?;
        Ok(())
    }

    // groups

    pub async fn groups(&self, cancel: Option<CancellationToken>) -> Result<Vec<Group>, ApiError> {
        self.get("/groups/list.php", cancel).await?.list("groups")
    }

    pub async fn create_group(&self, name: &str) -> Result<Option<Group>, ApiError> {
        self.post("/groups/create.php", json!({ "name": name }), Some(MUTATION_TIMEOUT_MS))
            .await?
            .get("group")
    }

    pub async fn group_detail(&self, id: i64, cancel: Option<CancellationToken>) -> Result<Group, ApiError> {
        let path = format!("/groups/detail.php{}", build_query([("id", Some(id.to_string()))]));
        self.get(&path, cancel).await?.require("group")
    }

    /// Issue a fresh join code; returns the new code.
    pub async fn rotate_code(&self, group_id: i64) -> Result<String, ApiError> {
        self.post(
            "/groups/rotate_code.php",
            json!({ "group_id": group_id }),
            Some(MUTATION_TIMEOUT_MS),
        )
        .await?
        .require("code")
    }

    // join requests

    pub async fn join_requests(
        &self,
        group_id: i64,
        status: JoinStatus,
        cancel: Option<CancellationToken>,
    ) -> Result<Vec<JoinRequest>, ApiError> {
        let path = format!(
            "/groups/join_requests.php{}",
            build_query([
                ("group_id", Some(group_id.to_string())),
                ("status", Some(status.as_str().to_string())),
            ])
        );
        self.get(&path, cancel).await?.list("requests")
    }

    pub async fn approve_student(&self, group_id: i64, student_id: i64) -> Result<(), ApiError> {
        self.post(
            "/groups/approve_student.php",
            json!({ "group_id": group_id, "student_id": student_id }),
            Some(MUTATION_TIMEOUT_MS),
        )
        .await?;
        Ok(())
    }

    pub async fn deny_student(&self, group_id: i64, student_id: i64) -> Result<(), ApiError> {
        self.post(
            "/groups/deny_student.php",
            json!({ "group_id": group_id, "student_id": student_id }),
            Some(MUTATION_TIMEOUT_MS),
        )
        .await?;
        Ok(())
    }

    // AI

    pub async fn analyze_assignment(&self, title: &str, description: &str) -> Result<Option<Analysis>, ApiError> {
        self.post(
            "/ai/analyze_assignment.php",
            json!({ "title": title, "description": description }),
            Some(ANALYZE_TIMEOUT_MS),
        )
        .await?
        .get("analysis")
    }

    // assignments

    pub async fn assignments(
        &self,
        group_id: i64,
        cancel: Option<CancellationToken>,
    ) -> Result<Vec<Assignment>, ApiError> {
        let path = format!(
            "/assignments/list.php{}",
            build_query([("group_id", Some(group_id.to_string()))])
        );
        self.get(&path, cancel).await?.list("assignments")
    }

    pub async fn create_assignment(&self, body: &NewAssignment) -> Result<CreatedAssignment, ApiError> {
        let opts = RequestOptions::post()
            .json(body)?
            .timeout_ms(CREATE_ASSIGNMENT_TIMEOUT_MS);
        let envelope = self.client.request("/assignments/create.php", opts).await?;
        created_from(&envelope)
    }

    pub async fn delete_assignment(&self, assignment_id: i64) -> Result<(), ApiError> {
        self.post(
            "/assignments/delete/",
            json!({ "assignment_id": assignment_id }),
            None,
        )
        .await?;
        Ok(())
    }

    /// Upload a file to temporary storage ahead of `create_assignment`.
    pub async fn upload_assignment_file(
        &self,
        file: UploadFile,
        opts: UploadOptions,
    ) -> Result<UploadMeta, ApiError> {
        let form = UploadForm::new().file("file", file);
        self.uploader
            .upload("/assignments/upload.php", form, opts)
            .await?
            .require("upload")
    }

    /// Create an assignment and attach its file in a single multipart call.
    pub async fn create_assignment_with_file(
        &self,
        input: AssignmentWithFile,
        opts: UploadOptions,
    ) -> Result<CreatedAssignment, ApiError> {
        let form = UploadForm::new()
            .text("group_id", input.group_id)
            .text("title", input.title)
            .text("description", input.description)
            .file("file", input.file);

        let opts = UploadOptions {
            timeout: opts.timeout.or(Some(std::time::Duration::from_millis(GRADE_TIMEOUT_MS))),
            ..opts
        };

        let envelope = self
            .uploader
            .upload("/assignments/create_with_file/index.php", form, opts)
            .await?;
        created_from(&envelope)
    }

    /// Upload the file first when there is one, then create with its metadata.
    pub async fn create_assignment_smart(
        &self,
        mut body: NewAssignment,
        file: Option<UploadFile>,
        opts: UploadOptions,
    ) -> Result<CreatedAssignment, ApiError> {
        if let Some(file) = file {
            let meta = self.upload_assignment_file(file, opts).await?;
            body.attach(meta);
        }
        self.create_assignment(&body).await
    }

    // submissions

    pub async fn submissions(
        &self,
        assignment_id: i64,
        cancel: Option<CancellationToken>,
    ) -> Result<Vec<Submission>, ApiError> {
        let path = format!(
            "/submissions/list.php{}",
            build_query([("assignment_id", Some(assignment_id.to_string()))])
        );
        self.get(&path, cancel).await?.list("submissions")
    }

    pub async fn grade_submission(&self, submission_id: i64) -> Result<(), ApiError> {
        self.post(
            "/submissions/grade.php",
            json!({ "submission_id": submission_id }),
            Some(GRADE_TIMEOUT_MS),
        )
        .await?;
        Ok(())
    }

    /// Store a teacher score; `None` clears a previous override.
    pub async fn override_grade(
        &self,
        submission_id: i64,
        teacher_score: Option<f64>,
        teacher_feedback: Option<&str>,
    ) -> Result<(), ApiError> {
        self.post(
            "/submissions/override.php",
            json!({
                "submission_id": submission_id,
                "teacher_score": teacher_score,
                "teacher_feedback": teacher_feedback.unwrap_or(""),
            }),
            Some(MUTATION_TIMEOUT_MS),
        )
        .await?;
        Ok(())
    }
}

fn created_from(envelope: &Envelope) -> Result<CreatedAssignment, ApiError> {
    let assignment_id = envelope
        .get::<serde_json::Value>("assignment_id")?
        .and_then(|v| match v {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        });

    Ok(CreatedAssignment {
        assignment_id,
        analysis: envelope.get("analysis")?,
    })
}
