//! HTTP access to the teacher backend.
//!
//! `ApiClient` handles JSON requests (timeout, cancellation, GET retry),
//! `Uploader` handles multipart uploads with progress, and `TeacherApi`
//! maps each endpoint to typed calls on top of both.

pub mod client;
pub mod envelope;
pub mod query;
pub mod retry;
pub mod teacher;
pub mod types;
pub mod upload;

pub use client::{ApiClient, Method, RequestOptions};
pub use envelope::Envelope;
pub use query::build_query;
pub use retry::{AttemptFailure, RetryDecision, RetryPolicy};
pub use teacher::{AssignmentWithFile, TeacherApi};
pub use types::{
    Analysis, Assignment, BreakdownItem, CreatedAssignment, Group, JoinRequest, JoinStatus,
    NewAssignment, Submission, Teacher, UploadMeta,
};
pub use upload::{UploadFile, UploadForm, UploadOptions, UploadProgress, Uploader};
