//! Payload types carried inside response envelopes.
//!
//! The backend is loose about numbers (ids and counts may arrive as
//! strings), so numeric fields go through `lenient`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_i64(value: &Value) -> Option<i64> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
            _ => None,
        }
    }

    fn to_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(to_i64(&Value::deserialize(d)?).unwrap_or(0))
    }

    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(to_i64(&Value::deserialize(d)?))
    }

    pub fn opt_float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(to_f64(&Value::deserialize(d)?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Join code students type in.
    #[serde(default)]
    pub code: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub students_count: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    pub pending_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStatus {
    Pending,
    Approved,
}

impl JoinStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JoinStatus::Pending => "pending",
            JoinStatus::Approved => "approved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default, deserialize_with = "lenient::int")]
    pub student_id: i64,
    #[serde(default, alias = "full_name", alias = "student_name")]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub max_score: Option<i64>,
    #[serde(default)]
    pub ai_type: Option<String>,
    #[serde(default)]
    pub attachment_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownItem {
    #[serde(default, alias = "criterion")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_float")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_float")]
    pub max: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default, deserialize_with = "lenient::int")]
    pub id: i64,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_float")]
    pub ai_score: Option<f64>,
    #[serde(default)]
    pub ai_feedback: Option<String>,
    #[serde(default)]
    pub ai_breakdown: Vec<BreakdownItem>,
    #[serde(default, deserialize_with = "lenient::opt_float")]
    pub teacher_score: Option<f64>,
    #[serde(default)]
    pub teacher_feedback: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_float")]
    pub max_score: Option<f64>,
}

impl Submission {
    /// Teacher override wins over the AI score.
    pub fn effective_score(&self) -> Option<f64> {
        self.teacher_score.or(self.ai_score)
    }

    /// Max score, defaulting to 100 when the backend omits it.
    pub fn max(&self) -> f64 {
        self.max_score.filter(|m| *m > 0.0).unwrap_or(100.0)
    }
}

/// AI analysis of an assignment draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub suggested_max_score: Option<i64>,
    #[serde(default)]
    pub ai_type: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub rubric: Value,
}

/// Where an uploaded file landed in temporary storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadMeta {
    pub attachment_path: String,
    #[serde(default)]
    pub attachment_name: Option<String>,
    #[serde(default)]
    pub attachment_mime: Option<String>,
}

/// Body for `create_assignment`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewAssignment {
    pub group_id: i64,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_rubric_json: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_mime: Option<String>,
}

impl NewAssignment {
    pub fn attach(&mut self, meta: UploadMeta) {
        self.attachment_path = Some(meta.attachment_path);
        self.attachment_name = meta.attachment_name;
        self.attachment_mime = meta.attachment_mime;
    }
}

/// Result of creating an assignment; the backend may include its analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedAssignment {
    pub assignment_id: Option<i64>,
    pub analysis: Option<Analysis>,
}
