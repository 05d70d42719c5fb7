use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Campus branch a submission is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum University {
    Government,
    Private,
    Tech,
}

impl University {
    pub fn as_str(&self) -> &'static str {
        match self {
            University::Government => "government",
            University::Private => "private",
            University::Tech => "tech",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "government" => Some(University::Government),
            "private" => Some(University::Private),
            "tech" => Some(University::Tech),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            University::Government => "جامعة حلوان الحكومية",
            University::Private => "جامعة حلوان الأهلية",
            University::Tech => "جامعة حلوان التكنولوجية",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Suggestion,
    Inquiry,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionKind::Suggestion => "suggestion",
            SubmissionKind::Inquiry => "inquiry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "suggestion" => Some(SubmissionKind::Suggestion),
            "inquiry" => Some(SubmissionKind::Inquiry),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubmissionKind::Suggestion => "اقتراح",
            SubmissionKind::Inquiry => "استفسار",
        }
    }
}

/// Triage state. Records without a recognised status are read as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "resolved")]
    Resolved,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::InProgress => "in-progress",
            SubmissionStatus::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SubmissionStatus::Pending),
            "in-progress" => Some(SubmissionStatus::InProgress),
            "resolved" => Some(SubmissionStatus::Resolved),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "قيد المراجعة",
            SubmissionStatus::InProgress => "قيد المعالجة",
            SubmissionStatus::Resolved => "تم الحل",
        }
    }
}

impl Default for SubmissionStatus {
    fn default() -> Self {
        SubmissionStatus::Pending
    }
}

/// A stored student suggestion or inquiry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub student_name: String,
    pub student_id: String,
    pub faculty: String,
    pub year: String,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: SubmissionKind,
    pub title: String,
    pub content: String,
    pub university: University,
    pub status: SubmissionStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw form payload for `POST /submit`. Fields arrive as plain strings and
/// default to empty so a missing key fails validation rather than
/// deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub faculty: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub university: String,
}

/// Conjunctive filter for listing submissions. `None` means unfiltered.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubmissionFilter {
    pub university: Option<University>,
    pub kind: Option<SubmissionKind>,
    pub status: Option<SubmissionStatus>,
}

/// Operator identity as stored. Seeded out-of-band, never mutated in-app.
#[derive(Debug, Clone)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

/// Minimal identity kept in the session store after login.
#[derive(Debug, Clone, Serialize)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

/// Point-in-time aggregate counters, appended after each create.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotCounts {
    pub total: i64,
    pub suggestions: i64,
    pub inquiries: i64,
    pub government: i64,
    pub private: i64,
    pub tech: i64,
}

#[derive(Debug, Serialize)]
pub struct UniversityCounts {
    pub government: i64,
    pub private: i64,
    pub tech: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
}

/// On-demand analytics payload for the admin dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub total: i64,
    pub suggestions: i64,
    pub inquiries: i64,
    pub universities: UniversityCounts,
    pub statuses: StatusCounts,
    pub last_seven_days: Vec<Submission>,
}
