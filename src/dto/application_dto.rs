use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::application::{Application, ApplicationNote, ApplicationStatusHistory};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitApplicationPayload {
    pub job_id: Uuid,
    pub cover_letter: Option<String>,
    #[validate(url)]
    pub cv_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStatusPayload {
    #[validate(length(min = 1))]
    pub status: String,
    pub comment: Option<String>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkStatusUpdatePayload {
    #[validate(length(min = 1))]
    pub application_ids: Vec<Uuid>,
    #[validate(length(min = 1))]
    pub status: String,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkStatusUpdateResponse {
    pub message: String,
    pub updated_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateNotePayload {
    #[validate(length(min = 1))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    pub status: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub cover_letter: Option<String>,
    pub cv_url: Option<String>,
    pub status: String,
    pub ai_match_score: Option<f64>,
    pub ai_analysis: Option<JsonValue>,
    pub ai_analyzed_at: Option<DateTime<Utc>>,
    pub employer_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Row shape for listings; joined with jobs and users.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationSummary {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub company_name: Option<String>,
    pub candidate_name: String,
    pub status: String,
    pub ai_match_score: Option<f64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationNoteResponse {
    pub id: i64,
    pub application_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryResponse {
    pub id: i64,
    pub old_status: String,
    pub new_status: String,
    pub changed_by: Option<Uuid>,
    pub comment: Option<String>,
    pub changed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationDetailResponse {
    #[serde(flatten)]
    pub application: ApplicationResponse,
    pub notes: Vec<ApplicationNoteResponse>,
    pub status_history: Vec<StatusHistoryResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortlistResponse {
    pub job_id: Uuid,
    pub job_title: String,
    pub top_candidates: Vec<ApplicationSummary>,
}

impl From<Application> for ApplicationResponse {
    fn from(value: Application) -> Self {
        Self {
            id: value.id,
            job_id: value.job_id,
            user_id: value.user_id,
            cover_letter: value.cover_letter,
            cv_url: value.cv_url,
            status: value.status,
            ai_match_score: value.ai_match_score,
            ai_analysis: value.ai_analysis,
            ai_analyzed_at: value.ai_analyzed_at,
            employer_notes: value.employer_notes,
            rejection_reason: value.rejection_reason,
            submitted_at: value.submitted_at,
            reviewed_at: value.reviewed_at,
            updated_at: value.updated_at,
        }
    }
}

impl From<ApplicationNote> for ApplicationNoteResponse {
    fn from(value: ApplicationNote) -> Self {
        Self {
            id: value.id,
            application_id: value.application_id,
            author_id: value.author_id,
            content: value.content,
            created_at: value.created_at,
        }
    }
}

impl From<ApplicationStatusHistory> for StatusHistoryResponse {
    fn from(value: ApplicationStatusHistory) -> Self {
        Self {
            id: value.id,
            old_status: value.old_status,
            new_status: value.new_status,
            changed_by: value.changed_by,
            comment: value.comment,
            changed_at: value.changed_at,
        }
    }
}
