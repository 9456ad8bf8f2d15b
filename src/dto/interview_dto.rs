use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::interview::{Interview, InterviewFeedback, InterviewQuestion};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateInterviewPayload {
    pub application_id: Uuid,
    #[validate(length(min = 1))]
    pub interview_type: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    #[validate(url)]
    pub meeting_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct UpdateInterviewPayload {
    pub interview_type: Option<String>,
    pub status: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub location: Option<String>,
    #[validate(url)]
    pub meeting_url: Option<String>,
    pub interviewer_feedback: Option<String>,
    #[validate(range(min = 1, max = 10))]
    pub interviewer_rating: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReschedulePayload {
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VideoUploadPayload {
    #[validate(url)]
    pub video_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    #[validate(length(min = 1))]
    pub question_text: String,
    pub answer_text: Option<String>,
    pub question_order: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FeedbackPayload {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InterviewListQuery {
    pub status: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewResponse {
    pub id: Uuid,
    pub application_id: Uuid,
    pub interview_type: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub meeting_url: Option<String>,
    pub interviewer_id: Option<Uuid>,
    pub video_url: Option<String>,
    pub ai_review: Option<JsonValue>,
    pub ai_score: Option<f64>,
    pub ai_analyzed_at: Option<DateTime<Utc>>,
    pub interviewer_feedback: Option<String>,
    pub interviewer_rating: Option<i32>,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewSummary {
    pub id: Uuid,
    pub interview_type: String,
    pub status: String,
    pub scheduled_at: DateTime<Utc>,
    pub candidate_name: String,
    pub job_title: String,
    pub ai_score: Option<f64>,
    pub interviewer_rating: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewQuestionResponse {
    pub id: i64,
    pub interview_id: Uuid,
    pub question_text: String,
    pub answer_text: Option<String>,
    pub ai_score: Option<f64>,
    pub question_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewFeedbackResponse {
    pub id: i64,
    pub interview_id: Uuid,
    pub rating: i32,
    pub comments: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Averages are over non-null values only; `None` means no data, not zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewStatsResponse {
    pub total_interviews: i64,
    pub by_status: HashMap<String, i64>,
    pub avg_interviewer_rating: Option<f64>,
    pub avg_ai_score: Option<f64>,
}

impl From<Interview> for InterviewResponse {
    fn from(value: Interview) -> Self {
        Self {
            id: value.id,
            application_id: value.application_id,
            interview_type: value.interview_type,
            status: value.status,
            scheduled_at: value.scheduled_at,
            duration_minutes: value.duration_minutes,
            location: value.location,
            meeting_url: value.meeting_url,
            interviewer_id: value.interviewer_id,
            video_url: value.video_url,
            ai_review: value.ai_review,
            ai_score: value.ai_score,
            ai_analyzed_at: value.ai_analyzed_at,
            interviewer_feedback: value.interviewer_feedback,
            interviewer_rating: value.interviewer_rating,
            notes: value.notes,
            created_at: value.created_at,
            updated_at: value.updated_at,
            completed_at: value.completed_at,
        }
    }
}

impl From<InterviewQuestion> for InterviewQuestionResponse {
    fn from(value: InterviewQuestion) -> Self {
        Self {
            id: value.id,
            interview_id: value.interview_id,
            question_text: value.question_text,
            answer_text: value.answer_text,
            ai_score: value.ai_score,
            question_order: value.question_order,
        }
    }
}

impl From<InterviewFeedback> for InterviewFeedbackResponse {
    fn from(value: InterviewFeedback) -> Self {
        Self {
            id: value.id,
            interview_id: value.interview_id,
            rating: value.rating,
            comments: value.comments,
            created_at: value.created_at,
        }
    }
}
