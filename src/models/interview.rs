use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewType {
    Phone,
    Video,
    InPerson,
    Technical,
}

impl InterviewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Video => "video",
            Self::InPerson => "in_person",
            Self::Technical => "technical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "phone" => Some(Self::Phone),
            "video" => Some(Self::Video),
            "in_person" => Some(Self::InPerson),
            "technical" => Some(Self::Technical),
            _ => None,
        }
    }
}

/// Interview lifecycle states with an explicit transition table.
///
/// Completed, cancelled and no-show are terminal, except that a no-show can
/// still be cancelled for bookkeeping. Rescheduling keeps the full set of
/// targets open so an interview can be rescheduled more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Rescheduled => "rescheduled",
            Self::NoShow => "no_show",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "scheduled" => Some(Self::Scheduled),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "rescheduled" => Some(Self::Rescheduled),
            "no_show" => Some(Self::NoShow),
            _ => None,
        }
    }

    pub fn allowed_targets(&self) -> &'static [InterviewStatus] {
        use InterviewStatus::*;
        match self {
            Scheduled | Rescheduled => &[InProgress, Completed, Cancelled, Rescheduled, NoShow],
            InProgress => &[Completed, Cancelled],
            NoShow => &[Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, target: InterviewStatus) -> bool {
        target == *self || self.allowed_targets().contains(&target)
    }

    pub fn can_cancel(&self) -> bool {
        !matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interview {
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

impl Interview {
    pub fn status(&self) -> InterviewStatus {
        InterviewStatus::parse(&self.status).unwrap_or(InterviewStatus::Scheduled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewQuestion {
    pub id: i64,
    pub interview_id: Uuid,
    pub question_text: String,
    pub answer_text: Option<String>,
    pub ai_score: Option<f64>,
    pub question_order: i32,
}

/// Candidate feedback; at most one row per interview.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewFeedback {
    pub id: i64,
    pub interview_id: Uuid,
    pub rating: i32,
    pub comments: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}
