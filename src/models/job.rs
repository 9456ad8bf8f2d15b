use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// Job posting record. Jobs are owned by the employer-facing CRUD surface;
/// the lifecycle engines only read them and bump their counters.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub employer_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub required_skills: Option<JsonValue>,
    pub preferred_skills: Option<JsonValue>,
    pub experience_years_min: i32,
    pub experience_years_max: Option<i32>,
    pub status: String,
    pub views_count: i32,
    pub applications_count: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn is_open(&self) -> bool {
        self.status == "open"
    }
}
