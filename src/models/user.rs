use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_employer(&self) -> bool {
        self.role == "employer"
    }

    pub fn is_candidate(&self) -> bool {
        self.role == "candidate"
    }
}

/// Candidate profile attributes consumed by the scoring provider.
/// Skills/education/experience/certifications/languages are JSONB arrays.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub skills: Option<JsonValue>,
    pub education: Option<JsonValue>,
    pub experience: Option<JsonValue>,
    pub certifications: Option<JsonValue>,
    pub languages: Option<JsonValue>,
    pub ai_score: Option<f64>,
    pub ai_analyzed_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
