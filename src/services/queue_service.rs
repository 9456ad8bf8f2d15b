use crate::config::get_config;
use crate::error::{Error, Result};
use crate::AppState;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

pub const KIND_MATCH_SCORE: &str = "match_score";
pub const KIND_VIDEO_ANALYSIS: &str = "video_analysis";
pub const KIND_PROFILE_SCORE: &str = "profile_score";

#[derive(Debug, sqlx::FromRow)]
pub struct AiJob {
    pub id: Uuid,
    pub kind: String,
    pub payload: JsonValue,
    pub status: String,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Postgres-backed task queue for AI work. Delivery is at-least-once: a
/// worker that dies mid-task leaves the job `running` and a sweep returns
/// it to `pending`, so consumers write absolute values only.
#[derive(Clone)]
pub struct AiQueueService {
    pool: PgPool,
}

impl AiQueueService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fire-and-forget enqueue; the caller's request never waits on the
    /// task itself.
    pub async fn enqueue(&self, kind: &str, payload: JsonValue) -> Result<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            "INSERT INTO ai_jobs (kind, payload, status) VALUES ($1, $2, 'pending') RETURNING id",
        )
        .bind(kind)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;
        tracing::debug!(job_id = %row.0, kind, "ai job enqueued");
        Ok(row.0)
    }

    /// Claims and runs one pending job. Returns false when the queue is
    /// empty. `FOR UPDATE SKIP LOCKED` lets multiple workers poll without
    /// double-claiming.
    pub async fn run_once(&self, state: &AppState) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let job = sqlx::query_as::<_, AiJob>(
            r#"
            SELECT * FROM ai_jobs
            WHERE status = 'pending'
            ORDER BY created_at
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(job) = job else {
            tx.commit().await?;
            return Ok(false);
        };

        sqlx::query("UPDATE ai_jobs SET status = 'running', updated_at = NOW() WHERE id = $1")
            .bind(job.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        // One bounded attempt. Provider failure marks the job failed and
        // leaves the target score null; nothing user-facing breaks.
        let deadline = Duration::from_secs(get_config().ai_timeout_secs);
        let outcome = match tokio::time::timeout(deadline, self.execute(state, &job)).await {
            Ok(result) => result,
            Err(_) => Err(Error::ProviderUnavailable(
                "scoring provider timed out".to_string(),
            )),
        };

        match outcome {
            Ok(()) => {
                sqlx::query(
                    "UPDATE ai_jobs SET status = 'succeeded', updated_at = NOW() WHERE id = $1",
                )
                .bind(job.id)
                .execute(&self.pool)
                .await?;
                tracing::info!(job_id = %job.id, kind = %job.kind, "ai job completed");
            }
            Err(e) => {
                sqlx::query(
                    "UPDATE ai_jobs SET status = 'failed', error = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(job.id)
                .bind(e.to_string())
                .execute(&self.pool)
                .await?;
                tracing::warn!(job_id = %job.id, kind = %job.kind, error = %e, "ai job failed");
            }
        }

        Ok(true)
    }

    /// Returns jobs stuck in `running` longer than the given age back to
    /// `pending`. Run periodically alongside the worker loop.
    pub async fn requeue_stale(&self, older_than: Duration) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE ai_jobs SET status = 'pending', updated_at = NOW()
            WHERE status = 'running' AND updated_at < NOW() - ($1 * INTERVAL '1 second')
            "#,
        )
        .bind(older_than.as_secs() as f64)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn execute(&self, state: &AppState, job: &AiJob) -> Result<()> {
        match job.kind.as_str() {
            KIND_MATCH_SCORE => {
                let application_id = payload_uuid(&job.payload, "application_id")?;
                let (candidate, requirements) = state
                    .application_service
                    .scoring_inputs(application_id)
                    .await?;
                let outcome = state.scoring.score_match(&candidate, &requirements).await?;
                state
                    .application_service
                    .store_match_result(application_id, &outcome)
                    .await
            }
            KIND_VIDEO_ANALYSIS => {
                let interview_id = payload_uuid(&job.payload, "interview_id")?;
                let video_url = state
                    .interview_service
                    .video_url(interview_id)
                    .await?
                    .ok_or_else(|| {
                        Error::BadRequest("Interview has no video to analyze".to_string())
                    })?;
                let analysis = state.scoring.analyze_interview_media(&video_url).await?;
                state
                    .interview_service
                    .store_media_result(interview_id, &analysis)
                    .await
            }
            KIND_PROFILE_SCORE => {
                let user_id = payload_uuid(&job.payload, "user_id")?;
                let attributes = state
                    .application_service
                    .profile_attributes_for_user(user_id)
                    .await?;
                let outcome = state.scoring.score_profile(&attributes).await?;
                state
                    .application_service
                    .store_profile_result(user_id, &outcome)
                    .await
            }
            other => Err(Error::BadRequest(format!("Unknown ai job kind: {other}"))),
        }
    }
}

fn payload_uuid(payload: &JsonValue, key: &str) -> Result<Uuid> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| Error::BadRequest(format!("Job payload missing {key}")))
}

#[cfg(test)]
mod tests {
    use super::payload_uuid;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn payload_uuid_reads_string_field() {
        let id = Uuid::new_v4();
        let payload = json!({ "application_id": id });
        assert_eq!(payload_uuid(&payload, "application_id").unwrap(), id);
    }

    #[test]
    fn payload_uuid_rejects_missing_or_malformed() {
        assert!(payload_uuid(&json!({}), "user_id").is_err());
        assert!(payload_uuid(&json!({ "user_id": 42 }), "user_id").is_err());
        assert!(payload_uuid(&json!({ "user_id": "nope" }), "user_id").is_err());
    }
}
