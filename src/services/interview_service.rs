use crate::dto::interview_dto::{
    CreateInterviewPayload, CreateQuestionPayload, FeedbackPayload, InterviewListQuery,
    InterviewStatsResponse, InterviewSummary, ReschedulePayload, UpdateInterviewPayload,
};
use crate::error::{Error, Result};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::interview::{Interview, InterviewFeedback, InterviewQuestion, InterviewStatus, InterviewType};
use crate::services::application_service::ApplicationService;
use crate::services::queue_service::AiQueueService;
use crate::services::scoring_service::{clamp_score, MediaAnalysis};
use serde_json::json;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

const DEFAULT_DURATION_MINUTES: i32 = 60;
const UPCOMING_LIMIT: i64 = 5;

const SUMMARY_SELECT: &str = r#"
    SELECT i.id, i.interview_type, i.status, i.scheduled_at,
           u.full_name AS candidate_name, j.title AS job_title,
           i.ai_score, i.interviewer_rating
    FROM interviews i
    JOIN applications a ON a.id = i.application_id
    JOIN jobs j ON j.id = a.job_id
    JOIN users u ON u.id = a.user_id
"#;

/// Interview scheduling and review. Interview status changes cascade into
/// the owning application through `ApplicationService`.
#[derive(Clone)]
pub struct InterviewService {
    pool: PgPool,
    applications: ApplicationService,
    queue: AiQueueService,
}

impl InterviewService {
    pub fn new(pool: PgPool, applications: ApplicationService, queue: AiQueueService) -> Self {
        Self {
            pool,
            applications,
            queue,
        }
    }

    /// Schedules an interview for an application to one of the employer's
    /// jobs. An application belonging to another employer's job is a 403,
    /// not a 404: the caller proved they know the id, ownership is what
    /// failed.
    pub async fn create(
        &self,
        employer_id: Uuid,
        payload: CreateInterviewPayload,
    ) -> Result<Interview> {
        InterviewType::parse(&payload.interview_type).ok_or_else(|| {
            Error::BadRequest(format!("Unknown interview type: {}", payload.interview_type))
        })?;

        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                .bind(payload.application_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        let owner: Option<Uuid> = sqlx::query("SELECT employer_id FROM jobs WHERE id = $1")
            .bind(application.job_id)
            .fetch_one(&self.pool)
            .await?
            .get("employer_id");
        if owner != Some(employer_id) {
            return Err(Error::Forbidden(
                "Application belongs to another employer's job".to_string(),
            ));
        }

        let interview = sqlx::query_as::<_, Interview>(
            r#"
            INSERT INTO interviews
                (application_id, interview_type, status, scheduled_at, duration_minutes,
                 location, meeting_url, interviewer_id, notes)
            VALUES ($1, $2, 'scheduled', $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(payload.application_id)
        .bind(&payload.interview_type)
        .bind(payload.scheduled_at)
        .bind(payload.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES))
        .bind(payload.location)
        .bind(payload.meeting_url)
        .bind(employer_id)
        .bind(payload.notes)
        .fetch_one(&self.pool)
        .await?;

        if application.status() != ApplicationStatus::InterviewScheduled {
            self.applications
                .cascade_status(
                    application.id,
                    ApplicationStatus::InterviewScheduled,
                    Some(employer_id),
                    "Interview scheduled",
                )
                .await?;
        }

        Ok(interview)
    }

    /// Partial update. A status change goes through the interview transition
    /// table; the first move to `completed` stamps `completed_at` exactly
    /// once and cascades the application to `interviewed`.
    pub async fn update(
        &self,
        employer_id: Uuid,
        interview_id: Uuid,
        payload: UpdateInterviewPayload,
    ) -> Result<Interview> {
        let interview = self.get_owned(employer_id, interview_id).await?;
        let current = interview.status();

        let new_status = match payload.status.as_deref() {
            Some(raw) => {
                let target = InterviewStatus::parse(raw).ok_or_else(|| {
                    Error::BadRequest(format!("Unknown interview status: {raw}"))
                })?;
                if target != current && !current.can_transition_to(target) {
                    return Err(Error::InvalidTransition {
                        from: current.to_string(),
                        to: target.to_string(),
                    });
                }
                Some(target)
            }
            None => None,
        };

        if let Some(t) = payload.interview_type.as_deref() {
            InterviewType::parse(t)
                .ok_or_else(|| Error::BadRequest(format!("Unknown interview type: {t}")))?;
        }

        let first_completion = new_status == Some(InterviewStatus::Completed)
            && interview.completed_at.is_none();

        let updated = sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET interview_type = COALESCE($2, interview_type),
                status = COALESCE($3, status),
                scheduled_at = COALESCE($4, scheduled_at),
                duration_minutes = COALESCE($5, duration_minutes),
                location = COALESCE($6, location),
                meeting_url = COALESCE($7, meeting_url),
                interviewer_feedback = COALESCE($8, interviewer_feedback),
                interviewer_rating = COALESCE($9, interviewer_rating),
                notes = COALESCE($10, notes),
                completed_at = CASE WHEN $11 THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(interview_id)
        .bind(payload.interview_type)
        .bind(new_status.map(|s| s.as_str()))
        .bind(payload.scheduled_at)
        .bind(payload.duration_minutes)
        .bind(payload.location)
        .bind(payload.meeting_url)
        .bind(payload.interviewer_feedback)
        .bind(payload.interviewer_rating)
        .bind(payload.notes)
        .bind(first_completion)
        .fetch_one(&self.pool)
        .await?;

        if first_completion {
            let application =
                sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                    .bind(updated.application_id)
                    .fetch_one(&self.pool)
                    .await?;
            if application.status() == ApplicationStatus::InterviewScheduled {
                self.applications
                    .cascade_status(
                        application.id,
                        ApplicationStatus::Interviewed,
                        Some(employer_id),
                        "Interview completed",
                    )
                    .await?;
            }
        }

        Ok(updated)
    }

    /// Cancellation is a status, not a deletion. Completed and already
    /// cancelled interviews cannot be cancelled.
    pub async fn cancel(&self, employer_id: Uuid, interview_id: Uuid) -> Result<Interview> {
        let interview = self.get_owned(employer_id, interview_id).await?;
        if !interview.status().can_cancel() {
            return Err(Error::BadRequest(format!(
                "Cannot cancel a {} interview",
                interview.status
            )));
        }

        let cancelled = sqlx::query_as::<_, Interview>(
            "UPDATE interviews SET status = 'cancelled', updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(interview_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(cancelled)
    }

    pub async fn reschedule(
        &self,
        employer_id: Uuid,
        interview_id: Uuid,
        payload: ReschedulePayload,
    ) -> Result<Interview> {
        let interview = self.get_owned(employer_id, interview_id).await?;
        let current = interview.status();
        if !current.can_transition_to(InterviewStatus::Rescheduled) {
            return Err(Error::InvalidTransition {
                from: current.to_string(),
                to: InterviewStatus::Rescheduled.to_string(),
            });
        }

        let rescheduled = sqlx::query_as::<_, Interview>(
            r#"
            UPDATE interviews
            SET status = 'rescheduled', scheduled_at = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(interview_id)
        .bind(payload.scheduled_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(rescheduled)
    }

    /// Records the video URL and enqueues analysis; the caller gets a 202
    /// and the score lands whenever the task runs. Both the interviewed
    /// candidate and the owning employer may upload.
    pub async fn upload_video(
        &self,
        actor_id: Uuid,
        interview_id: Uuid,
        video_url: String,
    ) -> Result<Interview> {
        self.get_visible(actor_id, interview_id).await?;

        let interview = sqlx::query_as::<_, Interview>(
            "UPDATE interviews SET video_url = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(interview_id)
        .bind(video_url)
        .fetch_one(&self.pool)
        .await?;

        self.queue
            .enqueue("video_analysis", json!({ "interview_id": interview_id }))
            .await?;

        Ok(interview)
    }

    pub async fn video_url(&self, interview_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query("SELECT video_url FROM interviews WHERE id = $1")
            .bind(interview_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Interview not found".to_string()))?;
        Ok(row.get("video_url"))
    }

    /// Writes the async analysis result. Absolute update, so task
    /// re-delivery is safe.
    pub async fn store_media_result(
        &self,
        interview_id: Uuid,
        analysis: &MediaAnalysis,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE interviews
            SET ai_review = $2, ai_score = $3, ai_analyzed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(interview_id)
        .bind(&analysis.review)
        .bind(clamp_score(analysis.score))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Employers see interviews they conduct; candidates see interviews on
    /// their own applications.
    pub async fn list(
        &self,
        actor_id: Uuid,
        is_employer: bool,
        query: &InterviewListQuery,
    ) -> Result<Vec<InterviewSummary>> {
        let scope = if is_employer {
            "i.interviewer_id = $1"
        } else {
            "a.user_id = $1"
        };
        let mut sql = format!("{SUMMARY_SELECT} WHERE {scope}");
        if query.status.is_some() {
            sql.push_str(" AND i.status = $2");
        }
        match query.time.as_deref() {
            Some("upcoming") => sql.push_str(" AND i.scheduled_at >= NOW()"),
            Some("past") => sql.push_str(" AND i.scheduled_at < NOW()"),
            _ => {}
        }
        sql.push_str(" ORDER BY i.scheduled_at");

        let mut statement = sqlx::query_as::<_, InterviewSummary>(&sql).bind(actor_id);
        if let Some(status) = &query.status {
            statement = statement.bind(status);
        }
        Ok(statement.fetch_all(&self.pool).await?)
    }

    pub async fn upcoming(&self, employer_id: Uuid) -> Result<Vec<InterviewSummary>> {
        let sql = format!(
            "{SUMMARY_SELECT} WHERE i.interviewer_id = $1
              AND i.status IN ('scheduled', 'rescheduled')
              AND i.scheduled_at >= NOW()
             ORDER BY i.scheduled_at LIMIT $2"
        );
        let items = sqlx::query_as::<_, InterviewSummary>(&sql)
            .bind(employer_id)
            .bind(UPCOMING_LIMIT)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Mutation scope: only the interviewer may change an interview.
    pub async fn get_owned(&self, employer_id: Uuid, interview_id: Uuid) -> Result<Interview> {
        let interview = sqlx::query_as::<_, Interview>(
            "SELECT * FROM interviews WHERE id = $1 AND interviewer_id = $2",
        )
        .bind(interview_id)
        .bind(employer_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Interview not found".to_string()))?;
        Ok(interview)
    }

    /// Read scope: the interviewer or the interviewed candidate. Anyone else
    /// gets a 404, concealing existence.
    pub async fn get_visible(&self, actor_id: Uuid, interview_id: Uuid) -> Result<Interview> {
        let interview = sqlx::query_as::<_, Interview>(
            r#"
            SELECT i.* FROM interviews i
            JOIN applications a ON a.id = i.application_id
            WHERE i.id = $1 AND (i.interviewer_id = $2 OR a.user_id = $2)
            "#,
        )
        .bind(interview_id)
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Interview not found".to_string()))?;
        Ok(interview)
    }

    /// Aggregates over the employer's interviews. Null ratings and scores
    /// are excluded from the averages, not counted as zero.
    pub async fn stats(&self, employer_id: Uuid) -> Result<InterviewStatsResponse> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   AVG(interviewer_rating)::DOUBLE PRECISION AS avg_rating,
                   AVG(ai_score) AS avg_ai_score
            FROM interviews WHERE interviewer_id = $1
            "#,
        )
        .bind(employer_id)
        .fetch_one(&self.pool)
        .await?;

        let status_rows = sqlx::query(
            "SELECT status, COUNT(*) AS cnt FROM interviews WHERE interviewer_id = $1 GROUP BY status",
        )
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_status = HashMap::new();
        for row in status_rows {
            let status: String = row.get("status");
            let count: i64 = row.get("cnt");
            by_status.insert(status, count);
        }

        Ok(InterviewStatsResponse {
            total_interviews: totals.get("total"),
            by_status,
            avg_interviewer_rating: totals.get("avg_rating"),
            avg_ai_score: totals.get("avg_ai_score"),
        })
    }

    pub async fn add_question(
        &self,
        employer_id: Uuid,
        interview_id: Uuid,
        payload: CreateQuestionPayload,
    ) -> Result<InterviewQuestion> {
        self.get_owned(employer_id, interview_id).await?;

        let question = sqlx::query_as::<_, InterviewQuestion>(
            r#"
            INSERT INTO interview_questions (interview_id, question_text, answer_text, question_order)
            VALUES ($1, $2, $3, COALESCE($4,
                (SELECT COALESCE(MAX(question_order), 0) + 1
                 FROM interview_questions WHERE interview_id = $1)))
            RETURNING *
            "#,
        )
        .bind(interview_id)
        .bind(payload.question_text)
        .bind(payload.answer_text)
        .bind(payload.question_order)
        .fetch_one(&self.pool)
        .await?;
        Ok(question)
    }

    pub async fn list_questions(
        &self,
        actor_id: Uuid,
        interview_id: Uuid,
    ) -> Result<Vec<InterviewQuestion>> {
        self.get_visible(actor_id, interview_id).await?;

        let questions = sqlx::query_as::<_, InterviewQuestion>(
            "SELECT * FROM interview_questions WHERE interview_id = $1 ORDER BY question_order, id",
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    /// Candidate rates their interview experience, once. A second
    /// submission is a 400.
    pub async fn add_feedback(
        &self,
        candidate_id: Uuid,
        interview_id: Uuid,
        payload: FeedbackPayload,
    ) -> Result<InterviewFeedback> {
        sqlx::query(
            r#"
            SELECT i.id FROM interviews i
            JOIN applications a ON a.id = i.application_id
            WHERE i.id = $1 AND a.user_id = $2
            "#,
        )
        .bind(interview_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Interview not found".to_string()))?;

        let existing = sqlx::query("SELECT id FROM interview_feedback WHERE interview_id = $1")
            .bind(interview_id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(Error::BadRequest(
                "Feedback already submitted for this interview".to_string(),
            ));
        }

        let feedback = sqlx::query_as::<_, InterviewFeedback>(
            r#"
            INSERT INTO interview_feedback (interview_id, rating, comments)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(interview_id)
        .bind(payload.rating)
        .bind(payload.comments)
        .fetch_one(&self.pool)
        .await?;
        Ok(feedback)
    }
}
