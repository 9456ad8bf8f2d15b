use crate::dto::application_dto::{
    ApplicationListQuery, ApplicationSummary, BulkStatusUpdatePayload, SubmitApplicationPayload,
    UpdateStatusPayload,
};
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationNote, ApplicationStatus, ApplicationStatusHistory,
};
use crate::models::job::Job;
use crate::models::user::Profile;
use crate::services::queue_service::AiQueueService;
use crate::services::scoring_service::{
    clamp_score, CandidateAttributes, JobRequirements, ScoreOutcome,
};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

const WITHDRAW_COMMENT: &str = "Application withdrawn by candidate";
const SHORTLIST_LIMIT: i64 = 10;

const SUMMARY_SELECT: &str = r#"
    SELECT a.id, a.job_id, j.title AS job_title, e.full_name AS company_name,
           u.full_name AS candidate_name, a.status, a.ai_match_score, a.submitted_at
    FROM applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN users u ON u.id = a.user_id
    LEFT JOIN users e ON e.id = j.employer_id
"#;

/// Owns the application state machine, its audit log and the scoring
/// triggers. All status mutations go through here so every accepted change
/// appends exactly one history row.
#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
    queue: AiQueueService,
}

impl ApplicationService {
    pub fn new(pool: PgPool, queue: AiQueueService) -> Self {
        Self { pool, queue }
    }

    /// Candidate submits an application to an open job. The (job, user) pair
    /// is additionally guarded by a unique index, so a concurrent duplicate
    /// that slips past the pre-check still fails with `DuplicateApplication`.
    pub async fn submit(
        &self,
        candidate_id: Uuid,
        payload: SubmitApplicationPayload,
    ) -> Result<Application> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(payload.job_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        if !job.is_open() {
            return Err(Error::JobNotOpen);
        }

        let existing = sqlx::query("SELECT id FROM applications WHERE job_id = $1 AND user_id = $2")
            .bind(payload.job_id)
            .bind(candidate_id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(Error::DuplicateApplication);
        }

        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (job_id, user_id, cover_letter, cv_url, status)
            VALUES ($1, $2, $3, $4, 'submitted')
            RETURNING *
            "#,
        )
        .bind(payload.job_id)
        .bind(candidate_id)
        .bind(payload.cover_letter)
        .bind(payload.cv_url)
        .fetch_one(&self.pool)
        .await?;

        // Atomic field-level increment; no read-modify-write.
        sqlx::query("UPDATE jobs SET applications_count = applications_count + 1 WHERE id = $1")
            .bind(job.id)
            .execute(&self.pool)
            .await?;

        self.queue
            .enqueue("match_score", json!({ "application_id": application.id }))
            .await?;

        Ok(application)
    }

    /// Employer moves an application through the transition table. A request
    /// for the current status is accepted as a logged no-op.
    pub async fn update_status(
        &self,
        employer_id: Uuid,
        application_id: Uuid,
        payload: &UpdateStatusPayload,
    ) -> Result<Application> {
        let target = ApplicationStatus::parse(&payload.status).ok_or_else(|| {
            Error::BadRequest(format!("Unknown application status: {}", payload.status))
        })?;

        let application = self
            .get_owned_by_employer(employer_id, application_id)
            .await?;
        let current = application.status();

        if !current.can_transition_to(target) {
            return Err(Error::InvalidTransition {
                from: current.to_string(),
                to: target.to_string(),
            });
        }

        self.apply_transition(
            application_id,
            current,
            target,
            Some(employer_id),
            payload.comment.as_deref(),
            payload.rejection_reason.as_deref(),
        )
        .await
    }

    /// Candidate withdraws. Allowed from any non-terminal state; withdrawal
    /// is a status, never a deletion.
    pub async fn withdraw(&self, candidate_id: Uuid, application_id: Uuid) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE id = $1 AND user_id = $2",
        )
        .bind(application_id)
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        let current = application.status();
        if !current.can_withdraw() {
            return Err(Error::CannotWithdraw);
        }

        self.apply_transition(
            application_id,
            current,
            ApplicationStatus::Withdrawn,
            Some(candidate_id),
            Some(WITHDRAW_COMMENT),
            None,
        )
        .await
    }

    /// Applies `update_status` semantics to each id independently, scoped to
    /// the employer's jobs. Failures (unknown id, foreign application,
    /// illegal transition) are skipped, not reported; the count reflects
    /// successful updates only.
    pub async fn bulk_update_status(
        &self,
        employer_id: Uuid,
        payload: &BulkStatusUpdatePayload,
    ) -> Result<u64> {
        // Reject an unparseable status up front; that is a request error,
        // not a per-application failure.
        ApplicationStatus::parse(&payload.status).ok_or_else(|| {
            Error::BadRequest(format!("Unknown application status: {}", payload.status))
        })?;

        let update = UpdateStatusPayload {
            status: payload.status.clone(),
            comment: payload.comment.clone(),
            rejection_reason: None,
        };

        let mut updated = 0u64;
        for id in &payload.application_ids {
            match self.update_status(employer_id, *id, &update).await {
                Ok(_) => updated += 1,
                Err(e) => {
                    tracing::debug!(application_id = %id, error = %e, "bulk status update skipped");
                }
            }
        }
        Ok(updated)
    }

    /// Top applications for a job by match score; unscored applications are
    /// excluded rather than sorted last.
    pub async fn shortlist(&self, employer_id: Uuid, job_id: Uuid) -> Result<(Job, Vec<ApplicationSummary>)> {
        let job = self.job_owned_by(employer_id, job_id).await?;

        let sql = format!(
            "{SUMMARY_SELECT} WHERE a.job_id = $1 AND a.ai_match_score IS NOT NULL
             ORDER BY a.ai_match_score DESC, a.submitted_at DESC LIMIT $2"
        );
        let items = sqlx::query_as::<_, ApplicationSummary>(&sql)
            .bind(job_id)
            .bind(SHORTLIST_LIMIT)
            .fetch_all(&self.pool)
            .await?;

        Ok((job, items))
    }

    pub async fn list_for_candidate(
        &self,
        candidate_id: Uuid,
        query: &ApplicationListQuery,
    ) -> Result<Vec<ApplicationSummary>> {
        let mut sql = format!("{SUMMARY_SELECT} WHERE a.user_id = $1");
        if query.status.is_some() {
            sql.push_str(" AND a.status = $2");
        }
        sql.push_str(" ORDER BY a.submitted_at DESC");

        let mut statement = sqlx::query_as::<_, ApplicationSummary>(&sql).bind(candidate_id);
        if let Some(status) = &query.status {
            statement = statement.bind(status);
        }
        Ok(statement.fetch_all(&self.pool).await?)
    }

    pub async fn list_for_job(
        &self,
        employer_id: Uuid,
        job_id: Uuid,
        query: &ApplicationListQuery,
    ) -> Result<Vec<ApplicationSummary>> {
        self.job_owned_by(employer_id, job_id).await?;

        let mut sql = format!("{SUMMARY_SELECT} WHERE a.job_id = $1");
        if query.status.is_some() {
            sql.push_str(" AND a.status = $2");
        }
        match query.sort.as_deref() {
            Some("match_score") => {
                sql.push_str(" ORDER BY a.ai_match_score DESC NULLS LAST, a.submitted_at DESC")
            }
            _ => sql.push_str(" ORDER BY a.submitted_at DESC"),
        }

        let mut statement = sqlx::query_as::<_, ApplicationSummary>(&sql).bind(job_id);
        if let Some(status) = &query.status {
            statement = statement.bind(status);
        }
        Ok(statement.fetch_all(&self.pool).await?)
    }

    /// Visibility-scoped fetch: candidates see their own applications,
    /// employers see applications to their jobs. Anything else is a 404,
    /// concealing existence.
    pub async fn get_visible(
        &self,
        actor_id: Uuid,
        is_employer: bool,
        application_id: Uuid,
    ) -> Result<Application> {
        let application = if is_employer {
            self.get_owned_by_employer(actor_id, application_id).await?
        } else {
            sqlx::query_as::<_, Application>(
                "SELECT * FROM applications WHERE id = $1 AND user_id = $2",
            )
            .bind(application_id)
            .bind(actor_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?
        };
        Ok(application)
    }

    pub async fn history(&self, application_id: Uuid) -> Result<Vec<ApplicationStatusHistory>> {
        let rows = sqlx::query_as::<_, ApplicationStatusHistory>(
            "SELECT * FROM application_status_history WHERE application_id = $1 ORDER BY changed_at, id",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn add_note(
        &self,
        employer_id: Uuid,
        application_id: Uuid,
        content: String,
    ) -> Result<ApplicationNote> {
        self.get_owned_by_employer(employer_id, application_id)
            .await?;

        let note = sqlx::query_as::<_, ApplicationNote>(
            r#"
            INSERT INTO application_notes (application_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(employer_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(note)
    }

    pub async fn list_notes(&self, application_id: Uuid) -> Result<Vec<ApplicationNote>> {
        let notes = sqlx::query_as::<_, ApplicationNote>(
            "SELECT * FROM application_notes WHERE application_id = $1 ORDER BY created_at, id",
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    /// Cross-cutting cascade used by the interview engine; bypasses the
    /// employer transition table but still appends a history row.
    pub async fn cascade_status(
        &self,
        application_id: Uuid,
        target: ApplicationStatus,
        changed_by: Option<Uuid>,
        comment: &str,
    ) -> Result<Application> {
        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                .bind(application_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        self.apply_transition(
            application_id,
            application.status(),
            target,
            changed_by,
            Some(comment),
            None,
        )
        .await
    }

    /// Assembles the provider inputs for match scoring. A missing profile
    /// degrades to empty attributes rather than failing the task.
    pub async fn scoring_inputs(
        &self,
        application_id: Uuid,
    ) -> Result<(CandidateAttributes, JobRequirements)> {
        let job = sqlx::query_as::<_, Job>(
            "SELECT j.* FROM jobs j JOIN applications a ON a.job_id = j.id WHERE a.id = $1",
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        let profile = sqlx::query_as::<_, Profile>(
            "SELECT p.* FROM profiles p JOIN applications a ON a.user_id = p.user_id WHERE a.id = $1",
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;

        let candidate = profile.map(profile_attributes).unwrap_or_default();

        let requirements = JobRequirements {
            title: job.title,
            description: job.description,
            required_skills: json_string_vec(job.required_skills.as_ref()),
            preferred_skills: json_string_vec(job.preferred_skills.as_ref()),
            experience_years_min: job.experience_years_min,
            experience_years_max: job.experience_years_max,
        };

        Ok((candidate, requirements))
    }

    /// Writes the async scoring result. Absolute update, so re-delivery of
    /// the same task is safe.
    pub async fn store_match_result(
        &self,
        application_id: Uuid,
        outcome: &ScoreOutcome,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE applications
            SET ai_match_score = $2, ai_analysis = $3, ai_analyzed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(application_id)
        .bind(clamp_score(outcome.score))
        .bind(&outcome.analysis)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn profile_attributes_for_user(&self, user_id: Uuid) -> Result<CandidateAttributes> {
        let profile =
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("Profile not found".to_string()))?;
        Ok(profile_attributes(profile))
    }

    pub async fn enqueue_profile_score(&self, user_id: Uuid) -> Result<Uuid> {
        self.queue
            .enqueue("profile_score", json!({ "user_id": user_id }))
            .await
    }

    pub async fn store_profile_result(&self, user_id: Uuid, outcome: &ScoreOutcome) -> Result<()> {
        sqlx::query(
            "UPDATE profiles SET ai_score = $2, ai_analyzed_at = NOW(), updated_at = NOW() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(clamp_score(outcome.score))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_owned_by_employer(
        &self,
        employer_id: Uuid,
        application_id: Uuid,
    ) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            SELECT a.* FROM applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.id = $1 AND j.employer_id = $2
            "#,
        )
        .bind(application_id)
        .bind(employer_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        Ok(application)
    }

    async fn job_owned_by(&self, employer_id: Uuid, job_id: Uuid) -> Result<Job> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1 AND employer_id = $2")
            .bind(job_id)
            .bind(employer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        Ok(job)
    }

    /// Single write path for status changes: update + history append in one
    /// transaction so a failed append never leaves an unlogged mutation.
    async fn apply_transition(
        &self,
        application_id: Uuid,
        old_status: ApplicationStatus,
        new_status: ApplicationStatus,
        changed_by: Option<Uuid>,
        comment: Option<&str>,
        rejection_reason: Option<&str>,
    ) -> Result<Application> {
        let mut tx = self.pool.begin().await?;

        let application = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = $2,
                reviewed_at = CASE
                    WHEN $2 = 'under_review' AND reviewed_at IS NULL THEN NOW()
                    ELSE reviewed_at
                END,
                rejection_reason = CASE WHEN $2 = 'rejected' THEN $3 ELSE rejection_reason END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(application_id)
        .bind(new_status.as_str())
        .bind(rejection_reason)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO application_status_history
                (application_id, old_status, new_status, changed_by, comment)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(application_id)
        .bind(old_status.as_str())
        .bind(new_status.as_str())
        .bind(changed_by)
        .bind(comment)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(application)
    }
}

fn profile_attributes(profile: Profile) -> CandidateAttributes {
    CandidateAttributes {
        bio: profile.bio,
        skills: json_string_vec(profile.skills.as_ref()),
        education: json_vec(profile.education.as_ref()),
        experience: json_vec(profile.experience.as_ref()),
        certifications: json_vec(profile.certifications.as_ref()),
        languages: json_vec(profile.languages.as_ref()),
    }
}

fn json_string_vec(value: Option<&JsonValue>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|e| e.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn json_vec(value: Option<&JsonValue>) -> Vec<JsonValue> {
    value
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{json_string_vec, json_vec};
    use serde_json::json;

    #[test]
    fn json_string_vec_keeps_only_strings() {
        let raw = json!(["Go", 7, "SQL", null]);
        assert_eq!(json_string_vec(Some(&raw)), vec!["Go", "SQL"]);
        assert!(json_string_vec(None).is_empty());
        assert!(json_string_vec(Some(&json!({"not": "array"}))).is_empty());
    }

    #[test]
    fn json_vec_passes_entries_through() {
        let raw = json!([{"role": "dev"}, {"role": "lead"}]);
        assert_eq!(json_vec(Some(&raw)).len(), 2);
        assert!(json_vec(None).is_empty());
    }
}
