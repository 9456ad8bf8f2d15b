use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{
        ApplicationDetailResponse, ApplicationListQuery, ApplicationResponse,
        BulkStatusUpdatePayload, BulkStatusUpdateResponse, CreateNotePayload, ShortlistResponse,
        SubmitApplicationPayload, UpdateStatusPayload,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = SubmitApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = Json<ApplicationResponse>),
        (status = 400, description = "Job not open or duplicate application"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate_id = claims.require_candidate()?;
    let application = state.application_service.submit(candidate_id, payload).await?;
    Ok((StatusCode::CREATED, Json(ApplicationResponse::from(application))))
}

#[utoipa::path(
    get,
    path = "/api/applications/mine",
    params(
        ("status" = Option<String>, Query, description = "Filter by status")
    ),
    responses(
        (status = 200, description = "Caller's applications")
    )
)]
#[axum::debug_handler]
pub async fn list_my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let candidate_id = claims.require_candidate()?;
    let items = state
        .application_service
        .list_for_candidate(candidate_id, &query)
        .await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application detail", body = Json<ApplicationDetailResponse>),
        (status = 404, description = "Application not visible to the caller")
    )
)]
#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let is_employer = claims.is_employer();
    let application = state
        .application_service
        .get_visible(actor_id, is_employer, id)
        .await?;

    // Internal notes stay employer-side; candidates see their own history.
    let notes = if is_employer {
        state.application_service.list_notes(id).await?
    } else {
        Vec::new()
    };
    let history = state.application_service.history(id).await?;

    Ok(Json(ApplicationDetailResponse {
        application: application.into(),
        notes: notes.into_iter().map(Into::into).collect(),
        status_history: history.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/withdraw",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application withdrawn", body = Json<ApplicationResponse>),
        (status = 400, description = "Application already in a terminal state"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn withdraw_application(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let candidate_id = claims.require_candidate()?;
    let application = state.application_service.withdraw(candidate_id, id).await?;
    Ok(Json(ApplicationResponse::from(application)))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = Json<ApplicationResponse>),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let employer_id = claims.require_employer()?;
    let application = state
        .application_service
        .update_status(employer_id, id, &payload)
        .await?;
    Ok(Json(ApplicationResponse::from(application)))
}

#[utoipa::path(
    post,
    path = "/api/applications/bulk-status",
    request_body = BulkStatusUpdatePayload,
    responses(
        (status = 200, description = "Bulk update applied", body = Json<BulkStatusUpdateResponse>),
        (status = 400, description = "Unknown target status")
    )
)]
#[axum::debug_handler]
pub async fn bulk_update_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BulkStatusUpdatePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let employer_id = claims.require_employer()?;
    let updated_count = state
        .application_service
        .bulk_update_status(employer_id, &payload)
        .await?;
    Ok(Json(BulkStatusUpdateResponse {
        message: format!("{updated_count} applications updated"),
        updated_count,
    }))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{job_id}/applications",
    params(
        ("job_id" = Uuid, Path, description = "Job ID"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort" = Option<String>, Query, description = "Use 'match_score' to rank by AI score")
    ),
    responses(
        (status = 200, description = "Applications to the job"),
        (status = 404, description = "Job not found or not owned by the caller")
    )
)]
#[axum::debug_handler]
pub async fn list_job_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let employer_id = claims.require_employer()?;
    let items = state
        .application_service
        .list_for_job(employer_id, job_id, &query)
        .await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{job_id}/shortlist",
    params(
        ("job_id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Top scored candidates", body = Json<ShortlistResponse>),
        (status = 404, description = "Job not found or not owned by the caller")
    )
)]
#[axum::debug_handler]
pub async fn job_shortlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let employer_id = claims.require_employer()?;
    let (job, top_candidates) = state.application_service.shortlist(employer_id, job_id).await?;
    Ok(Json(ShortlistResponse {
        job_id: job.id,
        job_title: job.title,
        top_candidates,
    }))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/notes",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = CreateNotePayload,
    responses(
        (status = 201, description = "Note added"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn add_application_note(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateNotePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let employer_id = claims.require_employer()?;
    let note = state
        .application_service
        .add_note(employer_id, id, payload.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(crate::dto::application_dto::ApplicationNoteResponse::from(note)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/notes",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Notes on the application"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn list_application_notes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let employer_id = claims.require_employer()?;
    state
        .application_service
        .get_visible(employer_id, true, id)
        .await?;
    let notes = state.application_service.list_notes(id).await?;
    Ok(Json(notes
        .into_iter()
        .map(crate::dto::application_dto::ApplicationNoteResponse::from)
        .collect::<Vec<_>>()))
}

#[utoipa::path(
    get,
    path = "/api/applications/{id}/history",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Status change history"),
        (status = 404, description = "Application not visible to the caller")
    )
)]
#[axum::debug_handler]
pub async fn application_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    state
        .application_service
        .get_visible(actor_id, claims.is_employer(), id)
        .await?;
    let history = state.application_service.history(id).await?;
    Ok(Json(history
        .into_iter()
        .map(crate::dto::application_dto::StatusHistoryResponse::from)
        .collect::<Vec<_>>()))
}

#[utoipa::path(
    post,
    path = "/api/profile/analyze",
    responses(
        (status = 202, description = "Profile scoring enqueued")
    )
)]
#[axum::debug_handler]
pub async fn analyze_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let candidate_id = claims.require_candidate()?;
    let job_id = state
        .application_service
        .enqueue_profile_score(candidate_id)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "message": "Profile analysis enqueued",
            "task_id": job_id,
        })),
    ))
}
