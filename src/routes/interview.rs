use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{
        CreateInterviewPayload, CreateQuestionPayload, FeedbackPayload, InterviewFeedbackResponse,
        InterviewListQuery, InterviewQuestionResponse, InterviewResponse, InterviewStatsResponse,
        ReschedulePayload, UpdateInterviewPayload, VideoUploadPayload,
    },
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/interviews",
    request_body = CreateInterviewPayload,
    responses(
        (status = 201, description = "Interview scheduled", body = Json<InterviewResponse>),
        (status = 403, description = "Application belongs to another employer's job"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn create_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let employer_id = claims.require_employer()?;
    let interview = state.interview_service.create(employer_id, payload).await?;
    Ok((StatusCode::CREATED, Json(InterviewResponse::from(interview))))
}

#[utoipa::path(
    get,
    path = "/api/interviews",
    params(
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("time" = Option<String>, Query, description = "'upcoming' or 'past'")
    ),
    responses(
        (status = 200, description = "Caller's interviews")
    )
)]
#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<InterviewListQuery>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let items = state
        .interview_service
        .list(actor_id, claims.is_employer(), &query)
        .await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/interviews/upcoming",
    responses(
        (status = 200, description = "Next scheduled interviews")
    )
)]
#[axum::debug_handler]
pub async fn upcoming_interviews(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let employer_id = claims.require_employer()?;
    let items = state.interview_service.upcoming(employer_id).await?;
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/interviews/stats",
    responses(
        (status = 200, description = "Interview aggregates", body = Json<InterviewStatsResponse>)
    )
)]
#[axum::debug_handler]
pub async fn interview_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let employer_id = claims.require_employer()?;
    let stats = state.interview_service.stats(employer_id).await?;
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/api/interviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Interview detail", body = Json<InterviewResponse>),
        (status = 404, description = "Interview not visible to the caller")
    )
)]
#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let interview = state.interview_service.get_visible(actor_id, id).await?;
    Ok(Json(InterviewResponse::from(interview)))
}

#[utoipa::path(
    patch,
    path = "/api/interviews/{id}",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    request_body = UpdateInterviewPayload,
    responses(
        (status = 200, description = "Interview updated", body = Json<InterviewResponse>),
        (status = 400, description = "Transition not allowed"),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn update_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let employer_id = claims.require_employer()?;
    let interview = state.interview_service.update(employer_id, id, payload).await?;
    Ok(Json(InterviewResponse::from(interview)))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Interview cancelled", body = Json<InterviewResponse>),
        (status = 400, description = "Interview already completed or cancelled"),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn cancel_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let employer_id = claims.require_employer()?;
    let interview = state.interview_service.cancel(employer_id, id).await?;
    Ok(Json(InterviewResponse::from(interview)))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/reschedule",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    request_body = ReschedulePayload,
    responses(
        (status = 200, description = "Interview rescheduled", body = Json<InterviewResponse>),
        (status = 400, description = "Interview cannot be rescheduled"),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn reschedule_interview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReschedulePayload>,
) -> Result<impl IntoResponse> {
    let employer_id = claims.require_employer()?;
    let interview = state
        .interview_service
        .reschedule(employer_id, id, payload)
        .await?;
    Ok(Json(InterviewResponse::from(interview)))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/video",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    request_body = VideoUploadPayload,
    responses(
        (status = 202, description = "Video stored, analysis enqueued"),
        (status = 404, description = "Interview not visible to the caller")
    )
)]
#[axum::debug_handler]
pub async fn upload_interview_video(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VideoUploadPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let actor_id = claims.actor_id()?;
    let interview = state
        .interview_service
        .upload_video(actor_id, id, payload.video_url)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(InterviewResponse::from(interview))))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/questions",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    request_body = CreateQuestionPayload,
    responses(
        (status = 201, description = "Question added"),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn add_interview_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let employer_id = claims.require_employer()?;
    let question = state
        .interview_service
        .add_question(employer_id, id, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(InterviewQuestionResponse::from(question)),
    ))
}

#[utoipa::path(
    get,
    path = "/api/interviews/{id}/questions",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    responses(
        (status = 200, description = "Questions for the interview"),
        (status = 404, description = "Interview not visible to the caller")
    )
)]
#[axum::debug_handler]
pub async fn list_interview_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let actor_id = claims.actor_id()?;
    let questions = state
        .interview_service
        .list_questions(actor_id, id)
        .await?;
    Ok(Json(questions
        .into_iter()
        .map(InterviewQuestionResponse::from)
        .collect::<Vec<_>>()))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/feedback",
    params(
        ("id" = Uuid, Path, description = "Interview ID")
    ),
    request_body = FeedbackPayload,
    responses(
        (status = 201, description = "Feedback recorded"),
        (status = 400, description = "Feedback already submitted"),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn add_interview_feedback(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let candidate_id = claims.require_candidate()?;
    let feedback = state
        .interview_service
        .add_feedback(candidate_id, id, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(InterviewFeedbackResponse::from(feedback)),
    ))
}
