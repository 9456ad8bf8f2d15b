use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::middleware::auth::require_bearer_auth;
use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::services::analytics_service::AnalyticsService;
use crate::services::application_service::ApplicationService;
use crate::services::interview_service::InterviewService;
use crate::services::queue_service::AiQueueService;
use crate::services::scoring_service::{provider_from_config, ScoringProvider};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub application_service: ApplicationService,
    pub interview_service: InterviewService,
    pub analytics_service: AnalyticsService,
    pub queue_service: AiQueueService,
    pub scoring: Arc<dyn ScoringProvider>,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let scoring = provider_from_config();
        let queue_service = AiQueueService::new(pool.clone());
        let application_service = ApplicationService::new(pool.clone(), queue_service.clone());
        let interview_service =
            InterviewService::new(pool.clone(), application_service.clone(), queue_service.clone());
        let analytics_service = AnalyticsService::new(pool.clone(), scoring.clone());
        Self {
            pool,
            application_service,
            interview_service,
            analytics_service,
            queue_service,
            scoring,
        }
    }
}

/// Assembles the full router. Everything under /api requires a bearer
/// token; /health stays open for probes.
pub fn app(state: AppState, rate_limiter: RateLimiter) -> Router {
    let api = Router::new()
        .route(
            "/api/applications",
            post(routes::application::submit_application),
        )
        .route(
            "/api/applications/mine",
            get(routes::application::list_my_applications),
        )
        .route(
            "/api/applications/bulk-status",
            post(routes::application::bulk_update_status),
        )
        .route("/api/applications/:id", get(routes::application::get_application))
        .route(
            "/api/applications/:id/withdraw",
            post(routes::application::withdraw_application),
        )
        .route(
            "/api/applications/:id/status",
            patch(routes::application::update_application_status),
        )
        .route(
            "/api/applications/:id/notes",
            post(routes::application::add_application_note)
                .get(routes::application::list_application_notes),
        )
        .route(
            "/api/applications/:id/history",
            get(routes::application::application_history),
        )
        .route(
            "/api/jobs/:job_id/applications",
            get(routes::application::list_job_applications),
        )
        .route(
            "/api/jobs/:job_id/shortlist",
            get(routes::application::job_shortlist),
        )
        .route(
            "/api/profile/analyze",
            post(routes::application::analyze_my_profile),
        )
        .route(
            "/api/interviews",
            post(routes::interview::create_interview).get(routes::interview::list_interviews),
        )
        .route(
            "/api/interviews/upcoming",
            get(routes::interview::upcoming_interviews),
        )
        .route("/api/interviews/stats", get(routes::interview::interview_stats))
        .route(
            "/api/interviews/:id",
            get(routes::interview::get_interview).patch(routes::interview::update_interview),
        )
        .route(
            "/api/interviews/:id/cancel",
            post(routes::interview::cancel_interview),
        )
        .route(
            "/api/interviews/:id/reschedule",
            post(routes::interview::reschedule_interview),
        )
        .route(
            "/api/interviews/:id/video",
            post(routes::interview::upload_interview_video),
        )
        .route(
            "/api/interviews/:id/questions",
            post(routes::interview::add_interview_question)
                .get(routes::interview::list_interview_questions),
        )
        .route(
            "/api/interviews/:id/feedback",
            post(routes::interview::add_interview_feedback),
        )
        .route("/api/analytics/forecast", get(routes::analytics::forecast))
        .route("/api/analytics/overview", get(routes::analytics::overview))
        .layer(axum_middleware::from_fn(require_bearer_auth));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .layer(axum_middleware::from_fn_with_state(
            rate_limiter,
            rps_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
