//! End-to-end tests for the interview lifecycle and its cascades into the
//! application state machine. Require Postgres via DATABASE_URL; no-op
//! otherwise.

use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use jobmarket_backend::middleware::auth::Claims;
use jobmarket_backend::middleware::rate_limit::RateLimiter;
use jobmarket_backend::{app, AppState};

const TEST_SECRET: &str = "test_secret_key";

async fn setup() -> Option<(AppState, Router, PgPool)> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", TEST_SECRET);
    let _ = jobmarket_backend::config::init_config();

    let pool = jobmarket_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    let state = AppState::new(pool.clone());
    let router = app(state.clone(), RateLimiter::new(10_000));
    Some((state, router, pool))
}

fn token(user_id: Uuid, role: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: 2_000_000_000,
        role: Some(role.to_string()),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("token")
}

async fn seed_user(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, full_name, email, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{role} {id}"))
        .bind(format!("{id}@example.com"))
        .bind(role)
        .execute(pool)
        .await
        .expect("seed user");
    id
}

/// Seeds employer + candidate + open job + shortlisted application and
/// returns (employer, candidate, application_id).
async fn seed_shortlisted_application(pool: &PgPool) -> (Uuid, Uuid, Uuid) {
    let employer = seed_user(pool, "employer").await;
    let candidate = seed_user(pool, "candidate").await;
    let job = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO jobs (id, employer_id, title, description, status)
           VALUES ($1, $2, 'Data Engineer', 'Pipelines', 'open')"#,
    )
    .bind(job)
    .bind(employer)
    .execute(pool)
    .await
    .expect("seed job");

    let application = Uuid::new_v4();
    sqlx::query(
        r#"INSERT INTO applications (id, job_id, user_id, status)
           VALUES ($1, $2, $3, 'shortlisted')"#,
    )
    .bind(application)
    .bind(job)
    .bind(candidate)
    .execute(pool)
    .await
    .expect("seed application");

    (employer, candidate, application)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    bearer: &str,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", format!("Bearer {bearer}"));
    let request = match body {
        Some(b) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

async fn application_status(pool: &PgPool, id: Uuid) -> String {
    sqlx::query_scalar("SELECT status FROM applications WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn scheduling_cascades_into_the_application() {
    let Some((_state, router, pool)) = setup().await else {
        return;
    };

    let (employer, _candidate, application) = seed_shortlisted_application(&pool).await;
    let employer_token = token(employer, "employer");

    let scheduled_at = Utc::now() + Duration::days(2);
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/interviews",
        &employer_token,
        Some(json!({
            "application_id": application,
            "interview_type": "video",
            "scheduled_at": scheduled_at,
            "meeting_url": "https://meet.example.com/abc"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["duration_minutes"], 60);

    assert_eq!(
        application_status(&pool, application).await,
        "interview_scheduled"
    );

    // The cascade is audited like any other status change.
    let history_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM application_status_history WHERE application_id = $1",
    )
    .bind(application)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(history_count, 1);
}

#[tokio::test]
async fn scheduling_for_foreign_application_is_forbidden() {
    let Some((_state, router, pool)) = setup().await else {
        return;
    };

    let (_owner, _candidate, application) = seed_shortlisted_application(&pool).await;
    let intruder = seed_user(&pool, "employer").await;

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/interviews",
        &token(intruder, "employer"),
        Some(json!({
            "application_id": application,
            "interview_type": "phone",
            "scheduled_at": Utc::now() + Duration::days(1)
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn completion_stamps_once_and_cascades() {
    let Some((_state, router, pool)) = setup().await else {
        return;
    };

    let (employer, _candidate, application) = seed_shortlisted_application(&pool).await;
    let employer_token = token(employer, "employer");

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/interviews",
        &employer_token,
        Some(json!({
            "application_id": application,
            "interview_type": "technical",
            "scheduled_at": Utc::now() + Duration::days(1)
        })),
    )
    .await;
    let interview_id = body["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/api/interviews/{interview_id}"),
        &employer_token,
        Some(json!({ "status": "completed", "interviewer_rating": 8 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let completed_at = body["completed_at"].as_str().unwrap().to_string();
    assert_eq!(application_status(&pool, application).await, "interviewed");

    // Updating a completed interview's notes keeps the original stamp.
    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/api/interviews/{interview_id}"),
        &employer_token,
        Some(json!({ "notes": "Strong systems knowledge" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completed_at"].as_str().unwrap(), completed_at);

    // A completed interview cannot go back to scheduled.
    let (status, _) = send(
        &router,
        Method::PATCH,
        &format!("/api/interviews/{interview_id}"),
        &employer_token,
        Some(json!({ "status": "scheduled" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cancel_and_reschedule_guards() {
    let Some((_state, router, pool)) = setup().await else {
        return;
    };

    let (employer, _candidate, application) = seed_shortlisted_application(&pool).await;
    let employer_token = token(employer, "employer");

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/interviews",
        &employer_token,
        Some(json!({
            "application_id": application,
            "interview_type": "phone",
            "scheduled_at": Utc::now() + Duration::days(3)
        })),
    )
    .await;
    let interview_id = body["id"].as_str().unwrap().to_string();

    let new_time = Utc::now() + Duration::days(5);
    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/reschedule"),
        &employer_token,
        Some(json!({ "scheduled_at": new_time })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "rescheduled");

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/cancel"),
        &employer_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    // Cancelling twice is rejected.
    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/cancel"),
        &employer_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn video_upload_enqueues_analysis() {
    let Some((state, router, pool)) = setup().await else {
        return;
    };

    let (employer, candidate, application) = seed_shortlisted_application(&pool).await;
    let employer_token = token(employer, "employer");

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/interviews",
        &employer_token,
        Some(json!({
            "application_id": application,
            "interview_type": "video",
            "scheduled_at": Utc::now() + Duration::days(1)
        })),
    )
    .await;
    let interview_id = body["id"].as_str().unwrap().to_string();

    // The interviewed candidate uploads their own recording.
    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/video"),
        &token(candidate, "candidate"),
        Some(json!({ "video_url": "https://cdn.example.com/recordings/a.webm" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");

    // The owning employer may replace it; an unrelated candidate may not.
    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/video"),
        &employer_token,
        Some(json!({ "video_url": "https://cdn.example.com/recordings/b.webm" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let outsider = seed_user(&pool, "candidate").await;
    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/video"),
        &token(outsider, "candidate"),
        Some(json!({ "video_url": "https://cdn.example.com/recordings/c.webm" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Drain the queue; the local provider writes a deterministic review.
    while state.queue_service.run_once(&state).await.expect("worker") {}

    let (score, review): (Option<f64>, Option<JsonValue>) = sqlx::query_as(
        "SELECT ai_score, ai_review FROM interviews WHERE id = $1",
    )
    .bind(Uuid::parse_str(&interview_id).unwrap())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(score.is_some());
    assert!(review.is_some());
}

#[tokio::test]
async fn stats_exclude_null_ratings_from_averages() {
    let Some((_state, router, pool)) = setup().await else {
        return;
    };

    let (employer, _candidate, application) = seed_shortlisted_application(&pool).await;
    let employer_token = token(employer, "employer");

    for rating in [Some(8), None] {
        sqlx::query(
            r#"INSERT INTO interviews
                   (application_id, interview_type, status, scheduled_at, interviewer_id, interviewer_rating)
               VALUES ($1, 'phone', 'completed', NOW(), $2, $3)"#,
        )
        .bind(application)
        .bind(employer)
        .bind(rating)
        .execute(&pool)
        .await
        .unwrap();
    }

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/interviews/stats",
        &employer_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["total_interviews"], 2);
    assert_eq!(body["by_status"]["completed"], 2);
    // One rated 8, one unrated: average is 8, not 4.
    assert_eq!(body["avg_interviewer_rating"], 8.0);
    assert!(body["avg_ai_score"].is_null());
}

#[tokio::test]
async fn feedback_is_candidate_submitted_and_one_per_interview() {
    let Some((_state, router, pool)) = setup().await else {
        return;
    };

    let (employer, candidate, application) = seed_shortlisted_application(&pool).await;
    let employer_token = token(employer, "employer");
    let candidate_token = token(candidate, "candidate");

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/interviews",
        &employer_token,
        Some(json!({
            "application_id": application,
            "interview_type": "in_person",
            "scheduled_at": Utc::now() + Duration::days(1)
        })),
    )
    .await;
    let interview_id = body["id"].as_str().unwrap().to_string();

    // Feedback rates the candidate's experience; the interviewer has the
    // rating field on the interview itself.
    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/feedback"),
        &employer_token,
        Some(json!({ "rating": 4 })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/feedback"),
        &candidate_token,
        Some(json!({ "rating": 4, "comments": "Well organized" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/feedback"),
        &candidate_token,
        Some(json!({ "rating": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A candidate from another application cannot rate this interview.
    let outsider = seed_user(&pool, "candidate").await;
    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/feedback"),
        &token(outsider, "candidate"),
        Some(json!({ "rating": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn candidate_reads_own_interview_and_questions() {
    let Some((_state, router, pool)) = setup().await else {
        return;
    };

    let (employer, candidate, application) = seed_shortlisted_application(&pool).await;
    let employer_token = token(employer, "employer");
    let candidate_token = token(candidate, "candidate");

    let (_, body) = send(
        &router,
        Method::POST,
        "/api/interviews",
        &employer_token,
        Some(json!({
            "application_id": application,
            "interview_type": "video",
            "scheduled_at": Utc::now() + Duration::days(2)
        })),
    )
    .await;
    let interview_id = body["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &router,
        Method::POST,
        &format!("/api/interviews/{interview_id}/questions"),
        &employer_token,
        Some(json!({ "question_text": "Walk me through a recent project" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // The candidate sees the interview detail and its questions.
    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/interviews/{interview_id}"),
        &candidate_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["id"], interview_id.as_str());

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/api/interviews/{interview_id}/questions"),
        &candidate_token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Their listing shows it too.
    let (status, body) = send(&router, Method::GET, "/api/interviews", &candidate_token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // A foreign candidate sees none of it.
    let outsider = seed_user(&pool, "candidate").await;
    let (status, _) = send(
        &router,
        Method::GET,
        &format!("/api/interviews/{interview_id}"),
        &token(outsider, "candidate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // But only the interviewer may mutate.
    let (status, _) = send(
        &router,
        Method::PATCH,
        &format!("/api/interviews/{interview_id}"),
        &candidate_token,
        Some(json!({ "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
