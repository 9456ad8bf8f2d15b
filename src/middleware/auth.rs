use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};

pub const ROLE_CANDIDATE: &str = "candidate";
pub const ROLE_EMPLOYER: &str = "employer";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn actor_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| Error::BadRequest("Token subject is not a valid id".to_string()))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .map(|r| r.eq_ignore_ascii_case(role))
            .unwrap_or(false)
    }

    /// Employer-only operations; admins pass as well.
    pub fn require_employer(&self) -> Result<Uuid> {
        if self.has_role(ROLE_EMPLOYER) || self.has_role(ROLE_ADMIN) {
            self.actor_id()
        } else {
            Err(Error::Forbidden("Employer role required".to_string()))
        }
    }

    pub fn require_candidate(&self) -> Result<Uuid> {
        if self.has_role(ROLE_CANDIDATE) {
            self.actor_id()
        } else {
            Err(Error::Forbidden("Candidate role required".to_string()))
        }
    }

    pub fn is_employer(&self) -> bool {
        self.has_role(ROLE_EMPLOYER) || self.has_role(ROLE_ADMIN)
    }
}

/// Validates the bearer token and inserts `Claims` into request extensions.
/// Role checks happen per handler; this layer only establishes identity.
pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"missing_authorization"})),
        )
            .into_response();
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"bad_authorization"})),
        )
            .into_response();
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"unsupported_scheme"})),
        )
            .into_response();
    };

    let config = crate::config::get_config();
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => {
            req.extensions_mut().insert(data.claims);
            next.run(req).await
        }
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error":"invalid_token"})),
        )
            .into_response(),
    }
}
