use axum::{Json, extract::State};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    error::ApiError,
    models::{LoginRequest, PublicStats, SessionGrant},
};

/// ProviderTokenResponse
///
/// The part of the auth provider's password-grant response we rely on: the
/// provider's identifier for the user.
#[derive(Deserialize)]
struct ProviderTokenResponse {
    user: ProviderUser,
}

#[derive(Deserialize)]
struct ProviderUser {
    id: String,
    email: Option<String>,
}

/// health
///
/// [Unauthenticated Route] Liveness check for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// get_public_stats
///
/// [Unauthenticated Route] Aggregate counters; exposes no folder contents.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Counters", body = PublicStats))
)]
pub async fn get_public_stats(State(state): State<AppState>) -> Result<Json<PublicStats>, ApiError> {
    Ok(Json(state.repo.get_public_stats().await?))
}

/// login
///
/// [Unauthenticated Route] Exchanges email and password for a session.
///
/// *Flow*: the password is checked by the external auth provider (it is never stored
/// or logged here). The provider's user id is mapped onto a local numeric user id and
/// a fresh random token is stored with an expiry of `session_ttl`. The returned
/// `(userid, token)` pair is the credential for every authenticated route.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionGrant),
        (status = 401, description = "Rejected by the auth provider"),
        (status = 502, description = "Auth provider unreachable")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionGrant>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    // Step 1: let the provider verify the password. The shared client carries the
    // configured timeout; an expired call is reported as 502.
    let token_url = format!(
        "{}/auth/v1/token?grant_type=password",
        state.config.auth_url.trim_end_matches('/')
    );
    let response = state
        .http
        .post(token_url)
        .header("apikey", &state.config.auth_key)
        .json(&serde_json::json!({ "email": payload.email, "password": payload.password }))
        .send()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    if response.status().is_client_error() {
        return Err(ApiError::Unauthorized(
            "invalid email or password".to_string(),
        ));
    }
    if !response.status().is_success() {
        return Err(ApiError::Upstream(format!(
            "auth provider answered {}",
            response.status()
        )));
    }

    let provider = response
        .json::<ProviderTokenResponse>()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    // Step 2: mirror the identity locally and issue the session.
    let email = provider.user.email.unwrap_or(payload.email);
    let user = state.repo.upsert_user(&provider.user.id, &email).await?;

    let ttl = chrono::Duration::from_std(state.config.session_ttl)
        .map_err(|_| ApiError::Internal("session ttl out of range"))?;
    let expires_at = Utc::now() + ttl;
    let token = Uuid::new_v4().simple().to_string();
    state
        .repo
        .create_session(user.id, &token, expires_at)
        .await?;

    tracing::info!(user_id = user.id, "session issued");
    Ok(Json(SessionGrant {
        userid: user.id,
        token,
        expires_at,
    }))
}
