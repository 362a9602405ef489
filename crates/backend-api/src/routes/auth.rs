use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use dreamink_auth::SignUpRequest;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::{ApiError, AppState};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SignInPayload {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[utoipa::path(
    post,
    path = "/api/signup",
    tag = "Auth",
    request_body = SignUpPayload,
    responses(
        (status = 201, description = "Account created", body = SignUpResponse),
        (status = 400, description = "Missing required fields", body = crate::error::ErrorResponse),
        (status = 409, description = "Account already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignUpPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<SignUpResponse>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection, "unreadable signup body");
        ApiError::bad_request("Missing required fields")
    })?;

    let user = state
        .authenticator()
        .sign_up(SignUpRequest {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password: payload.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/signin",
    tag = "Auth",
    request_body = SignInPayload,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 400, description = "Missing credentials", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid email or password", body = crate::error::ErrorResponse)
    )
)]
pub async fn signin(
    State(state): State<AppState>,
    payload: Result<Json<SignInPayload>, JsonRejection>,
) -> Result<Json<SignInResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection, "unreadable signin body");
        ApiError::bad_request("Missing credentials")
    })?;

    let user = state
        .authenticator()
        .sign_in(payload.email.as_deref(), payload.password.as_deref())
        .await?;

    Ok(Json(SignInResponse {
        id: user.id,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
    }))
}
