// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, warn};

use crate::{
    auth::{Auth, OptionalAuth, Principal},
    error::{ApiError, ApiJson},
    models::{UpdateProfileRequest, UserResponse, MAX_BIO_CHARS},
    state::AppState,
    store::StoreError,
};

/// Email addresses are visible to their owner and to admins.
fn can_see_email(viewer: Option<&Principal>, user_id: &str) -> bool {
    viewer.is_some_and(|viewer| viewer.id == user_id || viewer.is_admin())
}

fn validate_update(update: &UpdateProfileRequest) -> Result<(), ApiError> {
    if update.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(ApiError::bad_request("Name cannot be empty."));
    }
    if update
        .bio
        .as_deref()
        .is_some_and(|bio| bio.trim().chars().count() > MAX_BIO_CHARS)
    {
        return Err(ApiError::bad_request(format!(
            "Bio must be at most {MAX_BIO_CHARS} characters."
        )));
    }
    Ok(())
}

/// Get the current authenticated user's profile.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn get_current_user(
    Auth(principal): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let users = state.users.read().await;
    let user = users
        .get(&principal.id)
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    Ok(Json(user.profile(true).into()))
}

/// Get a member's public profile.
///
/// Signed-in callers viewing themselves, and admins, also see the email.
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}",
    tag = "Users",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Member profile", body = UserResponse),
        (status = 404, description = "No such member"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn get_profile(
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let users = state.users.read().await;
    let user = users
        .get(&user_id)
        .ok_or_else(|| ApiError::not_found("User not found."))?;
    Ok(Json(user.profile(can_see_email(viewer.as_ref(), &user_id)).into()))
}

/// Update the current user's name and bio.
///
/// Requires a verified email address.
#[utoipa::path(
    put,
    path = "/v1/users/me/profile",
    tag = "Users",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Email not verified"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn update_profile(
    Auth(principal): Auth,
    State(state): State<AppState>,
    ApiJson(update): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    validate_update(&update)?;

    let updated = state
        .users
        .write()
        .await
        .update_profile(&principal.id, update)
        .map_err(|e| match e {
            StoreError::NotFound(_) => ApiError::not_found("User not found."),
            other => {
                warn!(user_id = %principal.id, error = %other, "Profile update failed");
                ApiError::internal()
            }
        })?;

    info!(user_id = %principal.id, "Profile updated");
    Ok(Json(updated.profile(true).into()))
}
