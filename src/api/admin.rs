// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin-only account moderation.
//!
//! Routed behind `authorize([Admin])`; the handlers still take [`Auth`] to
//! record who acted.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{error, info};

use crate::{
    auth::Auth,
    error::{ApiError, ApiJson},
    models::{SetStatusRequest, SetVerificationRequest, UserResponse},
    state::AppState,
    store::{StoreError, UserRecord},
};

fn store_error(user_id: &str, e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(_) => ApiError::not_found("User not found."),
        other => {
            error!(user_id, error = %other, "Admin update failed");
            ApiError::internal()
        }
    }
}

fn respond(user: UserRecord) -> Json<UserResponse> {
    Json(user.profile(true).into())
}

/// Mark a member's email address verified or unverified.
#[utoipa::path(
    put,
    path = "/v1/admin/users/{user_id}/verification",
    tag = "Admin",
    security(("bearer" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    request_body = SetVerificationRequest,
    responses(
        (status = 200, description = "Updated member", body = UserResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "No such member")
    )
)]
pub async fn set_verification(
    Auth(admin): Auth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<SetVerificationRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .write()
        .await
        .set_verified(&user_id, request.verified)
        .map_err(|e| store_error(&user_id, e))?;

    info!(admin_id = %admin.id, user_id = %user_id, verified = request.verified, "Verification updated");
    Ok(respond(user))
}

/// Activate or deactivate a member's account.
///
/// Deactivated members are rejected by the authentication gate on their next
/// request. Admins cannot deactivate themselves.
#[utoipa::path(
    put,
    path = "/v1/admin/users/{user_id}/status",
    tag = "Admin",
    security(("bearer" = [])),
    params(("user_id" = String, Path, description = "User ID")),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "Updated member", body = UserResponse),
        (status = 400, description = "Admin attempted to deactivate themselves"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not authorized (admin required)"),
        (status = 404, description = "No such member")
    )
)]
pub async fn set_status(
    Auth(admin): Auth,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiJson(request): ApiJson<SetStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if admin.id == user_id && !request.active {
        return Err(ApiError::bad_request(
            "Administrators cannot deactivate their own account.",
        ));
    }

    let user = state
        .users
        .write()
        .await
        .set_active(&user_id, request.active)
        .map_err(|e| store_error(&user_id, e))?;

    info!(admin_id = %admin.id, user_id = %user_id, active = request.active, "Account status updated");
    Ok(respond(user))
}
