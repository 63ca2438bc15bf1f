// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration and sign-in.
//!
//! Both endpoints return a freshly issued bearer token. Password hashing
//! runs on the blocking pool.

use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};

use crate::{
    auth::{IssuedToken, Role},
    error::{ApiError, ApiJson},
    models::{AuthResponse, LoginRequest, RegisterRequest, MIN_PASSWORD_CHARS},
    state::AppState,
    store::{hash_password, verify_password, StoreError, UserRecord},
};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required."));
    }
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::bad_request("A valid email address is required."));
    }
    if request.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters."
        )));
    }
    Ok(())
}

fn issue_for(state: &AppState, user: &UserRecord) -> Result<AuthResponse, ApiError> {
    let IssuedToken { token, expires_at } = state.issuer.issue(&user.id).map_err(|e| {
        error!(user_id = %user.id, error = %e, "Failed to issue token");
        ApiError::internal()
    })?;

    Ok(AuthResponse {
        success: true,
        token,
        expires_at,
        user: user.profile(true),
    })
}

/// Create a student account.
///
/// New accounts start with an unverified email address.
#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validate_registration(&request)?;

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            error!(error = %e, "Password hashing task failed");
            ApiError::internal()
        })?
        .map_err(|e| {
            error!(error = %e, "Password hashing failed");
            ApiError::internal()
        })?;

    let user = UserRecord::new(&request.name, &request.email, password_hash, Role::default());
    match state.users.write().await.insert(user.clone()) {
        Ok(()) => {}
        Err(StoreError::EmailTaken) => {
            return Err(ApiError::conflict("An account with this email already exists."))
        }
        Err(e) => {
            error!(error = %e, "Failed to store new user");
            return Err(ApiError::internal());
        }
    }

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(issue_for(&state, &user)?)))
}

/// Sign in with email and password.
#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = AuthResponse),
        (status = 401, description = "Invalid credentials or deactivated account"),
        (status = 429, description = "Too many requests")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = state
        .users
        .read()
        .await
        .find_by_email(&request.email)
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("invalid_credentials", INVALID_CREDENTIALS))?;

    let password = request.password;
    let stored_hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| {
            error!(error = %e, "Password verification task failed");
            ApiError::internal()
        })?;

    if !matches {
        return Err(ApiError::unauthorized("invalid_credentials", INVALID_CREDENTIALS));
    }
    if !user.active {
        return Err(ApiError::unauthorized(
            "account_deactivated",
            "Account has been deactivated.",
        ));
    }

    info!(user_id = %user.id, "User signed in");
    Ok(Json(issue_for(&state, &user)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn registration_validation() {
        assert!(validate_registration(&registration("Ada", "ada@campus.example", "longenough")).is_ok());

        for bad in [
            registration("  ", "ada@campus.example", "longenough"),
            registration("Ada", "ada.campus.example", "longenough"),
            registration("Ada", "ada@campus.example", "short"),
        ] {
            let err = validate_registration(&bad).unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
        }
    }
}
