// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Not a structurally valid JWT
    #[error("token is malformed")]
    MalformedToken,
    /// `exp` is in the past
    #[error("token has expired")]
    ExpiredToken,
    /// Signature does not match the shared secret
    #[error("token signature is invalid")]
    InvalidSignature,
    /// Any other validation failure (algorithm, missing claim, not yet valid)
    #[error("token rejected: {0}")]
    Rejected(String),
    /// Signing a new token failed
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Principal lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalError {
    #[error("principal not found")]
    PrincipalNotFound,
    #[error("principal is deactivated")]
    PrincipalDeactivated,
    /// The user directory itself failed
    #[error("user directory error: {0}")]
    Directory(String),
}

/// Gate-level authentication error.
///
/// Every variant maps to a terminal response; the message is what the caller
/// sees. `Internal` carries detail for the server log only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header, or not of the form `Bearer <token>`
    #[error("Access denied. No token provided.")]
    MissingToken,
    /// Token has expired
    #[error("Token has expired. Please log in again.")]
    TokenExpired,
    /// Token signature or structure is invalid
    #[error("Invalid token.")]
    InvalidToken,
    /// Token failed some other verification check
    #[error("Token verification failed.")]
    TokenVerification,
    /// Token subject has no user record
    #[error("User not found.")]
    UserNotFound,
    /// User record is inactive
    #[error("Account has been deactivated.")]
    AccountDeactivated,
    /// A role or verification gate ran without a resolved principal
    #[error("Authentication required.")]
    AuthenticationRequired,
    /// Principal's role is not permitted
    #[error("Insufficient permissions.")]
    InsufficientPermissions,
    /// Principal has not verified their email address
    #[error("Please verify your email address to access this resource.")]
    EmailNotVerified,
    /// Unexpected fault while authenticating
    #[error("Authentication error.")]
    Internal(String),
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    message: String,
    error_code: &'static str,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenVerification => "token_verification_failed",
            AuthError::UserNotFound => "user_not_found",
            AuthError::AccountDeactivated => "account_deactivated",
            AuthError::AuthenticationRequired => "authentication_required",
            AuthError::InsufficientPermissions => "insufficient_permissions",
            AuthError::EmailNotVerified => "email_not_verified",
            AuthError::Internal(_) => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::TokenVerification
            | AuthError::UserNotFound
            | AuthError::AccountDeactivated
            | AuthError::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            AuthError::InsufficientPermissions | AuthError::EmailNotVerified => {
                StatusCode::FORBIDDEN
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::ExpiredToken => AuthError::TokenExpired,
            TokenError::InvalidSignature | TokenError::MalformedToken => AuthError::InvalidToken,
            TokenError::Rejected(_) => AuthError::TokenVerification,
            TokenError::Signing(msg) => AuthError::Internal(msg),
        }
    }
}

impl From<PrincipalError> for AuthError {
    fn from(err: PrincipalError) -> Self {
        match err {
            PrincipalError::PrincipalNotFound => AuthError::UserNotFound,
            PrincipalError::PrincipalDeactivated => AuthError::AccountDeactivated,
            PrincipalError::Directory(msg) => AuthError::Internal(msg),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            success: false,
            message: self.to_string(),
            error_code: self.error_code(),
        });
        (status, body).into_response()
    }
}
