// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization gates for Axum.
//!
//! Each gate is an `axum::middleware::from_fn` function that either forwards
//! the request or answers it with an [`AuthError`]. Gates run in the order
//! they are layered on a route:
//!
//! ```rust,ignore
//! let guarded = ServiceBuilder::new()
//!     .layer(from_fn_with_state(auth_state, authenticate))
//!     .layer(from_fn_with_state(RoleSet::from([Role::Student, Role::Admin]), authorize))
//!     .layer(from_fn(require_verified_email));
//!
//! Router::new().route("/profile", put(update_profile).route_layer(guarded));
//! ```
//!
//! `authorize` and `require_verified_email` read the [`Principal`] left in the
//! request extensions by `authenticate` and must be layered after it.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};

use super::{AuthError, Principal, PrincipalLoader, RoleSet, TokenVerifier};

/// Shared state for the authentication gates.
#[derive(Clone)]
pub struct AuthState {
    verifier: TokenVerifier,
    loader: PrincipalLoader,
}

impl AuthState {
    pub fn new(verifier: TokenVerifier, loader: PrincipalLoader) -> Self {
        Self { verifier, loader }
    }

    /// Run the full header → token → principal check.
    pub async fn authenticate_headers(&self, headers: &HeaderMap) -> Result<Principal, AuthError> {
        let token = bearer_token(headers)?;
        let claims = self.verifier.verify(token)?;
        let principal = self.loader.load(&claims.sub).await?;
        Ok(principal)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::MissingToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }

    Ok(token)
}

/// Hard authentication gate.
///
/// Forwards with the [`Principal`] attached, or rejects with 401 (500 for
/// internal faults).
pub async fn authenticate(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth.authenticate_headers(request.headers()).await {
        Ok(principal) => {
            debug!(user_id = %principal.id, "Request authenticated");
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(AuthError::Internal(detail)) => {
            error!(error = %detail, path = %request.uri().path(), "Authentication fault");
            AuthError::Internal(detail).into_response()
        }
        Err(e) => {
            debug!(error_code = e.error_code(), path = %request.uri().path(), "Authentication rejected");
            e.into_response()
        }
    }
}

/// Soft authentication gate.
///
/// Attaches the [`Principal`] when authentication succeeds and forwards
/// the request regardless of the outcome.
pub async fn optional_auth(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    match auth.authenticate_headers(request.headers()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
        }
        Err(AuthError::MissingToken) => {}
        Err(AuthError::Internal(detail)) => {
            warn!(error = %detail, "Optional authentication fault, continuing anonymously");
        }
        Err(e) => {
            debug!(error_code = e.error_code(), "Optional authentication failed, continuing anonymously");
        }
    }

    next.run(request).await
}

/// Role gate. Forwards only principals whose role is in the configured set.
pub async fn authorize(State(roles): State<RoleSet>, request: Request, next: Next) -> Response {
    let Some(principal) = request.extensions().get::<Principal>() else {
        warn!(path = %request.uri().path(), "Role gate reached without a principal");
        return AuthError::AuthenticationRequired.into_response();
    };

    if !roles.permits(principal.role) {
        debug!(user_id = %principal.id, role = %principal.role, "Role not permitted");
        return AuthError::InsufficientPermissions.into_response();
    }

    next.run(request).await
}

/// Verified-email gate.
pub async fn require_verified_email(request: Request, next: Next) -> Response {
    let Some(principal) = request.extensions().get::<Principal>() else {
        return AuthError::AuthenticationRequired.into_response();
    };

    if !principal.verified {
        return AuthError::EmailNotVerified.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::StatusCode,
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Router,
    };
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::Duration;
    use tower::{ServiceBuilder, ServiceExt};

    use super::*;
    use crate::auth::principal::tests::{principal, BrokenDirectory, FixedDirectory};
    use crate::auth::token::tests::{expired_token, TEST_SECRET};
    use crate::auth::{Role, TokenIssuer, UserDirectory};

    fn auth_state(directory: Arc<dyn UserDirectory>) -> AuthState {
        AuthState::new(
            TokenVerifier::new(TEST_SECRET, 0),
            PrincipalLoader::new(directory),
        )
    }

    fn directory() -> Arc<dyn UserDirectory> {
        Arc::new(FixedDirectory(vec![
            principal("u123", Role::Student, true, true),
            principal("admin1", Role::Admin, true, true),
            principal("fresh", Role::Student, true, false),
            principal("banned", Role::Student, false, true),
        ]))
    }

    fn token_for(user_id: &str) -> String {
        TokenIssuer::new(TEST_SECRET, Duration::hours(1))
            .issue(user_id)
            .unwrap()
            .token
    }

    async fn whoami(request: Request) -> String {
        request
            .extensions()
            .get::<Principal>()
            .map(|p| p.id.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    fn hard_router(state: AuthState) -> Router {
        Router::new()
            .route("/", get(whoami))
            .layer(from_fn_with_state(state, authenticate))
    }

    fn soft_router(state: AuthState) -> Router {
        Router::new()
            .route("/", get(whoami))
            .layer(from_fn_with_state(state, optional_auth))
    }

    fn request(auth_header: Option<String>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = auth_header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn call(router: Router, auth_header: Option<String>) -> (StatusCode, serde_json::Value, String) {
        let response = router.oneshot(request(auth_header)).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
        (status, json, text)
    }

    #[tokio::test]
    async fn authenticate_attaches_principal() {
        let router = hard_router(auth_state(directory()));
        let (status, _, body) = call(router, Some(format!("Bearer {}", token_for("u123")))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u123");
    }

    #[tokio::test]
    async fn authenticate_requires_header() {
        let router = hard_router(auth_state(directory()));
        let (status, json, _) = call(router, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        assert_eq!(json["error_code"], "missing_token");
    }

    #[tokio::test]
    async fn authenticate_requires_bearer_scheme() {
        let token = token_for("u123");
        for header in [format!("Token {token}"), format!("bearer{token}"), "Bearer ".to_string()] {
            let router = hard_router(auth_state(directory()));
            let (status, json, _) = call(router, Some(header)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(json["error_code"], "missing_token");
        }
    }

    #[tokio::test]
    async fn authenticate_rejects_expired_token() {
        let router = hard_router(auth_state(directory()));
        let (status, json, _) = call(router, Some(format!("Bearer {}", expired_token("u123")))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error_code"], "token_expired");
        assert_eq!(json["message"], "Token has expired. Please log in again.");
    }

    #[tokio::test]
    async fn authenticate_rejects_tampered_signature() {
        let token = token_for("u123");
        let (head, signature) = token.rsplit_once('.').unwrap();
        let mut sig = URL_SAFE_NO_PAD.decode(signature).unwrap();
        sig[0] ^= 0xff;
        let tampered = format!("{head}.{}", URL_SAFE_NO_PAD.encode(sig));

        let router = hard_router(auth_state(directory()));
        let (status, json, _) = call(router, Some(format!("Bearer {tampered}"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error_code"], "invalid_token");
    }

    #[tokio::test]
    async fn authenticate_rejects_swapped_subject() {
        // Re-point a valid token's payload at another user without re-signing.
        let token = token_for("u123");
        let parts: Vec<&str> = token.split('.').collect();
        let mut claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        claims["sub"] = "admin1".into();
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(claims.to_string()),
            parts[2]
        );

        let router = hard_router(auth_state(directory()));
        let (status, json, _) = call(router, Some(format!("Bearer {forged}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error_code"], "invalid_token");
    }

    #[tokio::test]
    async fn authenticate_rejects_unknown_user() {
        let router = hard_router(auth_state(directory()));
        let (status, json, _) = call(router, Some(format!("Bearer {}", token_for("ghost")))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error_code"], "user_not_found");
    }

    #[tokio::test]
    async fn authenticate_rejects_deactivated_user() {
        let router = hard_router(auth_state(directory()));
        let (status, json, _) = call(router, Some(format!("Bearer {}", token_for("banned")))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error_code"], "account_deactivated");
    }

    #[tokio::test]
    async fn authenticate_reports_directory_fault_as_500() {
        let router = hard_router(auth_state(Arc::new(BrokenDirectory)));
        let (status, json, _) = call(router, Some(format!("Bearer {}", token_for("u123")))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Authentication error.");
    }

    #[tokio::test]
    async fn authenticate_is_idempotent() {
        let state = auth_state(directory());
        let header = format!("Bearer {}", token_for("u123"));

        let first = call(hard_router(state.clone()), Some(header.clone())).await;
        let second = call(hard_router(state), Some(header)).await;
        assert_eq!(first.0, second.0);
        assert_eq!(first.2, second.2);
    }

    #[tokio::test]
    async fn optional_auth_attaches_principal_when_valid() {
        let router = soft_router(auth_state(directory()));
        let (status, _, body) = call(router, Some(format!("Bearer {}", token_for("u123")))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u123");
    }

    #[tokio::test]
    async fn optional_auth_forwards_on_every_failure() {
        let headers = [
            None,
            Some("Basic dXNlcjpwYXNz".to_string()),
            Some(format!("Bearer {}", expired_token("u123"))),
            Some("Bearer not-a-jwt".to_string()),
            Some(format!("Bearer {}", token_for("ghost"))),
            Some(format!("Bearer {}", token_for("banned"))),
        ];

        for header in headers {
            let router = soft_router(auth_state(directory()));
            let (status, _, body) = call(router, header).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, "anonymous");
        }
    }

    #[tokio::test]
    async fn optional_auth_forwards_on_directory_fault() {
        let router = soft_router(auth_state(Arc::new(BrokenDirectory)));
        let (status, _, body) = call(router, Some(format!("Bearer {}", token_for("u123")))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    fn guarded_router(state: AuthState, roles: RoleSet, verified: bool) -> Router {
        let route = Router::new().route("/", get(whoami));
        let route = if verified {
            route.route_layer(from_fn(require_verified_email))
        } else {
            route
        };
        route
            .route_layer(from_fn_with_state(roles, authorize))
            .route_layer(from_fn_with_state(state, authenticate))
    }

    #[tokio::test]
    async fn authorize_rejects_student_on_admin_route() {
        let router = guarded_router(auth_state(directory()), RoleSet::from([Role::Admin]), false);
        let (status, json, _) = call(router, Some(format!("Bearer {}", token_for("u123")))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_code"], "insufficient_permissions");
    }

    #[tokio::test]
    async fn authorize_forwards_admin_on_admin_route() {
        let router = guarded_router(auth_state(directory()), RoleSet::from([Role::Admin]), false);
        let (status, _, body) = call(router, Some(format!("Bearer {}", token_for("admin1")))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "admin1");
    }

    #[tokio::test]
    async fn authorize_without_principal_requires_authentication() {
        let router = Router::new()
            .route("/", get(whoami))
            .layer(from_fn_with_state(RoleSet::from([Role::Admin]), authorize));
        let (status, json, _) = call(router, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error_code"], "authentication_required");
    }

    #[tokio::test]
    async fn verified_gate_rejects_unverified_email() {
        let router = guarded_router(
            auth_state(directory()),
            RoleSet::from([Role::Student, Role::Admin]),
            true,
        );
        let (status, json, _) = call(router, Some(format!("Bearer {}", token_for("fresh")))).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error_code"], "email_not_verified");
    }

    #[tokio::test]
    async fn verified_gate_without_principal_requires_authentication() {
        let router = Router::new()
            .route("/", get(whoami))
            .layer(from_fn(require_verified_email));
        let (status, _, _) = call(router, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn full_chain_forwards_verified_student() {
        let chain = ServiceBuilder::new()
            .layer(from_fn_with_state(auth_state(directory()), authenticate))
            .layer(from_fn_with_state(
                RoleSet::from([Role::Student, Role::Admin]),
                authorize,
            ))
            .layer(from_fn(require_verified_email));
        let router = Router::new().route("/", get(whoami)).route_layer(chain);

        let (status, _, body) = call(router, Some(format!("Bearer {}", token_for("u123")))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "u123");
    }
}
