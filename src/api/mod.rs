// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # HTTP Router
//!
//! Every `/v1` route first passes `optional_auth`, then `rate_limit`, so
//! every request is counted: by address when anonymous or carrying a bad
//! token, per principal otherwise. Member routes then add `authenticate`
//! and the route's own role and email-verification gates.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        authenticate, authorize, optional_auth, require_verified_email, Principal, Role, RoleSet,
    },
    models::{
        AuthResponse, LoginRequest, RegisterRequest, SetStatusRequest, SetVerificationRequest,
        UpdateProfileRequest, UserProfile, UserResponse,
    },
    rate_limit::rate_limit,
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod health;
pub mod users;

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/users/{user_id}", get(users::get_profile));

    let verified_member_routes = Router::new()
        .route("/users/me/profile", put(users::update_profile))
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(
                    RoleSet::from([Role::Student, Role::Admin]),
                    authorize,
                ))
                .layer(from_fn(require_verified_email)),
        );

    let admin_routes = Router::new()
        .route(
            "/admin/users/{user_id}/verification",
            put(admin::set_verification),
        )
        .route("/admin/users/{user_id}/status", put(admin::set_status))
        .route_layer(from_fn_with_state(RoleSet::from([Role::Admin]), authorize));

    let member_routes = Router::new()
        .route("/users/me", get(users::get_current_user))
        .merge(verified_member_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.auth.clone(), authenticate));

    let v1_routes = Router::new()
        .merge(public_routes)
        .merge(member_routes)
        .route_layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(state.auth.clone(), optional_auth))
                .layer(from_fn_with_state(state.rate_limiter.clone(), rate_limit)),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        auth::register,
        auth::login,
        users::get_current_user,
        users::get_profile,
        users::update_profile,
        admin::set_verification,
        admin::set_status
    ),
    components(
        schemas(
            Role,
            Principal,
            RegisterRequest,
            LoginRequest,
            AuthResponse,
            UserProfile,
            UserResponse,
            UpdateProfileRequest,
            SetVerificationRequest,
            SetStatusRequest,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration and sign-in"),
        (name = "Users", description = "Member profiles"),
        (name = "Admin", description = "Account moderation")
    )
)]
struct ApiDoc;
