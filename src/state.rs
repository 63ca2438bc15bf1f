// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;
use tokio::sync::RwLock;

use crate::auth::{AuthState, PrincipalLoader, TokenIssuer, TokenVerifier, UserDirectory};
use crate::config::Config;
use crate::rate_limit::{RateLimitConfig, RateLimiter};
use crate::store::InMemoryUserStore;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<RwLock<InMemoryUserStore>>,
    pub auth: AuthState,
    pub issuer: TokenIssuer,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        store: InMemoryUserStore,
        secret: &str,
        token_ttl: chrono::Duration,
        leeway_secs: u64,
        rate_limit: RateLimitConfig,
    ) -> Self {
        let users = Arc::new(RwLock::new(store));
        let directory: Arc<dyn UserDirectory> = users.clone();
        let auth = AuthState::new(
            TokenVerifier::new(secret, leeway_secs),
            PrincipalLoader::new(directory),
        );

        Self {
            users,
            auth,
            issuer: TokenIssuer::new(secret, token_ttl),
            rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
        }
    }

    pub fn from_config(config: &Config, store: InMemoryUserStore) -> Self {
        Self::new(
            store,
            &config.jwt_secret,
            config.jwt_ttl,
            config.jwt_leeway_secs,
            config.rate_limit.clone(),
        )
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

impl FromRef<AppState> for Arc<RateLimiter> {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limiter.clone()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const TEST_SECRET: &str = crate::auth::token::tests::TEST_SECRET;

    /// State over `store` with the default limiter and a one-hour token TTL.
    pub(crate) fn test_state(store: InMemoryUserStore) -> AppState {
        AppState::new(
            store,
            TEST_SECRET,
            chrono::Duration::hours(1),
            0,
            RateLimitConfig::default(),
        )
    }

    #[tokio::test]
    async fn auth_state_reads_the_shared_store() {
        let state = test_state(InMemoryUserStore::new());
        state
            .users
            .write()
            .await
            .insert(crate::store::tests::record("u1", crate::auth::Role::Student, true, true))
            .unwrap();

        let issued = state.issuer.issue("u1").unwrap();
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            format!("Bearer {}", issued.token).parse().unwrap(),
        );

        let principal = state.auth.authenticate_headers(&headers).await.unwrap();
        assert_eq!(principal.id, "u1");
    }
}
