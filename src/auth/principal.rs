// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authenticated principal and the directory it is loaded from.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{error::PrincipalError, Role};

/// The user behind an authenticated request.
///
/// Loaded fresh from the [`UserDirectory`] on every request and attached to
/// the request extensions by the authentication gate. Never carries
/// credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Principal {
    /// User ID (token `sub` claim)
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Whether the account may sign in
    pub active: bool,
    /// Whether the email address has been verified
    pub verified: bool,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Failure inside the directory backend itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("user directory unavailable: {0}")]
pub struct DirectoryError(pub String);

/// Boxed lookup future so the directory can be held as a trait object.
pub type DirectoryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<Principal>, DirectoryError>> + Send + 'a>>;

/// Lookup-by-id contract the authentication gate depends on.
///
/// Implementations return the record with sensitive fields stripped, or
/// `None` when no record matches.
pub trait UserDirectory: Send + Sync {
    fn find_principal<'a>(&'a self, user_id: &'a str) -> DirectoryFuture<'a>;
}

/// Resolves token subjects to active principals.
#[derive(Clone)]
pub struct PrincipalLoader {
    directory: Arc<dyn UserDirectory>,
}

impl PrincipalLoader {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// Load the principal for `user_id`, rejecting unknown and inactive accounts.
    pub async fn load(&self, user_id: &str) -> Result<Principal, PrincipalError> {
        let principal = self
            .directory
            .find_principal(user_id)
            .await
            .map_err(|e| PrincipalError::Directory(e.to_string()))?
            .ok_or(PrincipalError::PrincipalNotFound)?;

        if !principal.active {
            return Err(PrincipalError::PrincipalDeactivated);
        }

        Ok(principal)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Directory that fails every lookup.
    pub(crate) struct BrokenDirectory;

    impl UserDirectory for BrokenDirectory {
        fn find_principal<'a>(&'a self, _user_id: &'a str) -> DirectoryFuture<'a> {
            Box::pin(async { Err(DirectoryError("connection refused".into())) })
        }
    }

    /// Directory backed by a fixed list.
    pub(crate) struct FixedDirectory(pub Vec<Principal>);

    impl UserDirectory for FixedDirectory {
        fn find_principal<'a>(&'a self, user_id: &'a str) -> DirectoryFuture<'a> {
            let found = self.0.iter().find(|p| p.id == user_id).cloned();
            Box::pin(async move { Ok(found) })
        }
    }

    pub(crate) fn principal(id: &str, role: Role, active: bool, verified: bool) -> Principal {
        Principal {
            id: id.to_string(),
            email: format!("{id}@campus.example"),
            name: id.to_uppercase(),
            role,
            active,
            verified,
        }
    }

    #[tokio::test]
    async fn load_returns_active_principal() {
        let loader = PrincipalLoader::new(Arc::new(FixedDirectory(vec![principal(
            "u123",
            Role::Student,
            true,
            true,
        )])));

        let loaded = loader.load("u123").await.unwrap();
        assert_eq!(loaded.id, "u123");
        assert_eq!(loaded.role, Role::Student);
    }

    #[tokio::test]
    async fn load_rejects_unknown_user() {
        let loader = PrincipalLoader::new(Arc::new(FixedDirectory(vec![])));
        assert_eq!(
            loader.load("ghost").await,
            Err(PrincipalError::PrincipalNotFound)
        );
    }

    #[tokio::test]
    async fn load_rejects_inactive_user() {
        let loader = PrincipalLoader::new(Arc::new(FixedDirectory(vec![principal(
            "u123",
            Role::Student,
            false,
            true,
        )])));

        assert_eq!(
            loader.load("u123").await,
            Err(PrincipalError::PrincipalDeactivated)
        );
    }

    #[tokio::test]
    async fn load_surfaces_directory_failure() {
        let loader = PrincipalLoader::new(Arc::new(BrokenDirectory));
        assert!(matches!(
            loader.load("u123").await,
            Err(PrincipalError::Directory(_))
        ));
    }
}
