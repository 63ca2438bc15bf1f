// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Marketplace roles.
///
/// - `Student` - Regular member: lists skills, requests exchanges
/// - `Admin` - Moderates accounts (verification, activation)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular marketplace member; every new account starts here
    #[default]
    Student,
    /// Account moderation
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Student => write!(f, "student"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Fixed set of roles permitted past an authorization gate.
///
/// Built once at route registration and shared by every request on that
/// route.
#[derive(Debug, Clone)]
pub struct RoleSet(Arc<HashSet<Role>>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(Arc::new(roles.into_iter().collect()))
    }

    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        Self::new(roles)
    }
}
