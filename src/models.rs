// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive
//! `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Auth**: registration, login and the issued token
//! - **Profiles**: public and self views of a marketplace member
//! - **Admin**: account moderation toggles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::Role;

/// Longest accepted profile bio, in characters.
pub const MAX_BIO_CHARS: usize = 500;

/// Shortest accepted password, in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

// =============================================================================
// Auth Models
// =============================================================================

/// Request to create a new student account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Display name.
    pub name: String,
    /// Email address (used to sign in).
    pub email: String,
    /// Plain-text password, at least 8 characters.
    pub password: String,
}

/// Request to sign in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Issued bearer token plus the signed-in member.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    /// Bearer token for the `Authorization` header.
    pub token: String,
    /// When the token stops being accepted.
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

// =============================================================================
// Profile Models
// =============================================================================

/// A marketplace member as seen by API clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub bio: String,
    pub role: Role,
    /// Whether the member verified their email address.
    pub verified: bool,
    /// Whether the account may sign in.
    pub active: bool,
    /// Only present when viewing your own profile, or as an admin.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Envelope for endpoints returning a single member.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserProfile,
}

impl From<UserProfile> for UserResponse {
    fn from(user: UserProfile) -> Self {
        Self {
            success: true,
            user,
        }
    }
}

/// Partial profile update; omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

// =============================================================================
// Admin Models
// =============================================================================

/// Set a member's email-verification flag.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetVerificationRequest {
    pub verified: bool,
}

/// Activate or deactivate a member's account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetStatusRequest {
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_omits_email_when_hidden() {
        let profile = UserProfile {
            id: "u1".into(),
            name: "Ada".into(),
            bio: String::new(),
            role: Role::Student,
            verified: true,
            active: true,
            email: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["role"], "student");
    }

    #[test]
    fn update_request_fields_are_optional() {
        let request: UpdateProfileRequest = serde_json::from_str(r#"{"bio":"I teach guitar"}"#).unwrap();
        assert_eq!(request.name, None);
        assert_eq!(request.bio.as_deref(), Some("I teach guitar"));
    }
}
