// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Request authentication for the SkillSwap API.
//!
//! ## Auth Flow
//!
//! 1. `POST /v1/auth/login` (or register) returns a signed HS256 token
//! 2. Client sends `Authorization: Bearer <token>`
//! 3. The authentication gate:
//!    - verifies signature and expiry against `JWT_SECRET`
//!    - loads the user named by `sub` from the user directory
//!    - rejects unknown or deactivated accounts
//!    - attaches the [`Principal`] to the request
//! 4. Role and email-verification gates inspect the attached principal
//!
//! ## Security
//!
//! - Principals are loaded fresh on every request, never cached
//! - Expired tokens are rejected with no clock-skew leeway by default
//! - Internal faults answer 500 and never leak detail to the caller

pub mod error;
pub mod extractor;
pub mod middleware;
pub mod principal;
pub mod roles;
pub mod token;

pub use error::{AuthError, PrincipalError, TokenError};
pub use extractor::{Auth, OptionalAuth};
pub use middleware::{authenticate, authorize, optional_auth, require_verified_email, AuthState};
pub use principal::{DirectoryError, DirectoryFuture, Principal, PrincipalLoader, UserDirectory};
pub use roles::{Role, RoleSet};
pub use token::{Claims, IssuedToken, TokenIssuer, TokenVerifier};
