// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user directory.
//!
//! Holds member records, including Argon2 password hashes. Hashes never
//! leave this module: the authentication gate sees a [`Principal`], API
//! clients see a [`UserProfile`].

use std::collections::HashMap;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{DirectoryFuture, Principal, Role, UserDirectory};
use crate::models::{UpdateProfileRequest, UserProfile};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("email address is already registered")]
    EmailTaken,
    #[error("user {0} not found")]
    NotFound(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Stored member record.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    /// Lower-cased, trimmed
    pub email: String,
    pub name: String,
    pub bio: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// New active, unverified record with a random ID.
    pub fn new(name: &str, email: &str, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            bio: String::new(),
            password_hash,
            role,
            active: true,
            verified: false,
            created_at: Utc::now(),
        }
    }

    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            active: self.active,
            verified: self.verified,
        }
    }

    pub fn profile(&self, include_email: bool) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            bio: self.bio.clone(),
            role: self.role,
            verified: self.verified,
            active: self.active,
            email: include_email.then(|| self.email.clone()),
            created_at: self.created_at,
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Hash `password` with Argon2id and a fresh random salt.
///
/// CPU-heavy; call from `spawn_blocking` on request paths.
pub fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Hashing(e.to_string()))
}

/// Check `password` against a stored PHC hash. Unparseable hashes never match.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: HashMap<String, UserRecord>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: UserRecord) -> Result<(), StoreError> {
        if self.find_by_email(&record.email).is_some() {
            return Err(StoreError::EmailTaken);
        }
        self.users.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<&UserRecord> {
        self.users.get(user_id)
    }

    pub fn find_by_email(&self, email: &str) -> Option<&UserRecord> {
        let email = normalize_email(email);
        self.users.values().find(|user| user.email == email)
    }

    pub fn update_profile(
        &mut self,
        user_id: &str,
        update: UpdateProfileRequest,
    ) -> Result<UserRecord, StoreError> {
        let user = self.get_mut(user_id)?;
        if let Some(name) = update.name {
            user.name = name.trim().to_string();
        }
        if let Some(bio) = update.bio {
            user.bio = bio.trim().to_string();
        }
        Ok(user.clone())
    }

    pub fn set_verified(&mut self, user_id: &str, verified: bool) -> Result<UserRecord, StoreError> {
        let user = self.get_mut(user_id)?;
        user.verified = verified;
        Ok(user.clone())
    }

    pub fn set_active(&mut self, user_id: &str, active: bool) -> Result<UserRecord, StoreError> {
        let user = self.get_mut(user_id)?;
        user.active = active;
        Ok(user.clone())
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn get_mut(&mut self, user_id: &str) -> Result<&mut UserRecord, StoreError> {
        self.users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))
    }
}

/// The shared store doubles as the authentication gate's directory.
impl UserDirectory for RwLock<InMemoryUserStore> {
    fn find_principal<'a>(&'a self, user_id: &'a str) -> DirectoryFuture<'a> {
        Box::pin(async move { Ok(self.read().await.get(user_id).map(UserRecord::principal)) })
    }
}
