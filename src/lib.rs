// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! SkillSwap Server - marketplace API authentication core
//!
//! Bearer-token authentication, role and email-verification gates, and a
//! fixed-window rate limiter in front of the SkillSwap REST API.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers and router (Axum)
//! - `auth` - Token verification, principal loading and request gates
//! - `rate_limit` - Fixed-window limiter with background sweep
//! - `store` - In-memory user directory

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod rate_limit;
pub mod state;
pub mod store;
