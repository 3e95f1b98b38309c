// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Onchain Confirm Server - Transaction Confirmation & Bearer Auth Service
//!
//! Clients execute blockchain transactions in their own wallets and report
//! the outcome here. The server checks the report against a short-lived
//! session, records it, and hands confirmed transactions to the domain hook
//! registered for the session type.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Bearer authentication (JWKS-backed JWT validation)
//! - `blockchain` - EVM JSON-RPC reader and personal-sign verification
//! - `confirmation` - Confirmation protocol
//! - `hooks` - Hook registry and reference domain hooks
//! - `sessions` - Session model, stores and reaper

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod clock;
pub mod config;
pub mod confirmation;
pub mod error;
pub mod hooks;
pub mod sessions;
pub mod state;
