// ABOUTME: Storage abstraction the host backs with its own persistence
// ABOUTME: Lookups distinguish not-found (protocol error) from I/O failure (server_error)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::client::Client;
use crate::models::{AccessGrant, AuthorizationData};

/// Host-provided persistence for clients, authorization data, and access
/// grants.
///
/// All mutable state of the library lives behind this trait; implementations
/// must be safe for concurrent use. Lookup methods return `Ok(None)` when the
/// key is unknown — an `Err` always means an I/O failure and surfaces to
/// clients as `server_error`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Loads a client by id.
    async fn get_client(&self, id: &str) -> Result<Option<Arc<dyn Client>>>;

    /// Registers or replaces a client under `id`.
    async fn set_client(&self, id: &str, client: Arc<dyn Client>) -> Result<()>;

    /// Persists authorization data, keyed by its code.
    async fn save_authorization_data(&self, data: &AuthorizationData) -> Result<()>;

    /// Loads authorization data by code. Client information must be
    /// rehydrated with it.
    async fn load_authorization_data(&self, code: &str) -> Result<Option<AuthorizationData>>;

    /// Revokes or deletes the authorization data for `code`.
    async fn remove_authorization_data(&self, code: &str) -> Result<()>;

    /// Persists an access grant, keyed by its access token.
    ///
    /// When the grant carries a refresh token it must become loadable via
    /// [`Storage::load_refresh_grant`] atomically with this save.
    async fn save_access_grant(&self, grant: &AccessGrant) -> Result<()>;

    /// Loads an access grant by access token. Client information must be
    /// rehydrated with it; provenance links need not be.
    async fn load_access_grant(&self, token: &str) -> Result<Option<AccessGrant>>;

    /// Revokes or deletes the access grant for `token`.
    async fn remove_access_grant(&self, token: &str) -> Result<()>;

    /// Loads the access grant associated with a refresh token.
    async fn load_refresh_grant(&self, refresh_token: &str) -> Result<Option<AccessGrant>>;

    /// Revokes or deletes the refresh association for `refresh_token`.
    async fn remove_refresh_grant(&self, refresh_token: &str) -> Result<()>;
}
