// ABOUTME: Reference in-memory Storage used by tests and examples
// ABOUTME: One RwLock over four maps so grants and their refresh index publish atomically
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::client::Client;
use crate::models::{AccessGrant, AuthorizationData};
use crate::storage::Storage;

#[derive(Default)]
struct MemoryStorageInner {
    clients: HashMap<String, Arc<dyn Client>>,
    authorization_data: HashMap<String, AuthorizationData>,
    access_grants: HashMap<String, AccessGrant>,
    refresh_index: HashMap<String, String>,
}

/// In-memory [`Storage`] implementation.
///
/// Not suitable for production use: nothing is persisted and single-use
/// arbitration of codes relies on the single process-wide lock.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<MemoryStorageInner>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_client(&self, id: &str) -> Result<Option<Arc<dyn Client>>> {
        debug!(client_id = %id, "get_client");
        Ok(self.inner.read().await.clients.get(id).cloned())
    }

    async fn set_client(&self, id: &str, client: Arc<dyn Client>) -> Result<()> {
        debug!(client_id = %id, "set_client");
        self.inner.write().await.clients.insert(id.to_owned(), client);
        Ok(())
    }

    async fn save_authorization_data(&self, data: &AuthorizationData) -> Result<()> {
        debug!(code = %data.code, "save_authorization_data");
        self.inner
            .write()
            .await
            .authorization_data
            .insert(data.code.clone(), data.clone());
        Ok(())
    }

    async fn load_authorization_data(&self, code: &str) -> Result<Option<AuthorizationData>> {
        debug!(code = %code, "load_authorization_data");
        Ok(self.inner.read().await.authorization_data.get(code).cloned())
    }

    async fn remove_authorization_data(&self, code: &str) -> Result<()> {
        debug!(code = %code, "remove_authorization_data");
        self.inner.write().await.authorization_data.remove(code);
        Ok(())
    }

    async fn save_access_grant(&self, grant: &AccessGrant) -> Result<()> {
        debug!(access_token = %grant.access_token, "save_access_grant");
        let mut inner = self.inner.write().await;
        inner
            .access_grants
            .insert(grant.access_token.clone(), grant.clone());
        if let Some(refresh_token) = &grant.refresh_token {
            // same write guard: the refresh index entry is visible exactly
            // when the grant is
            inner
                .refresh_index
                .insert(refresh_token.clone(), grant.access_token.clone());
        }
        Ok(())
    }

    async fn load_access_grant(&self, token: &str) -> Result<Option<AccessGrant>> {
        debug!("load_access_grant");
        Ok(self.inner.read().await.access_grants.get(token).cloned())
    }

    async fn remove_access_grant(&self, token: &str) -> Result<()> {
        debug!("remove_access_grant");
        self.inner.write().await.access_grants.remove(token);
        Ok(())
    }

    async fn load_refresh_grant(&self, refresh_token: &str) -> Result<Option<AccessGrant>> {
        debug!("load_refresh_grant");
        let inner = self.inner.read().await;
        Ok(inner
            .refresh_index
            .get(refresh_token)
            .and_then(|token| inner.access_grants.get(token))
            .cloned())
    }

    async fn remove_refresh_grant(&self, refresh_token: &str) -> Result<()> {
        debug!("remove_refresh_grant");
        self.inner.write().await.refresh_index.remove(refresh_token);
        Ok(())
    }
}
