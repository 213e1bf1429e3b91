// ABOUTME: Shared test fixtures: seeded storage, counting token generators, logging setup
// ABOUTME: Mirrors the canonical client 1234/aabbccdd with authorization code 9999 and refresh r9999
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Once};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tollgate::{
    AccessGrant, AccessTokenGenerator, AuthorizationData, AuthorizationTokenGenerator, Clock,
    MemoryStorage, Server, ServerConfig, StaticClient, Storage,
};

pub const TEST_CLIENT_ID: &str = "1234";
pub const TEST_CLIENT_SECRET: &str = "aabbccdd";
pub const TEST_REDIRECT_URI: &str = "http://localhost:14000/appauth";

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process).
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_test_writer()
            .init();
    });
}

pub fn test_client() -> Arc<StaticClient> {
    Arc::new(StaticClient {
        id: TEST_CLIENT_ID.to_owned(),
        secret: TEST_CLIENT_SECRET.to_owned(),
        redirect_uri: TEST_REDIRECT_URI.to_owned(),
        user_data: None,
    })
}

/// Storage preloaded with the canonical client, a pending authorization code
/// `9999`, and an access grant `9999` refreshable via `r9999`.
pub async fn seeded_storage() -> Arc<MemoryStorage> {
    init_test_logging();
    let storage = Arc::new(MemoryStorage::new());
    let client = test_client();

    storage
        .set_client(TEST_CLIENT_ID, client.clone())
        .await
        .unwrap();

    storage
        .save_authorization_data(&AuthorizationData {
            client: client.clone(),
            code: "9999".to_owned(),
            expires_in: 3600,
            scope: None,
            redirect_uri: TEST_REDIRECT_URI.to_owned(),
            state: None,
            created_at: Utc::now(),
            user_data: None,
        })
        .await
        .unwrap();

    storage
        .save_access_grant(&AccessGrant {
            client,
            authorization_data: None,
            previous_grant: None,
            access_token: "9999".to_owned(),
            refresh_token: Some("r9999".to_owned()),
            expires_in: 3600,
            scope: None,
            redirect_uri: Some(TEST_REDIRECT_URI.to_owned()),
            created_at: Utc::now(),
            user_data: None,
        })
        .await
        .unwrap();

    storage
}

/// Predictable authorization code generation: 1, 2, 3, ...
#[derive(Debug, Default)]
pub struct CountingAuthorizationTokenGenerator {
    counter: AtomicI64,
}

impl AuthorizationTokenGenerator for CountingAuthorizationTokenGenerator {
    fn generate_authorization_code(&self, _data: &AuthorizationData) -> Result<String> {
        Ok((self.counter.fetch_add(1, Ordering::SeqCst) + 1).to_string())
    }
}

/// Predictable access token generation: 1/r1, 2/r2, ...
#[derive(Debug, Default)]
pub struct CountingAccessTokenGenerator {
    access: AtomicI64,
    refresh: AtomicI64,
}

impl AccessTokenGenerator for CountingAccessTokenGenerator {
    fn generate_access_token(
        &self,
        _grant: &AccessGrant,
        generate_refresh: bool,
    ) -> Result<(String, Option<String>)> {
        let access = (self.access.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        let refresh = generate_refresh
            .then(|| format!("r{}", self.refresh.fetch_add(1, Ordering::SeqCst) + 1));
        Ok((access, refresh))
    }
}

/// Server with counting generators so tests can assert exact token values.
pub fn test_server(config: ServerConfig, storage: Arc<MemoryStorage>) -> Server {
    Server::new(config, storage)
        .with_authorization_token_generator(Arc::new(
            CountingAuthorizationTokenGenerator::default(),
        ))
        .with_access_token_generator(Arc::new(CountingAccessTokenGenerator::default()))
}

/// A clock pinned to a single instant.
pub fn fixed_clock(at: DateTime<Utc>) -> Clock {
    Arc::new(move || at)
}

fn parse_pairs(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (name.to_owned(), value.to_owned())
        })
        .collect()
}

/// Query parameters of a redirect location.
pub fn query_params(location: &str) -> BTreeMap<String, String> {
    let url = url::Url::parse(location).unwrap();
    url.query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

/// Fragment parameters of an implicit-flow redirect location.
pub fn fragment_params(location: &str) -> BTreeMap<String, String> {
    let url = url::Url::parse(location).unwrap();
    parse_pairs(url.fragment().unwrap_or(""))
}
