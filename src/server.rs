// ABOUTME: Server facade holding config, storage, token generators, and the clock
// ABOUTME: Factory for responses pre-wired with error status, non-cache headers, and storage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::ServerConfig;
use crate::response::Response;
use crate::storage::Storage;
use crate::tokengen::{AccessTokenGenerator, AuthorizationTokenGenerator, RandomTokenGenerator};

/// Injectable time source. All expiration checks go through it so tests can
/// pin the clock.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The authorization server.
///
/// Immutable after construction; any number of requests may be handled
/// concurrently against one instance. Each endpoint is a `handle_*` /
/// `finish_*` pair: `handle_*` validates the protocol inputs and returns a
/// request object whose `authorized` flag the host sets from its own policy
/// (credential check, consent UI), then `finish_*` performs the side effects
/// and shapes the response.
pub struct Server {
    pub(crate) config: ServerConfig,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) authorization_token_generator: Arc<dyn AuthorizationTokenGenerator>,
    pub(crate) access_token_generator: Arc<dyn AccessTokenGenerator>,
    pub(crate) clock: Clock,
}

impl Server {
    /// Creates a server with the default random token generators and the
    /// system clock.
    #[must_use]
    pub fn new(config: ServerConfig, storage: Arc<dyn Storage>) -> Self {
        Self {
            config,
            storage,
            authorization_token_generator: Arc::new(RandomTokenGenerator),
            access_token_generator: Arc::new(RandomTokenGenerator),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replaces the authorization code generator.
    #[must_use]
    pub fn with_authorization_token_generator(
        mut self,
        generator: Arc<dyn AuthorizationTokenGenerator>,
    ) -> Self {
        self.authorization_token_generator = generator;
        self
    }

    /// Replaces the access token generator.
    #[must_use]
    pub fn with_access_token_generator(
        mut self,
        generator: Arc<dyn AccessTokenGenerator>,
    ) -> Self {
        self.access_token_generator = generator;
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The storage backing this server.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Creates a response wired to this server's storage and configured
    /// inline error status.
    #[must_use]
    pub fn new_response(&self) -> Response {
        let mut response = Response::new(Arc::clone(&self.storage));
        response.error_status = self.config.error_status_code;
        response
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
