// ABOUTME: Token generator interfaces with a secure-random default implementation
// ABOUTME: Default tokens are 256 bits from the system RNG, URL-safe base64 without padding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use tracing::error;

use crate::models::{AccessGrant, AuthorizationData};

/// Generates authorization codes.
pub trait AuthorizationTokenGenerator: Send + Sync {
    /// Produces the code for authorization data about to be persisted.
    ///
    /// # Errors
    /// Returns an error when token material cannot be produced; the endpoint
    /// reports it as `server_error`.
    fn generate_authorization_code(&self, data: &AuthorizationData) -> Result<String>;
}

/// Generates access tokens and, on request, refresh tokens.
pub trait AccessTokenGenerator: Send + Sync {
    /// Produces the access token (and refresh token when `generate_refresh`
    /// is set) for a grant about to be persisted.
    ///
    /// # Errors
    /// Returns an error when token material cannot be produced; the endpoint
    /// reports it as `server_error`.
    fn generate_access_token(
        &self,
        grant: &AccessGrant,
        generate_refresh: bool,
    ) -> Result<(String, Option<String>)>;
}

/// Default generator producing opaque 256-bit random tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl RandomTokenGenerator {
    const TOKEN_BYTES: usize = 32;

    fn random_token() -> Result<String> {
        let rng = SystemRandom::new();
        let mut bytes = vec![0u8; Self::TOKEN_BYTES];
        rng.fill(&mut bytes).map_err(|_| {
            error!("system RNG failed, cannot generate token material");
            anyhow!("system RNG failure")
        })?;
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(&bytes))
    }
}

impl AuthorizationTokenGenerator for RandomTokenGenerator {
    fn generate_authorization_code(&self, _data: &AuthorizationData) -> Result<String> {
        Self::random_token()
    }
}

impl AccessTokenGenerator for RandomTokenGenerator {
    fn generate_access_token(
        &self,
        _grant: &AccessGrant,
        generate_refresh: bool,
    ) -> Result<(String, Option<String>)> {
        let access_token = Self::random_token()?;
        let refresh_token = if generate_refresh {
            Some(Self::random_token()?)
        } else {
            None
        };
        Ok((access_token, refresh_token))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::{AccessTokenGenerator, RandomTokenGenerator};
    use crate::client::StaticClient;
    use crate::models::AccessGrant;

    fn grant() -> AccessGrant {
        AccessGrant {
            client: Arc::new(StaticClient::default()),
            authorization_data: None,
            previous_grant: None,
            access_token: String::new(),
            refresh_token: None,
            expires_in: 3600,
            scope: None,
            redirect_uri: None,
            created_at: Utc::now(),
            user_data: None,
        }
    }

    #[test]
    fn refresh_token_is_only_generated_on_request() {
        let generator = RandomTokenGenerator;
        let (access, refresh) = generator.generate_access_token(&grant(), false).unwrap();
        assert!(!access.is_empty());
        assert!(refresh.is_none());

        let (access, refresh) = generator.generate_access_token(&grant(), true).unwrap();
        let refresh = refresh.unwrap();
        assert!(!refresh.is_empty());
        assert_ne!(access, refresh);
    }

    #[test]
    fn tokens_are_url_safe() {
        let (access, _) = RandomTokenGenerator
            .generate_access_token(&grant(), false)
            .unwrap();
        assert!(access
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
