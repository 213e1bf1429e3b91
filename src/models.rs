// ABOUTME: Persisted protocol artifacts: authorization data and access grants
// ABOUTME: Both expire on a whole-second clock and carry opaque host payloads through storage
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::client::{Client, UserData};

/// State minted by the authorization endpoint for the code flow.
///
/// Persisted when the host approves an authorization request and removed
/// when the corresponding token exchange consumes it.
#[derive(Debug, Clone)]
pub struct AuthorizationData {
    /// Client the code was issued to
    pub client: Arc<dyn Client>,
    /// The authorization code
    pub code: String,
    /// Code lifetime in seconds
    pub expires_in: i64,
    /// Requested scope
    pub scope: Option<String>,
    /// Redirect URI the authorization request resolved to
    pub redirect_uri: String,
    /// Client-supplied CSRF state
    pub state: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Opaque host payload
    pub user_data: Option<UserData>,
}

impl AuthorizationData {
    /// Instant this authorization code expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expires_in)
    }

    /// Whether the code is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }
}

/// The persisted artifact representing an issued access token.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    /// Client the grant was issued to
    pub client: Arc<dyn Client>,
    /// Authorization data this grant was exchanged from, when the grant
    /// came through the code flow
    pub authorization_data: Option<Box<AuthorizationData>>,
    /// Grant this one replaces, when minted by a refresh
    pub previous_grant: Option<Box<AccessGrant>>,
    /// Access token
    pub access_token: String,
    /// Refresh token. When present the grant must also be retrievable by
    /// this value.
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds
    pub expires_in: i64,
    /// Granted scope
    pub scope: Option<String>,
    /// Redirect URI from the originating request
    pub redirect_uri: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Opaque host payload
    pub user_data: Option<UserData>,
}

impl AccessGrant {
    /// Instant this grant expires.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at + Duration::seconds(self.expires_in)
    }

    /// Whether the grant is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::{AccessGrant, AuthorizationData};
    use crate::client::StaticClient;

    fn client() -> Arc<StaticClient> {
        Arc::new(StaticClient {
            id: "1234".to_owned(),
            secret: "aabbccdd".to_owned(),
            redirect_uri: "http://localhost:14000/appauth".to_owned(),
            user_data: None,
        })
    }

    #[test]
    fn authorization_data_expires_after_its_lifetime() {
        let now = Utc::now();
        let data = AuthorizationData {
            client: client(),
            code: "9999".to_owned(),
            expires_in: 250,
            scope: None,
            redirect_uri: "http://localhost:14000/appauth".to_owned(),
            state: None,
            created_at: now,
            user_data: None,
        };
        assert!(!data.is_expired_at(now));
        assert!(!data.is_expired_at(now + Duration::seconds(250)));
        assert!(data.is_expired_at(now + Duration::seconds(251)));
    }

    #[test]
    fn access_grant_expires_after_its_lifetime() {
        let now = Utc::now();
        let grant = AccessGrant {
            client: client(),
            authorization_data: None,
            previous_grant: None,
            access_token: "9999".to_owned(),
            refresh_token: None,
            expires_in: 3600,
            scope: None,
            redirect_uri: None,
            created_at: now,
            user_data: None,
        };
        assert_eq!(grant.expires_at(), now + Duration::seconds(3600));
        assert!(!grant.is_expired_at(now + Duration::seconds(3600)));
        assert!(grant.is_expired_at(now + Duration::seconds(3601)));
    }
}
