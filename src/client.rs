// ABOUTME: Client abstraction with the id/secret/redirect-URI capability set
// ABOUTME: Optional SecretMatcher capability lets clients keep secrets hashed or compare in constant time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque host payload threaded through storage alongside protocol
/// artifacts. The library never inspects it.
pub type UserData = Value;

/// Optional capability for clients that verify candidate secrets themselves.
///
/// When a client exposes this, the framework never extracts the plain secret;
/// implementations are free to compare against a hash or use their own
/// constant-time scheme.
pub trait SecretMatcher: Send + Sync {
    /// Returns true if the candidate secret matches.
    fn secret_matches(&self, candidate: &str) -> bool;
}

/// A registered OAuth 2.0 client.
pub trait Client: fmt::Debug + Send + Sync {
    /// Client identifier.
    fn id(&self) -> &str;

    /// Plain client secret. Only consulted when [`Client::secret_matcher`]
    /// returns `None`.
    fn secret(&self) -> &str;

    /// Registered redirect URI. May be a separator-delimited list when the
    /// server is configured with a redirect URI separator.
    fn redirect_uri(&self) -> &str;

    /// Opaque host payload copied onto artifacts issued to this client.
    fn user_data(&self) -> Option<UserData>;

    /// Capability probe for self-verifying clients. The default has no
    /// matcher, which selects the plain-secret comparison path.
    fn secret_matcher(&self) -> Option<&dyn SecretMatcher> {
        None
    }
}

/// Client implementation storing all values in plain struct fields.
///
/// Suitable for configuration-driven client tables; hosts with hashed
/// secrets should implement [`Client`] and [`SecretMatcher`] themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticClient {
    /// Client identifier
    pub id: String,
    /// Plain client secret
    pub secret: String,
    /// Registered redirect URI (or separator-delimited list)
    pub redirect_uri: String,
    /// Opaque host payload
    pub user_data: Option<UserData>,
}

impl Client for StaticClient {
    fn id(&self) -> &str {
        &self.id
    }

    fn secret(&self) -> &str {
        &self.secret
    }

    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn user_data(&self) -> Option<UserData> {
        self.user_data.clone()
    }
}
