// ABOUTME: Server configuration with protocol defaults from RFC 6749 practice
// ABOUTME: Defines grant and response type enums plus the allowed-set membership checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::collections::HashSet;

/// Authorization endpoint `response_type` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorizeRequestType {
    /// `response_type=code` — authorization code flow
    Code,
    /// `response_type=token` — implicit flow
    Token,
}

impl AuthorizeRequestType {
    /// Wire value of this response type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Token => "token",
        }
    }

    /// Parses a `response_type` form parameter.
    #[must_use]
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "code" => Some(Self::Code),
            "token" => Some(Self::Token),
            _ => None,
        }
    }
}

/// Token endpoint `grant_type` values.
///
/// `Implicit` is an internal sentinel used when the authorization endpoint
/// routes an implicit-flow request through token finalization; it is never
/// parsed off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantType {
    /// `grant_type=authorization_code`
    AuthorizationCode,
    /// `grant_type=refresh_token`
    RefreshToken,
    /// `grant_type=password`
    Password,
    /// `grant_type=client_credentials`
    ClientCredentials,
    /// `grant_type=assertion`
    Assertion,
    /// Internal marker for implicit-flow token issuance
    Implicit,
}

impl GrantType {
    /// Wire value of this grant type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
            Self::Password => "password",
            Self::ClientCredentials => "client_credentials",
            Self::Assertion => "assertion",
            Self::Implicit => "__implicit",
        }
    }

    /// Parses a `grant_type` form parameter. The implicit sentinel is not
    /// reachable from the wire.
    #[must_use]
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "refresh_token" => Some(Self::RefreshToken),
            "password" => Some(Self::Password),
            "client_credentials" => Some(Self::ClientCredentials),
            "assertion" => Some(Self::Assertion),
            _ => None,
        }
    }
}

/// Server configuration.
///
/// `Default` yields the conservative protocol defaults: only the
/// authorization-code flow is enabled and errors are reported inline with
/// HTTP 200.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Authorization code lifetime in seconds (default 250)
    pub authorization_expiration: i64,
    /// Access token lifetime in seconds (default 3600)
    pub access_expiration: i64,
    /// Token type reported in token responses (default `Bearer`)
    pub token_type: String,
    /// Authorize request types the server will accept (default `{code}`)
    pub allowed_authorize_request_types: HashSet<AuthorizeRequestType>,
    /// Grant types the server will accept (default `{authorization_code}`)
    pub allowed_grant_types: HashSet<GrantType>,
    /// HTTP status used when reporting protocol errors inline (default 200)
    pub error_status_code: u16,
    /// Accept `client_id`/`client_secret` form fields in addition to HTTP
    /// Basic authentication (default false)
    pub allow_client_secret_in_params: bool,
    /// Permit `GET` requests on the token endpoint (default false)
    pub allow_get_token_request: bool,
    /// Separator for multi-valued registered redirect URIs. Empty (the
    /// default) means a registered URI is always a single value.
    pub redirect_uri_separator: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            authorization_expiration: 250,
            access_expiration: 3600,
            token_type: "Bearer".to_owned(),
            allowed_authorize_request_types: HashSet::from([AuthorizeRequestType::Code]),
            allowed_grant_types: HashSet::from([GrantType::AuthorizationCode]),
            error_status_code: 200,
            allow_client_secret_in_params: false,
            allow_get_token_request: false,
            redirect_uri_separator: String::new(),
        }
    }
}

impl ServerConfig {
    /// Whether the authorization endpoint accepts this `response_type`.
    #[must_use]
    pub fn is_authorize_request_type_allowed(&self, request_type: AuthorizeRequestType) -> bool {
        self.allowed_authorize_request_types.contains(&request_type)
    }

    /// Whether the token endpoint accepts this `grant_type`.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.allowed_grant_types.contains(&grant_type)
    }
}
