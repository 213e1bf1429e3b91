// ABOUTME: RFC 6749 protocol error taxonomy with wire codes and descriptions
// ABOUTME: Fixed set of OAuth 2.0 errors surfaced to clients as error/error_description pairs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use thiserror::Error;

/// Protocol errors defined by RFC 6749.
///
/// Every failure condition in the library maps onto one of these. See:
/// - <https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.2.1>
/// - <https://datatracker.ietf.org/doc/html/rfc6749#section-4.2.2.1>
/// - <https://datatracker.ietf.org/doc/html/rfc6749#section-5.2>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The request is missing a required parameter, includes an invalid
    /// parameter value, or is otherwise malformed
    #[error("invalid_request")]
    InvalidRequest,
    /// The client is not authorized to request a token using this method
    #[error("unauthorized_client")]
    UnauthorizedClient,
    /// The resource owner or authorization server denied the request
    #[error("access_denied")]
    AccessDenied,
    /// The authorization server does not support obtaining a token using
    /// this method
    #[error("unsupported_response_type")]
    UnsupportedResponseType,
    /// The requested scope is invalid, unknown, or malformed
    #[error("invalid_scope")]
    InvalidScope,
    /// The authorization server encountered an unexpected condition
    #[error("server_error")]
    ServerError,
    /// The authorization server is temporarily unable to handle the request
    #[error("temporarily_unavailable")]
    TemporarilyUnavailable,
    /// The authorization grant type is not supported by the server
    #[error("unsupported_grant_type")]
    UnsupportedGrantType,
    /// The provided grant (authorization code, credentials, refresh token)
    /// is invalid, expired, revoked, or was issued to another client
    #[error("invalid_grant")]
    InvalidGrant,
    /// Client authentication failed
    #[error("invalid_client")]
    InvalidClient,
}

impl ProtocolError {
    /// Wire value for the `error` member of an error response.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidGrant => "invalid_grant",
            Self::InvalidClient => "invalid_client",
        }
    }

    /// Human-readable `error_description` text, taken from the RFC prose.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::InvalidRequest => {
                "The request is missing a required parameter, includes an \
                 invalid parameter value, includes a parameter more than \
                 once, or is otherwise malformed."
            }
            Self::UnauthorizedClient => {
                "The client is not authorized to request a token using this method."
            }
            Self::AccessDenied => {
                "The resource owner or authorization server denied the request."
            }
            Self::UnsupportedResponseType => {
                "The authorization server does not support obtaining a token \
                 using this method."
            }
            Self::InvalidScope => "The requested scope is invalid, unknown, or malformed.",
            Self::ServerError => {
                "The authorization server encountered an unexpected condition \
                 that prevented it from fulfilling the request."
            }
            Self::TemporarilyUnavailable => {
                "The authorization server is currently unable to handle the \
                 request due to a temporary overloading or maintenance of the \
                 server."
            }
            Self::UnsupportedGrantType => {
                "The authorization grant type is not supported by the \
                 authorization server."
            }
            Self::InvalidGrant => {
                "The provided authorization grant (e.g., authorization code, \
                 resource owner credentials) or refresh token is invalid, \
                 expired, revoked, does not match the redirection URI used in \
                 the authorization request, or was issued to another client."
            }
            Self::InvalidClient => {
                "Client authentication failed (e.g., unknown client, no \
                 client authentication included, or unsupported \
                 authentication method)."
            }
        }
    }

    /// HTTP status this error forces regardless of the configured inline
    /// error status. Only `temporarily_unavailable` carries one (503).
    #[must_use]
    pub const fn status_override(self) -> Option<u16> {
        match self {
            Self::TemporarilyUnavailable => Some(503),
            _ => None,
        }
    }
}
