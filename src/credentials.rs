// ABOUTME: Credential extraction: HTTP Basic client credentials and bearer tokens
// ABOUTME: Bearer tokens come from the Authorization header with a form/query `code` fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use anyhow::{anyhow, bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};

use crate::error::ProtocolError;
use crate::request::EndpointRequest;
use crate::response::Response;

/// Client credentials from HTTP Basic authentication or form parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    /// Client id
    pub username: String,
    /// Client secret
    pub password: String,
}

/// A bearer token presented for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerAuth {
    /// The token value
    pub token: String,
}

/// Extracts HTTP Basic credentials from the `Authorization` header.
///
/// An absent header is `Ok(None)`, not an error.
///
/// # Errors
/// Fails on a non-Basic scheme, undecodable base64, or credentials without
/// a colon separator.
pub fn basic_auth(request: &EndpointRequest) -> Result<Option<BasicAuth>> {
    let Some(header) = request.header("authorization") else {
        return Ok(None);
    };

    let Some((scheme, payload)) = header.split_once(' ') else {
        bail!("invalid authorization header");
    };
    if scheme != "Basic" {
        bail!("invalid authorization header");
    }
    let decoded = general_purpose::STANDARD
        .decode(payload)
        .context("invalid base64 in authorization header")?;
    let decoded =
        String::from_utf8(decoded).context("basic credentials are not valid UTF-8")?;
    let Some((username, password)) = decoded.split_once(':') else {
        bail!("invalid authorization message");
    };
    Ok(Some(BasicAuth {
        username: username.to_owned(),
        password: password.to_owned(),
    }))
}

/// Extracts a bearer token.
///
/// The `Authorization: Bearer` header takes precedence; the form/query field
/// `code` is the fallback, accepted only when the header carries no token.
/// Requires a parsed form.
#[must_use]
pub fn bearer_auth(request: &EndpointRequest) -> Option<BearerAuth> {
    let header = request.header("authorization").unwrap_or("");
    let fallback = request.form_value("code").unwrap_or("");
    if header.is_empty() && fallback.is_empty() {
        return None;
    }

    let mut token = fallback;
    if !header.is_empty() {
        let header_token = header.strip_prefix("Bearer ").unwrap_or("");
        if header_token.is_empty() && token.is_empty() {
            return None;
        }
        if !header_token.is_empty() {
            token = header_token;
        }
    }
    Some(BearerAuth {
        token: token.to_owned(),
    })
}

/// Resolves the client credentials for a token request.
///
/// In-body `client_id`/`client_secret` are consulted first when the server
/// allows them (the secret key must be present, even empty, and the id
/// non-empty); otherwise the Basic header is required. Missing or malformed
/// credentials record `invalid_request` on the response.
pub fn client_auth(
    response: &mut Response,
    request: &EndpointRequest,
    allow_secret_in_params: bool,
) -> Option<BasicAuth> {
    if allow_secret_in_params && request.has_form_key("client_secret") {
        let auth = BasicAuth {
            username: request.form_value("client_id").unwrap_or("").to_owned(),
            password: request.form_value("client_secret").unwrap_or("").to_owned(),
        };
        if !auth.username.is_empty() {
            return Some(auth);
        }
    }

    match basic_auth(request) {
        Ok(Some(auth)) => Some(auth),
        Ok(None) => {
            response.set_error(ProtocolError::InvalidRequest);
            response.internal_error = Some(anyhow!("client authentication not sent"));
            None
        }
        Err(err) => {
            response.set_error(ProtocolError::InvalidRequest);
            response.internal_error = Some(err);
            None
        }
    }
}
