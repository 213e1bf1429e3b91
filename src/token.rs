// ABOUTME: Token endpoint: five grant validators plus finalization that mints and persists grants
// ABOUTME: New grants persist before consumed codes or refresh tokens are removed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::anyhow;
use serde_json::Value;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use crate::client::{Client, UserData};
use crate::config::GrantType;
use crate::credentials::{client_auth, BasicAuth};
use crate::error::ProtocolError;
use crate::models::{AccessGrant, AuthorizationData};
use crate::request::{non_empty, EndpointRequest};
use crate::response::Response;
use crate::server::Server;
use crate::uri::{first_uri, validate_uri_list};

/// A token request that passed grant-specific validation.
///
/// The host decides the outcome between `handle` and `finish`: for the
/// password grant it verifies the resource owner credentials, for the
/// assertion grant the assertion, and so on, then sets
/// [`TokenRequest::authorized`] before finishing.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    /// The requested grant type
    pub grant_type: GrantType,
    /// The authenticated client
    pub client: Arc<dyn Client>,
    /// Authorization code (`authorization_code` grant)
    pub code: Option<String>,
    /// Refresh token (`refresh_token` grant)
    pub refresh_token: Option<String>,
    /// Resource owner username (`password` grant)
    pub username: Option<String>,
    /// Resource owner password (`password` grant)
    pub password: Option<String>,
    /// Assertion type (`assertion` grant)
    pub assertion_type: Option<String>,
    /// Assertion value (`assertion` grant)
    pub assertion: Option<String>,
    /// Authorization data consumed by this exchange
    pub authorization_data: Option<AuthorizationData>,
    /// Previous grant consumed by a refresh
    pub access_grant: Option<AccessGrant>,
    /// When set, finish persists and emits this grant verbatim instead of
    /// minting a new one
    pub force_access_grant: Option<AccessGrant>,
    /// Redirect URI resolved during validation
    pub redirect_uri: Option<String>,
    /// Requested (or inherited) scope
    pub scope: Option<String>,
    /// Host decision; false until the host approves the request
    pub authorized: bool,
    /// Lifetime in seconds of the access token to issue
    pub expiration: i64,
    /// Whether finish should mint a refresh token
    pub generate_refresh: bool,
    /// Opaque host payload carried onto the grant
    pub user_data: Option<UserData>,
}

impl Server {
    /// Parses and validates a token request, dispatching on `grant_type`.
    ///
    /// Requires `POST` unless GET requests are enabled in the configuration.
    /// On failure the error has been recorded on the response and `None` is
    /// returned.
    pub async fn handle_token_request(
        &self,
        response: &mut Response,
        request: &mut EndpointRequest,
    ) -> Option<TokenRequest> {
        match request.method() {
            "POST" => {}
            "GET" if self.config.allow_get_token_request => {}
            _ => {
                response.set_error(ProtocolError::InvalidRequest);
                response.internal_error = Some(anyhow!("request must be POST"));
                return None;
            }
        }

        if let Err(err) = request.parse_form() {
            response.set_error(ProtocolError::InvalidRequest);
            response.internal_error = Some(err.into());
            return None;
        }

        let grant_param = request.form_value("grant_type").unwrap_or("");
        let Some(grant_type) = GrantType::from_param(grant_param) else {
            warn!(grant_type = grant_param, "unknown grant type requested");
            response.set_error(ProtocolError::UnsupportedGrantType);
            return None;
        };
        if !self.config.is_grant_type_allowed(grant_type) {
            warn!(grant_type = grant_param, "grant type not allowed");
            response.set_error(ProtocolError::UnsupportedGrantType);
            return None;
        }

        match grant_type {
            GrantType::AuthorizationCode => {
                self.handle_authorization_code_grant(response, request).await
            }
            GrantType::RefreshToken => self.handle_refresh_token_grant(response, request).await,
            GrantType::Password => self.handle_password_grant(response, request).await,
            GrantType::ClientCredentials => {
                self.handle_client_credentials_grant(response, request).await
            }
            GrantType::Assertion => self.handle_assertion_grant(response, request).await,
            GrantType::Implicit => {
                // not a wire grant; kept out of from_param
                response.set_error(ProtocolError::UnsupportedGrantType);
                None
            }
        }
    }

    async fn handle_authorization_code_grant(
        &self,
        response: &mut Response,
        request: &EndpointRequest,
    ) -> Option<TokenRequest> {
        let auth = client_auth(response, request, self.config.allow_client_secret_in_params)?;

        let Some(code) = non_empty(request.form_value("code")) else {
            response.set_error(ProtocolError::InvalidGrant);
            return None;
        };

        let client = authenticated_client(response, &auth).await?;

        let authorization_data = match response.storage.load_authorization_data(&code).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                warn!(client_id = %client.id(), "authorization code not found");
                response.set_error(ProtocolError::InvalidGrant);
                return None;
            }
            Err(err) => {
                error!("failed to load authorization data: {err:#}");
                response.set_error(ProtocolError::ServerError);
                response.internal_error = Some(err);
                return None;
            }
        };
        if authorization_data.client.redirect_uri().is_empty() {
            response.set_error(ProtocolError::UnauthorizedClient);
            return None;
        }
        if authorization_data.is_expired_at(self.now()) {
            warn!(client_id = %client.id(), "authorization code expired");
            response.set_error(ProtocolError::InvalidGrant);
            return None;
        }

        // the code must have been issued to the authenticating client
        if authorization_data.client.id() != client.id() {
            warn!(
                client_id = %client.id(),
                issued_to = %authorization_data.client.id(),
                "authorization code presented by a different client"
            );
            response.set_error(ProtocolError::InvalidGrant);
            return None;
        }

        let separator = &self.config.redirect_uri_separator;
        let redirect_uri = match non_empty(request.form_value("redirect_uri")) {
            Some(uri) => uri,
            None => first_uri(client.redirect_uri(), separator).to_owned(),
        };
        if let Err(err) = validate_uri_list(client.redirect_uri(), &redirect_uri, separator) {
            response.set_error(ProtocolError::InvalidRequest);
            response.internal_error = Some(err.into());
            return None;
        }
        if authorization_data.redirect_uri != redirect_uri {
            response.set_error(ProtocolError::InvalidRequest);
            response.internal_error = Some(anyhow!("redirect uri is different"));
            return None;
        }

        Some(TokenRequest {
            grant_type: GrantType::AuthorizationCode,
            client,
            code: Some(code),
            refresh_token: None,
            username: None,
            password: None,
            assertion_type: None,
            assertion: None,
            scope: authorization_data.scope.clone(),
            user_data: authorization_data.user_data.clone(),
            redirect_uri: Some(redirect_uri),
            authorization_data: Some(authorization_data),
            access_grant: None,
            force_access_grant: None,
            authorized: false,
            expiration: self.config.access_expiration,
            generate_refresh: true,
        })
    }

    async fn handle_refresh_token_grant(
        &self,
        response: &mut Response,
        request: &EndpointRequest,
    ) -> Option<TokenRequest> {
        let auth = client_auth(response, request, self.config.allow_client_secret_in_params)?;

        let Some(refresh_token) = non_empty(request.form_value("refresh_token")) else {
            response.set_error(ProtocolError::InvalidGrant);
            return None;
        };

        let client = authenticated_client(response, &auth).await?;

        let previous_grant = match response.storage.load_refresh_grant(&refresh_token).await {
            Ok(Some(grant)) => grant,
            Ok(None) => {
                warn!(client_id = %client.id(), "refresh token not found");
                response.set_error(ProtocolError::InvalidGrant);
                return None;
            }
            Err(err) => {
                error!("failed to load refresh grant: {err:#}");
                response.set_error(ProtocolError::ServerError);
                response.internal_error = Some(err);
                return None;
            }
        };
        if previous_grant.client.redirect_uri().is_empty() {
            response.set_error(ProtocolError::UnauthorizedClient);
            return None;
        }

        // the refresh token must belong to the authenticating client
        if previous_grant.client.id() != client.id() {
            warn!(
                client_id = %client.id(),
                issued_to = %previous_grant.client.id(),
                "refresh token presented by a different client"
            );
            response.set_error(ProtocolError::InvalidClient);
            response.internal_error =
                Some(anyhow!("client id must be the same from previous token"));
            return None;
        }

        let mut scope = non_empty(request.form_value("scope"));
        if scope.is_none() {
            scope.clone_from(&previous_grant.scope);
        }
        if has_extra_scopes(previous_grant.scope.as_deref(), scope.as_deref()) {
            warn!(client_id = %client.id(), "refresh requested scope beyond the original grant");
            response.set_error(ProtocolError::AccessDenied);
            response.internal_error = Some(anyhow!(
                "the requested scope must not include any scope not originally granted by the resource owner"
            ));
            return None;
        }

        Some(TokenRequest {
            grant_type: GrantType::RefreshToken,
            client,
            code: None,
            refresh_token: Some(refresh_token),
            username: None,
            password: None,
            assertion_type: None,
            assertion: None,
            authorization_data: None,
            redirect_uri: previous_grant.redirect_uri.clone(),
            user_data: previous_grant.user_data.clone(),
            access_grant: Some(previous_grant),
            force_access_grant: None,
            scope,
            authorized: false,
            expiration: self.config.access_expiration,
            generate_refresh: true,
        })
    }

    async fn handle_password_grant(
        &self,
        response: &mut Response,
        request: &EndpointRequest,
    ) -> Option<TokenRequest> {
        let auth = client_auth(response, request, self.config.allow_client_secret_in_params)?;

        let username = non_empty(request.form_value("username"));
        let password = non_empty(request.form_value("password"));
        let (Some(username), Some(password)) = (username, password) else {
            response.set_error(ProtocolError::InvalidGrant);
            return None;
        };

        let client = authenticated_client(response, &auth).await?;
        let redirect_uri =
            first_uri(client.redirect_uri(), &self.config.redirect_uri_separator).to_owned();

        Some(TokenRequest {
            grant_type: GrantType::Password,
            client,
            code: None,
            refresh_token: None,
            username: Some(username),
            password: Some(password),
            assertion_type: None,
            assertion: None,
            authorization_data: None,
            access_grant: None,
            force_access_grant: None,
            redirect_uri: Some(redirect_uri),
            scope: non_empty(request.form_value("scope")),
            authorized: false,
            expiration: self.config.access_expiration,
            generate_refresh: true,
            user_data: None,
        })
    }

    async fn handle_client_credentials_grant(
        &self,
        response: &mut Response,
        request: &EndpointRequest,
    ) -> Option<TokenRequest> {
        let auth = client_auth(response, request, self.config.allow_client_secret_in_params)?;
        let client = authenticated_client(response, &auth).await?;
        let redirect_uri =
            first_uri(client.redirect_uri(), &self.config.redirect_uri_separator).to_owned();

        Some(TokenRequest {
            grant_type: GrantType::ClientCredentials,
            client,
            code: None,
            refresh_token: None,
            username: None,
            password: None,
            assertion_type: None,
            assertion: None,
            authorization_data: None,
            access_grant: None,
            force_access_grant: None,
            redirect_uri: Some(redirect_uri),
            scope: non_empty(request.form_value("scope")),
            authorized: false,
            expiration: self.config.access_expiration,
            // client credentials exchanges get no refresh token, per the RFC
            generate_refresh: false,
            user_data: None,
        })
    }

    async fn handle_assertion_grant(
        &self,
        response: &mut Response,
        request: &EndpointRequest,
    ) -> Option<TokenRequest> {
        let auth = client_auth(response, request, self.config.allow_client_secret_in_params)?;

        let assertion_type = non_empty(request.form_value("assertion_type"));
        let assertion = non_empty(request.form_value("assertion"));
        let (Some(assertion_type), Some(assertion)) = (assertion_type, assertion) else {
            response.set_error(ProtocolError::InvalidGrant);
            return None;
        };

        let client = authenticated_client(response, &auth).await?;
        let redirect_uri =
            first_uri(client.redirect_uri(), &self.config.redirect_uri_separator).to_owned();

        Some(TokenRequest {
            grant_type: GrantType::Assertion,
            client,
            code: None,
            refresh_token: None,
            username: None,
            password: None,
            assertion_type: Some(assertion_type),
            assertion: Some(assertion),
            authorization_data: None,
            access_grant: None,
            force_access_grant: None,
            redirect_uri: Some(redirect_uri),
            scope: non_empty(request.form_value("scope")),
            authorized: false,
            expiration: self.config.access_expiration,
            // assertion exchanges get no refresh token, per the RFC
            generate_refresh: false,
            user_data: None,
        })
    }

    /// Finishes a token request after the host's decision.
    ///
    /// A no-op when the response already carries an error. Approved requests
    /// mint an access grant (or reuse [`TokenRequest::force_access_grant`]),
    /// persist it, and only then remove the consumed authorization data or
    /// previous grant — a failure part-way never leaves the client without a
    /// grant. Cleanup failures surface as `server_error` and abort the
    /// output. Denied requests get `access_denied`.
    pub async fn finish_token_request(
        &self,
        response: &mut Response,
        request: &EndpointRequest,
        token_request: TokenRequest,
    ) {
        if response.is_error {
            return;
        }

        let redirect_uri = match &token_request.redirect_uri {
            Some(uri) => Some(uri.clone()),
            None => non_empty(request.form_value("redirect_uri")),
        };

        if !token_request.authorized {
            response.set_error(ProtocolError::AccessDenied);
            return;
        }

        let grant = if let Some(grant) = token_request.force_access_grant {
            grant
        } else {
            let mut grant = AccessGrant {
                client: Arc::clone(&token_request.client),
                authorization_data: token_request.authorization_data.clone().map(Box::new),
                previous_grant: token_request.access_grant.clone().map(Box::new),
                access_token: String::new(),
                refresh_token: None,
                expires_in: token_request.expiration,
                scope: token_request.scope.clone(),
                redirect_uri,
                created_at: self.now(),
                user_data: token_request.user_data.clone(),
            };

            match self
                .access_token_generator
                .generate_access_token(&grant, token_request.generate_refresh)
            {
                Ok((access_token, refresh_token)) => {
                    grant.access_token = access_token;
                    grant.refresh_token = refresh_token;
                }
                Err(err) => {
                    error!("access token generation failed: {err:#}");
                    response.set_error(ProtocolError::ServerError);
                    response.internal_error = Some(err);
                    return;
                }
            }
            grant
        };

        if let Err(err) = response.storage.save_access_grant(&grant).await {
            error!("failed to persist access grant: {err:#}");
            response.set_error(ProtocolError::ServerError);
            response.internal_error = Some(err);
            return;
        }

        // remove the consumed authorization code
        if let Some(consumed) = &grant.authorization_data {
            if let Err(err) = response.storage.remove_authorization_data(&consumed.code).await {
                error!("failed to remove consumed authorization data: {err:#}");
                response.set_error(ProtocolError::ServerError);
                response.internal_error = Some(err);
                return;
            }
        }

        // remove the grant a refresh replaced
        if let Some(previous) = &grant.previous_grant {
            if let Some(refresh_token) = &previous.refresh_token {
                if let Err(err) = response.storage.remove_refresh_grant(refresh_token).await {
                    error!("failed to remove consumed refresh token: {err:#}");
                    response.set_error(ProtocolError::ServerError);
                    response.internal_error = Some(err);
                    return;
                }
            }
            if let Err(err) = response.storage.remove_access_grant(&previous.access_token).await {
                error!("failed to remove replaced access grant: {err:#}");
                response.set_error(ProtocolError::ServerError);
                response.internal_error = Some(err);
                return;
            }
            info!(client_id = %grant.client.id(), "rotated refresh token");
        }

        response
            .output
            .insert("access_token".to_owned(), Value::from(grant.access_token.clone()));
        response
            .output
            .insert("token_type".to_owned(), Value::from(self.config.token_type.clone()));
        response
            .output
            .insert("expires_in".to_owned(), Value::from(grant.expires_in));
        if let Some(refresh_token) = &grant.refresh_token {
            response
                .output
                .insert("refresh_token".to_owned(), Value::from(refresh_token.clone()));
        }
        if let Some(scope) = &token_request.scope {
            if !scope.is_empty() {
                response
                    .output
                    .insert("scope".to_owned(), Value::from(scope.clone()));
            }
        }
    }
}

/// Looks up and authenticates the client named by `auth` against the
/// response's storage, recording the protocol error on failure.
///
/// When the client exposes a [`crate::client::SecretMatcher`] it decides the
/// comparison and the plain secret is never read; otherwise the plain secret
/// is compared in constant time. Clients without a registered redirect URI
/// are rejected.
async fn authenticated_client(
    response: &mut Response,
    auth: &BasicAuth,
) -> Option<Arc<dyn Client>> {
    let client = match response.storage.get_client(&auth.username).await {
        Ok(Some(client)) => client,
        Ok(None) => {
            warn!(client_id = %auth.username, "token request from unknown client");
            response.set_error(ProtocolError::UnauthorizedClient);
            return None;
        }
        Err(err) => {
            error!("client lookup failed for client_id={}: {err:#}", auth.username);
            response.set_error(ProtocolError::ServerError);
            response.internal_error = Some(err);
            return None;
        }
    };

    let secret_matches = match client.secret_matcher() {
        Some(matcher) => matcher.secret_matches(&auth.password),
        None => bool::from(
            client
                .secret()
                .as_bytes()
                .ct_eq(auth.password.as_bytes()),
        ),
    };
    if !secret_matches {
        warn!(client_id = %auth.username, "client secret mismatch");
        response.set_error(ProtocolError::UnauthorizedClient);
        return None;
    }

    if client.redirect_uri().is_empty() {
        warn!(client_id = %auth.username, "client has no registered redirect URI");
        response.set_error(ProtocolError::UnauthorizedClient);
        return None;
    }

    Some(client)
}

/// Whether `requested` contains a scope element absent from `granted`.
/// Scope strings are comma-separated; empty elements are ignored.
fn has_extra_scopes(granted: Option<&str>, requested: Option<&str>) -> bool {
    let granted: HashSet<&str> = granted
        .unwrap_or("")
        .split(',')
        .filter(|scope| !scope.is_empty())
        .collect();
    requested
        .unwrap_or("")
        .split(',')
        .filter(|scope| !scope.is_empty())
        .any(|scope| !granted.contains(scope))
}

#[cfg(test)]
mod tests {
    use super::has_extra_scopes;

    #[test]
    fn scope_subsets_are_allowed() {
        assert!(!has_extra_scopes(Some("a,b"), Some("a,b")));
        assert!(!has_extra_scopes(Some("a,b"), Some("b")));
        assert!(!has_extra_scopes(Some("a,b"), None));
        assert!(!has_extra_scopes(Some("a,,b"), Some(",a,")));
    }

    #[test]
    fn scope_widening_is_detected() {
        assert!(has_extra_scopes(Some("a,b"), Some("b,a,c")));
        assert!(has_extra_scopes(None, Some("a")));
        assert!(has_extra_scopes(Some(""), Some("a")));
    }
}
