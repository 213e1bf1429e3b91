// ABOUTME: Authorization endpoint: response_type=code issues codes, response_type=token routes implicit
// ABOUTME: Redirect mode is set as soon as the redirect URI validates so later errors reach the client URL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, warn};

use crate::client::{Client, UserData};
use crate::config::{AuthorizeRequestType, GrantType};
use crate::error::ProtocolError;
use crate::models::AuthorizationData;
use crate::request::{non_empty, query_unescape, EndpointRequest};
use crate::response::Response;
use crate::server::Server;
use crate::token::TokenRequest;
use crate::uri::{first_uri, validate_uri_list};

/// An authorization request that passed protocol validation.
///
/// The host decides the outcome between `handle` and `finish`: it
/// authenticates the resource owner, renders whatever consent UI it wants,
/// and sets [`AuthorizationRequest::authorized`] (and optionally
/// [`AuthorizationRequest::user_data`]) before finishing.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Which flow was requested
    pub request_type: AuthorizeRequestType,
    /// The requesting client
    pub client: Arc<dyn Client>,
    /// Requested scope
    pub scope: Option<String>,
    /// Resolved redirect URI
    pub redirect_uri: String,
    /// Client-supplied CSRF state
    pub state: Option<String>,
    /// Host decision; false until the host approves the request
    pub authorized: bool,
    /// Lifetime in seconds of the artifact this request will issue
    pub expiration: i64,
    /// Opaque host payload carried onto the issued artifact
    pub user_data: Option<UserData>,
}

impl Server {
    /// Parses and validates an authorization request.
    ///
    /// On success the response is already in redirect mode targeting the
    /// resolved redirect URI, so any later error reaches the client's URL
    /// (RFC 6749 section 4.1.2.1). On failure the error has been recorded
    /// on the response and `None` is returned.
    pub async fn handle_authorization_request(
        &self,
        response: &mut Response,
        request: &mut EndpointRequest,
    ) -> Option<AuthorizationRequest> {
        if let Err(err) = request.parse_form() {
            response.set_error(ProtocolError::InvalidRequest);
            response.internal_error = Some(err.into());
            return None;
        }

        let state = non_empty(request.form_value("state"));
        let scope = non_empty(request.form_value("scope"));

        // redirect_uri is unescaped a second time after form decoding, so
        // hosts that forward it still-encoded behave the same as those that
        // decode it up front
        let mut redirect_uri =
            match query_unescape(request.form_value("redirect_uri").unwrap_or("")) {
                Ok(uri) => uri,
                Err(err) => {
                    response.set_error(ProtocolError::InvalidRequest);
                    response.internal_error = Some(err.into());
                    return None;
                }
            };

        let client_id = request.form_value("client_id").unwrap_or("");
        let client = match response.storage.get_client(client_id).await {
            Ok(Some(client)) => client,
            Ok(None) => {
                warn!(client_id, "authorization request for unknown client");
                response.set_error_state(ProtocolError::UnauthorizedClient, state.as_deref());
                return None;
            }
            Err(err) => {
                error!("client lookup failed for client_id={client_id}: {err:#}");
                response.set_error_state(ProtocolError::ServerError, state.as_deref());
                response.internal_error = Some(err);
                return None;
            }
        };
        if client.redirect_uri().is_empty() {
            warn!(client_id, "client has no registered redirect URI");
            response.set_error_state(ProtocolError::UnauthorizedClient, state.as_deref());
            return None;
        }

        let registered = client.redirect_uri().to_owned();
        let separator = self.config.redirect_uri_separator.clone();

        // default to the registered URI, but only when it is a single value
        if redirect_uri.is_empty() && first_uri(&registered, &separator) == registered {
            redirect_uri.clone_from(&registered);
        }

        if let Err(err) = validate_uri_list(&registered, &redirect_uri, &separator) {
            warn!(client_id, redirect_uri = %redirect_uri, "redirect URI failed validation: {err}");
            response.set_error_state(ProtocolError::InvalidRequest, state.as_deref());
            response.internal_error = Some(err.into());
            return None;
        }

        // from here on errors are delivered as redirects to the client URL
        response.set_redirect(redirect_uri.clone());

        let response_type = request.form_value("response_type").unwrap_or("");
        let request_type = AuthorizeRequestType::from_param(response_type)
            .filter(|request_type| self.config.is_authorize_request_type_allowed(*request_type));
        let Some(request_type) = request_type else {
            response.set_error_state(ProtocolError::UnsupportedResponseType, state.as_deref());
            return None;
        };

        let expiration = match request_type {
            AuthorizeRequestType::Code => self.config.authorization_expiration,
            AuthorizeRequestType::Token => self.config.access_expiration,
        };

        Some(AuthorizationRequest {
            request_type,
            client,
            scope,
            redirect_uri,
            state,
            authorized: false,
            expiration,
            user_data: None,
        })
    }

    /// Finishes an authorization request after the host's decision.
    ///
    /// A no-op when the response already carries an error. Denied requests
    /// redirect with `access_denied`; approved code requests persist
    /// authorization data and redirect with the code; approved implicit
    /// requests are routed through token finalization with the output placed
    /// in the URL fragment and no refresh token.
    pub async fn finish_authorization_request(
        &self,
        response: &mut Response,
        request: &EndpointRequest,
        auth_request: AuthorizationRequest,
    ) {
        if response.is_error {
            return;
        }

        response.set_redirect(auth_request.redirect_uri.clone());

        if !auth_request.authorized {
            response.set_error_state(ProtocolError::AccessDenied, auth_request.state.as_deref());
            return;
        }

        match auth_request.request_type {
            AuthorizeRequestType::Token => {
                response.set_redirect_fragment(true);

                // issue the token directly; the RFC forbids a refresh token
                // in the implicit flow
                let token_request = TokenRequest {
                    grant_type: GrantType::Implicit,
                    client: Arc::clone(&auth_request.client),
                    code: None,
                    refresh_token: None,
                    username: None,
                    password: None,
                    assertion_type: None,
                    assertion: None,
                    authorization_data: None,
                    access_grant: None,
                    force_access_grant: None,
                    redirect_uri: Some(auth_request.redirect_uri.clone()),
                    scope: auth_request.scope.clone(),
                    authorized: true,
                    expiration: auth_request.expiration,
                    generate_refresh: false,
                    user_data: auth_request.user_data.clone(),
                };
                self.finish_token_request(response, request, token_request).await;

                if response.internal_error.is_none() {
                    if let Some(state) = &auth_request.state {
                        response
                            .output
                            .insert("state".to_owned(), Value::from(state.clone()));
                    }
                }
            }
            AuthorizeRequestType::Code => {
                let mut data = AuthorizationData {
                    client: Arc::clone(&auth_request.client),
                    code: String::new(),
                    expires_in: auth_request.expiration,
                    scope: auth_request.scope.clone(),
                    redirect_uri: auth_request.redirect_uri.clone(),
                    state: auth_request.state.clone(),
                    created_at: self.now(),
                    user_data: auth_request.user_data.clone(),
                };

                match self
                    .authorization_token_generator
                    .generate_authorization_code(&data)
                {
                    Ok(code) => data.code = code,
                    Err(err) => {
                        error!("authorization code generation failed: {err:#}");
                        response.set_error_state(
                            ProtocolError::ServerError,
                            auth_request.state.as_deref(),
                        );
                        response.internal_error = Some(err);
                        return;
                    }
                }

                if let Err(err) = response.storage.save_authorization_data(&data).await {
                    error!("failed to persist authorization data: {err:#}");
                    response
                        .set_error_state(ProtocolError::ServerError, auth_request.state.as_deref());
                    response.internal_error = Some(err);
                    return;
                }

                response
                    .output
                    .insert("code".to_owned(), Value::from(data.code));
                if let Some(state) = data.state {
                    response.output.insert("state".to_owned(), Value::from(state));
                }
            }
        }
    }
}
