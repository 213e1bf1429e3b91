// ABOUTME: Bearer-authenticated introspection of an access grant for its own holder
// ABOUTME: Convenience endpoint, not an RFC specification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use serde_json::Value;
use tracing::{error, warn};

use crate::credentials::bearer_auth;
use crate::error::ProtocolError;
use crate::models::AccessGrant;
use crate::request::EndpointRequest;
use crate::response::Response;
use crate::server::Server;

/// An introspection request for a live access grant.
#[derive(Debug, Clone)]
pub struct InfoRequest {
    /// The presented bearer token
    pub token: String,
    /// The grant it resolved to
    pub access_grant: AccessGrant,
}

impl Server {
    /// Authenticates the bearer token and loads its access grant.
    ///
    /// On failure the error has been recorded on the response and `None` is
    /// returned.
    pub async fn handle_info_request(
        &self,
        response: &mut Response,
        request: &mut EndpointRequest,
    ) -> Option<InfoRequest> {
        if let Err(err) = request.parse_form() {
            response.set_error(ProtocolError::InvalidRequest);
            response.internal_error = Some(err.into());
            return None;
        }

        let Some(bearer) = bearer_auth(request) else {
            response.set_error(ProtocolError::InvalidRequest);
            return None;
        };
        if bearer.token.is_empty() {
            response.set_error(ProtocolError::InvalidRequest);
            return None;
        }

        let access_grant = match response.storage.load_access_grant(&bearer.token).await {
            Ok(Some(grant)) => grant,
            Ok(None) => {
                warn!("info request for unknown access token");
                response.set_error(ProtocolError::InvalidRequest);
                return None;
            }
            Err(err) => {
                error!("failed to load access grant: {err:#}");
                response.set_error(ProtocolError::ServerError);
                response.internal_error = Some(err);
                return None;
            }
        };

        if access_grant.client.redirect_uri().is_empty() {
            response.set_error(ProtocolError::UnauthorizedClient);
            return None;
        }
        if access_grant.is_expired_at(self.now()) {
            warn!(client_id = %access_grant.client.id(), "info request for expired grant");
            response.set_error(ProtocolError::InvalidGrant);
            return None;
        }

        Some(InfoRequest {
            token: bearer.token,
            access_grant,
        })
    }

    /// Emits the introspection output for a validated info request.
    ///
    /// A no-op when the response already carries an error. `expires_in` is
    /// the remaining lifetime in whole seconds.
    pub fn finish_info_request(&self, response: &mut Response, info_request: &InfoRequest) {
        if response.is_error {
            return;
        }

        let grant = &info_request.access_grant;
        response
            .output
            .insert("client_id".to_owned(), Value::from(grant.client.id()));
        response
            .output
            .insert("access_token".to_owned(), Value::from(grant.access_token.clone()));
        response
            .output
            .insert("token_type".to_owned(), Value::from(self.config.token_type.clone()));
        let remaining = (grant.expires_at() - self.now()).num_seconds();
        response
            .output
            .insert("expires_in".to_owned(), Value::from(remaining));
        if let Some(refresh_token) = &grant.refresh_token {
            response
                .output
                .insert("refresh_token".to_owned(), Value::from(refresh_token.clone()));
        }
        if let Some(scope) = &grant.scope {
            if !scope.is_empty() {
                response
                    .output
                    .insert("scope".to_owned(), Value::from(scope.clone()));
            }
        }
    }
}
