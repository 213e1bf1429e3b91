// ABOUTME: Response model shared by every endpoint: data vs redirect mode, output map, error state
// ABOUTME: Assembles redirect URLs with query or fragment placement and the terminal wire payload
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use url::{form_urlencoded, Url};

use crate::error::ProtocolError;
use crate::request::query_unescape;
use crate::storage::Storage;

/// How a response reaches the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Inline body (JSON)
    Data,
    /// HTTP redirect carrying the output in the target URL
    Redirect,
}

/// Response under construction for a single request.
///
/// Created through [`crate::server::Server::new_response`] and owned by the
/// request handling it. Endpoints mutate it in place; the host emits it via
/// [`Response::payload`].
pub struct Response {
    /// Delivery mode
    pub mode: ResponseMode,
    /// HTTP status for data responses
    pub status: u16,
    /// Status text, set only when the status is not 200
    pub status_text: String,
    /// Status used when a protocol error is reported inline
    pub error_status: u16,
    /// Redirect target (redirect mode only)
    pub url: String,
    /// Output members, emitted as JSON or URL parameters
    pub output: BTreeMap<String, Value>,
    /// Response headers
    pub headers: BTreeMap<String, String>,
    /// Whether a protocol error has been recorded
    pub is_error: bool,
    /// The recorded protocol error
    pub error_code: Option<ProtocolError>,
    /// Underlying cause for host logging; never emitted to clients
    pub internal_error: Option<anyhow::Error>,
    /// Place redirect output in the URL fragment instead of the query
    pub redirect_in_fragment: bool,
    /// Storage used while handling this response
    pub storage: Arc<dyn Storage>,
}

impl Response {
    /// Creates a data-mode response with the standard non-cache headers.
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Cache-Control".to_owned(),
            "no-cache, no-store, max-age=0, must-revalidate".to_owned(),
        );
        headers.insert("Pragma".to_owned(), "no-cache".to_owned());
        headers.insert("Expires".to_owned(), "Fri, 01 Jan 1990 00:00:00 GMT".to_owned());
        Self {
            mode: ResponseMode::Data,
            status: 200,
            status_text: String::new(),
            error_status: 200,
            url: String::new(),
            output: BTreeMap::new(),
            headers,
            is_error: false,
            error_code: None,
            internal_error: None,
            redirect_in_fragment: false,
            storage,
        }
    }

    /// Records a protocol error, replacing any previous output.
    pub fn set_error(&mut self, error: ProtocolError) {
        self.set_error_state(error, None);
    }

    /// Records a protocol error and echoes the client `state` when present.
    pub fn set_error_state(&mut self, error: ProtocolError, state: Option<&str>) {
        self.is_error = true;
        self.error_code = Some(error);
        self.status = error.status_override().unwrap_or(self.error_status);
        self.status_text = if self.status == 200 {
            String::new()
        } else {
            error.description().to_owned()
        };
        self.output = BTreeMap::new();
        self.output
            .insert("error".to_owned(), Value::from(error.code()));
        self.output
            .insert("error_description".to_owned(), Value::from(error.description()));
        if let Some(state) = state {
            if !state.is_empty() {
                self.output.insert("state".to_owned(), Value::from(state));
            }
        }
    }

    /// Switches the response to redirect mode targeting `url`.
    pub fn set_redirect(&mut self, url: impl Into<String>) {
        self.mode = ResponseMode::Redirect;
        self.url = url.into();
    }

    /// Chooses fragment placement for redirect output (implicit flow).
    pub fn set_redirect_fragment(&mut self, fragment: bool) {
        self.redirect_in_fragment = fragment;
    }

    /// Assembles the redirect URL with all output members attached.
    ///
    /// Output lands in the query string, or in the fragment when
    /// [`Response::redirect_in_fragment`] is set (RFC 6749 section 4.2.2
    /// wants the fragment unescaped after encoding).
    ///
    /// # Errors
    /// Fails on a data-mode response or an unparseable target URL.
    pub fn redirect_url(&self) -> Result<String> {
        if self.mode != ResponseMode::Redirect {
            bail!("not a redirect response");
        }
        let mut url = Url::parse(&self.url).context("invalid redirect target")?;

        let mut pairs: BTreeMap<String, String> = url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        for (name, value) in &self.output {
            pairs.insert(name.clone(), query_value(value));
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in &pairs {
            serializer.append_pair(name, value);
        }
        let encoded = serializer.finish();

        if self.redirect_in_fragment {
            url.set_query(None);
            let fragment = query_unescape(&encoded)
                .context("redirect fragment is not valid urlencoded data")?;
            url.set_fragment(Some(&fragment));
        } else if encoded.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&encoded));
        }
        Ok(url.to_string())
    }

    /// Terminal wire form of this response for the host to emit.
    ///
    /// # Errors
    /// Fails when the redirect URL cannot be assembled or the output cannot
    /// be encoded as JSON.
    pub fn payload(&self) -> Result<ResponsePayload> {
        let mut headers = self.headers.clone();
        match self.mode {
            ResponseMode::Redirect => {
                let location = self.redirect_url()?;
                headers.insert("Location".to_owned(), location.clone());
                Ok(ResponsePayload::Redirect {
                    status: 302,
                    headers,
                    location,
                })
            }
            ResponseMode::Data => {
                headers
                    .entry("Content-Type".to_owned())
                    .or_insert_with(|| "application/json".to_owned());
                let body = serde_json::to_string(&self.output)
                    .context("failed to encode response output")?;
                Ok(ResponsePayload::Data {
                    status: self.status,
                    headers,
                    body,
                })
            }
        }
    }
}

/// A finished response in the form the host hands to its HTTP stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePayload {
    /// Inline JSON body
    Data {
        /// HTTP status
        status: u16,
        /// Response headers including `Content-Type`
        headers: BTreeMap<String, String>,
        /// JSON-encoded output
        body: String,
    },
    /// HTTP 302 redirect
    Redirect {
        /// HTTP status (always 302)
        status: u16,
        /// Response headers including `Location`
        headers: BTreeMap<String, String>,
        /// Redirect target with output attached
        location: String,
    },
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
