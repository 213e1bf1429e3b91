// ABOUTME: Transport-agnostic request abstraction the host builds from its HTTP layer
// ABOUTME: Strict urlencoded form parsing over raw query and body, body values shadowing query values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;
use url::form_urlencoded;

/// Errors raised by strict form decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormParseError {
    /// A percent escape was truncated or not followed by two hex digits
    #[error("invalid percent escape in form data")]
    InvalidEscape,
    /// Decoded bytes were not valid UTF-8
    #[error("form data is not valid UTF-8")]
    InvalidUtf8,
}

/// The slice of an HTTP request the protocol needs: method, headers, and
/// urlencoded parameters.
///
/// Hosts construct one per request from whatever HTTP stack they embed the
/// library in. Parameters stay raw until an endpoint calls
/// [`EndpointRequest::parse_form`], so malformed encodings surface as
/// `invalid_request` at the protocol layer rather than in host plumbing.
#[derive(Debug, Clone, Default)]
pub struct EndpointRequest {
    method: String,
    headers: BTreeMap<String, String>,
    query: String,
    body: String,
    form: Option<BTreeMap<String, String>>,
}

impl EndpointRequest {
    /// Creates a request with the given HTTP method.
    #[must_use]
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_owned(),
            ..Self::default()
        }
    }

    /// Adds a header. Names are matched case-insensitively.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_owned());
        self
    }

    /// Sets the raw (still encoded) query string, without the leading `?`.
    #[must_use]
    pub fn with_query(mut self, raw_query: &str) -> Self {
        self.query = raw_query.to_owned();
        self
    }

    /// Sets the raw `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn with_body(mut self, raw_body: &str) -> Self {
        self.body = raw_body.to_owned();
        self
    }

    /// Appends a single form pair to the body, encoding it on the way in.
    #[must_use]
    pub fn with_form_value(mut self, name: &str, value: &str) -> Self {
        let pair = form_urlencoded::Serializer::new(String::new())
            .append_pair(name, value)
            .finish();
        if !self.body.is_empty() {
            self.body.push('&');
        }
        self.body.push_str(&pair);
        self
    }

    /// Adds an `Authorization: Basic` header from the given credentials.
    #[must_use]
    pub fn with_basic_auth(self, username: &str, password: &str) -> Self {
        let encoded = general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.with_header("authorization", &format!("Basic {encoded}"))
    }

    /// The HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Looks up a header value, case-insensitively. Empty values read as
    /// absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// Decodes query and body parameters. Idempotent; body values shadow
    /// query values and the first occurrence of a repeated key wins.
    ///
    /// # Errors
    /// Fails on malformed percent escapes or non-UTF-8 data.
    pub fn parse_form(&mut self) -> Result<(), FormParseError> {
        if self.form.is_some() {
            return Ok(());
        }
        let mut form = BTreeMap::new();
        parse_pairs(&self.body, &mut form)?;
        parse_pairs(&self.query, &mut form)?;
        self.form = Some(form);
        Ok(())
    }

    /// A decoded form value. Only populated after
    /// [`EndpointRequest::parse_form`] has run.
    #[must_use]
    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .as_ref()
            .and_then(|form| form.get(name))
            .map(String::as_str)
    }

    /// Whether the form carries the key at all, even with an empty value.
    #[must_use]
    pub fn has_form_key(&self, name: &str) -> bool {
        self.form.as_ref().is_some_and(|form| form.contains_key(name))
    }
}

fn parse_pairs(raw: &str, into: &mut BTreeMap<String, String>) -> Result<(), FormParseError> {
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = query_unescape(name)?;
        let value = query_unescape(value)?;
        into.entry(name).or_insert(value);
    }
    Ok(())
}

/// Strict urlencoded unescape: `+` becomes a space and every `%` must start
/// a two-digit hex escape.
pub(crate) fn query_unescape(value: &str) -> Result<String, FormParseError> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).and_then(|b| char::from(*b).to_digit(16));
                let lo = bytes.get(i + 2).and_then(|b| char::from(*b).to_digit(16));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        decoded.push(u8::try_from(hi * 16 + lo).unwrap_or_default());
                        i += 3;
                    }
                    _ => return Err(FormParseError::InvalidEscape),
                }
            }
            b'+' => {
                decoded.push(b' ');
                i += 1;
            }
            byte => {
                decoded.push(byte);
                i += 1;
            }
        }
    }
    String::from_utf8(decoded).map_err(|_| FormParseError::InvalidUtf8)
}

/// Copies a non-empty form value out as an owned string.
pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::{query_unescape, EndpointRequest, FormParseError};

    #[test]
    fn body_values_shadow_query_values() {
        let mut request = EndpointRequest::new("POST")
            .with_query("grant_type=from_query&state=a")
            .with_body("grant_type=from_body");
        request.parse_form().unwrap();
        assert_eq!(request.form_value("grant_type"), Some("from_body"));
        assert_eq!(request.form_value("state"), Some("a"));
        assert_eq!(request.form_value("missing"), None);
    }

    #[test]
    fn first_occurrence_of_a_repeated_key_wins() {
        let mut request = EndpointRequest::new("POST").with_body("scope=first&scope=second");
        request.parse_form().unwrap();
        assert_eq!(request.form_value("scope"), Some("first"));
    }

    #[test]
    fn malformed_escapes_are_rejected() {
        let mut request = EndpointRequest::new("POST").with_body("redirect_uri=%zz");
        assert_eq!(request.parse_form(), Err(FormParseError::InvalidEscape));

        let mut request = EndpointRequest::new("POST").with_query("code=%9");
        assert_eq!(request.parse_form(), Err(FormParseError::InvalidEscape));
    }

    #[test]
    fn unescape_handles_plus_and_percent_escapes() {
        assert_eq!(query_unescape("a+b%2Bc").unwrap(), "a b+c");
        assert_eq!(
            query_unescape("http%3A%2F%2Flocalhost%3A14000%2Fappauth").unwrap(),
            "http://localhost:14000/appauth"
        );
        assert_eq!(query_unescape("%e4%bd%a0").unwrap(), "你");
        assert_eq!(query_unescape("%ff"), Err(FormParseError::InvalidUtf8));
    }

    #[test]
    fn form_value_builder_round_trips_reserved_characters() {
        let mut request =
            EndpointRequest::new("POST").with_form_value("redirect_uri", "http://h/a?x=1&y=2");
        request.parse_form().unwrap();
        assert_eq!(request.form_value("redirect_uri"), Some("http://h/a?x=1&y=2"));
    }

    #[test]
    fn headers_match_case_insensitively_and_empty_reads_absent() {
        let request = EndpointRequest::new("GET")
            .with_header("Authorization", "Bearer XYZ")
            .with_header("X-Empty", "");
        assert_eq!(request.header("authorization"), Some("Bearer XYZ"));
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer XYZ"));
        assert_eq!(request.header("x-empty"), None);
    }
}
