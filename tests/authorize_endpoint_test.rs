// ABOUTME: Authorization endpoint flows: code issuance, implicit tokens, denial, error routing
// ABOUTME: Exercises redirect-preemptive error delivery and redirect URI resolution
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

mod common;

use std::collections::HashSet;

use serde_json::json;
use tollgate::{
    AuthorizeRequestType, EndpointRequest, ProtocolError, ResponseMode, ServerConfig, Storage,
};

use common::{
    fragment_params, query_params, seeded_storage, test_server, TEST_REDIRECT_URI,
};

fn code_config() -> ServerConfig {
    ServerConfig::default()
}

fn token_config() -> ServerConfig {
    ServerConfig {
        allowed_authorize_request_types: HashSet::from([AuthorizeRequestType::Token]),
        ..ServerConfig::default()
    }
}

#[tokio::test]
async fn code_flow_issues_a_code_and_echoes_state() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage.clone());

    let mut request =
        EndpointRequest::new("GET").with_query("response_type=code&client_id=1234&state=a");
    let mut response = server.new_response();

    let mut auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await
        .expect("handle should succeed");
    // no redirect_uri parameter: defaults to the registered URI
    assert_eq!(auth_request.redirect_uri, TEST_REDIRECT_URI);
    assert_eq!(auth_request.request_type, AuthorizeRequestType::Code);
    assert_eq!(auth_request.expiration, 250);

    auth_request.authorized = true;
    server
        .finish_authorization_request(&mut response, &request, auth_request)
        .await;

    assert!(!response.is_error, "unexpected error: {:?}", response.error_code);
    assert_eq!(response.mode, ResponseMode::Redirect);
    assert_eq!(response.output.get("code"), Some(&json!("1")));
    assert_eq!(response.output.get("state"), Some(&json!("a")));

    let location = response.redirect_url().unwrap();
    let params = query_params(&location);
    assert_eq!(params.get("code").map(String::as_str), Some("1"));
    assert_eq!(params.get("state").map(String::as_str), Some("a"));

    // the code is persisted until the token exchange consumes it
    let persisted = storage.load_authorization_data("1").await.unwrap().unwrap();
    assert_eq!(persisted.redirect_uri, TEST_REDIRECT_URI);
    assert_eq!(persisted.expires_in, 250);
    assert_eq!(persisted.state.as_deref(), Some("a"));
}

#[tokio::test]
async fn implicit_flow_emits_the_token_in_the_fragment_without_refresh() {
    let storage = seeded_storage().await;
    let server = test_server(token_config(), storage.clone());

    let mut request =
        EndpointRequest::new("GET").with_query("response_type=token&client_id=1234&state=a");
    let mut response = server.new_response();

    let mut auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await
        .expect("handle should succeed");
    assert_eq!(auth_request.request_type, AuthorizeRequestType::Token);
    assert_eq!(auth_request.expiration, 3600);

    auth_request.authorized = true;
    server
        .finish_authorization_request(&mut response, &request, auth_request)
        .await;

    assert!(!response.is_error, "unexpected error: {:?}", response.error_code);
    assert_eq!(response.mode, ResponseMode::Redirect);
    assert!(response.redirect_in_fragment);
    assert_eq!(response.output.get("access_token"), Some(&json!("1")));
    assert_eq!(response.output.get("state"), Some(&json!("a")));
    assert!(
        !response.output.contains_key("refresh_token"),
        "implicit flow must not emit a refresh token"
    );

    let location = response.redirect_url().unwrap();
    let params = fragment_params(&location);
    assert_eq!(params.get("access_token").map(String::as_str), Some("1"));
    assert_eq!(params.get("token_type").map(String::as_str), Some("Bearer"));
    assert_eq!(params.get("state").map(String::as_str), Some("a"));
    assert!(!params.contains_key("refresh_token"));
    assert!(query_params(&location).is_empty());

    // the implicit grant is persisted like any other
    assert!(storage.load_access_grant("1").await.unwrap().is_some());
}

#[tokio::test]
async fn denied_requests_redirect_with_access_denied() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage);

    let mut request =
        EndpointRequest::new("GET").with_query("response_type=code&client_id=1234&state=a");
    let mut response = server.new_response();

    let auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await
        .expect("handle should succeed");
    // host leaves authorized = false
    server
        .finish_authorization_request(&mut response, &request, auth_request)
        .await;

    assert!(response.is_error);
    assert_eq!(response.error_code, Some(ProtocolError::AccessDenied));
    assert_eq!(response.mode, ResponseMode::Redirect);

    let params = query_params(&response.redirect_url().unwrap());
    assert_eq!(params.get("error").map(String::as_str), Some("access_denied"));
    assert_eq!(params.get("state").map(String::as_str), Some("a"));
}

#[tokio::test]
async fn unknown_clients_fail_inline() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage);

    let mut request =
        EndpointRequest::new("GET").with_query("response_type=code&client_id=9876&state=a");
    let mut response = server.new_response();

    let auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await;
    assert!(auth_request.is_none());
    assert!(response.is_error);
    assert_eq!(response.error_code, Some(ProtocolError::UnauthorizedClient));
    // no redirect URI was established, so the error stays inline
    assert_eq!(response.mode, ResponseMode::Data);
    assert_eq!(response.output.get("state"), Some(&json!("a")));
}

#[tokio::test]
async fn disallowed_response_types_redirect_back_to_the_client() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage);

    let mut request =
        EndpointRequest::new("GET").with_query("response_type=token&client_id=1234&state=a");
    let mut response = server.new_response();

    let auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await;
    assert!(auth_request.is_none());
    assert!(response.is_error);
    assert_eq!(
        response.error_code,
        Some(ProtocolError::UnsupportedResponseType)
    );
    // the redirect URI validated before the response_type check
    assert_eq!(response.mode, ResponseMode::Redirect);
    let params = query_params(&response.redirect_url().unwrap());
    assert_eq!(
        params.get("error").map(String::as_str),
        Some("unsupported_response_type")
    );
    assert_eq!(params.get("state").map(String::as_str), Some("a"));
}

#[tokio::test]
async fn foreign_redirect_uris_fail_inline() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage);

    let mut request = EndpointRequest::new("GET").with_query(
        "response_type=code&client_id=1234&redirect_uri=http%3A%2F%2Fevil.example%2Fappauth",
    );
    let mut response = server.new_response();

    let auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await;
    assert!(auth_request.is_none());
    assert!(response.is_error);
    assert_eq!(response.error_code, Some(ProtocolError::InvalidRequest));
    assert_eq!(response.mode, ResponseMode::Data);
    assert!(response.internal_error.is_some());
}

#[tokio::test]
async fn subpath_redirect_uris_are_accepted() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage);

    let mut request = EndpointRequest::new("GET").with_query(
        "response_type=code&client_id=1234&redirect_uri=http%3A%2F%2Flocalhost%3A14000%2Fappauth%2Fcallback",
    );
    let mut response = server.new_response();

    let mut auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await
        .expect("subpath of the registered URI should validate");
    assert_eq!(
        auth_request.redirect_uri,
        "http://localhost:14000/appauth/callback"
    );

    auth_request.authorized = true;
    server
        .finish_authorization_request(&mut response, &request, auth_request)
        .await;
    assert!(!response.is_error);
    let location = response.redirect_url().unwrap();
    assert!(location.starts_with("http://localhost:14000/appauth/callback?"));
}

#[tokio::test]
async fn malformed_forms_fail_inline() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage);

    let mut request =
        EndpointRequest::new("GET").with_query("response_type=code&client_id=1234&redirect_uri=%zz");
    let mut response = server.new_response();

    let auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await;
    assert!(auth_request.is_none());
    assert_eq!(response.error_code, Some(ProtocolError::InvalidRequest));
    assert!(response.internal_error.is_some());
    assert_eq!(response.mode, ResponseMode::Data);
}

#[tokio::test]
async fn scope_and_state_carry_onto_the_authorization_data() {
    let storage = seeded_storage().await;
    let server = test_server(code_config(), storage.clone());

    let mut request = EndpointRequest::new("GET")
        .with_query("response_type=code&client_id=1234&state=xyz&scope=read%2Cwrite");
    let mut response = server.new_response();

    let mut auth_request = server
        .handle_authorization_request(&mut response, &mut request)
        .await
        .expect("handle should succeed");
    assert_eq!(auth_request.scope.as_deref(), Some("read,write"));

    auth_request.authorized = true;
    auth_request.user_data = Some(json!({"user": 42}));
    server
        .finish_authorization_request(&mut response, &request, auth_request)
        .await;
    assert!(!response.is_error);

    let persisted = storage.load_authorization_data("1").await.unwrap().unwrap();
    assert_eq!(persisted.scope.as_deref(), Some("read,write"));
    assert_eq!(persisted.state.as_deref(), Some("xyz"));
    assert_eq!(persisted.user_data, Some(json!({"user": 42})));
}
