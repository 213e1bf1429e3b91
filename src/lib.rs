// ABOUTME: Main library entry point for the Tollgate OAuth 2.0 authorization server
// ABOUTME: Protocol state machines for the authorization, token, and info endpoints per RFC 6749
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

#![deny(unsafe_code)]

//! # Tollgate
//!
//! An embeddable OAuth 2.0 authorization server library (RFC 6749). Tollgate
//! implements the protocol logic — parsing and validating grant requests,
//! authenticating clients, issuing authorization codes and access/refresh
//! tokens, enforcing redirect-URI rules, and shaping RFC-correct responses —
//! while the host application supplies HTTP plumbing, persistence, and the
//! user-authentication UI.
//!
//! ## Two-phase handlers
//!
//! Every endpoint splits into `handle_*` and `finish_*`. `handle_*` validates
//! the protocol inputs and returns a request object; the host then makes its
//! authorization decision (credential check, consent screen) and sets the
//! request's `authorized` flag; `finish_*` performs the side effects and
//! shapes the response. The split is part of the public contract: it is what
//! lets the host render a consent UI between the phases.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tollgate::{
//!     EndpointRequest, MemoryStorage, Server, ServerConfig, StaticClient, Storage,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(MemoryStorage::new());
//!     storage
//!         .set_client(
//!             "1234",
//!             Arc::new(StaticClient {
//!                 id: "1234".to_owned(),
//!                 secret: "aabbccdd".to_owned(),
//!                 redirect_uri: "http://localhost:14000/appauth".to_owned(),
//!                 user_data: None,
//!             }),
//!         )
//!         .await?;
//!
//!     let server = Server::new(ServerConfig::default(), storage);
//!
//!     // built by the host from its HTTP request
//!     let mut request = EndpointRequest::new("GET")
//!         .with_query("response_type=code&client_id=1234&state=xyz");
//!
//!     let mut response = server.new_response();
//!     if let Some(mut auth_request) = server
//!         .handle_authorization_request(&mut response, &mut request)
//!         .await
//!     {
//!         // the host decides here: authenticate the user, show consent
//!         auth_request.authorized = true;
//!         server
//!             .finish_authorization_request(&mut response, &request, auth_request)
//!             .await;
//!     }
//!
//!     // hand the terminal form back to the HTTP layer
//!     let _payload = response.payload()?;
//!     Ok(())
//! }
//! ```

/// Authorization endpoint state machine
pub mod authorize;

/// Client abstraction and the static reference implementation
pub mod client;

/// Server configuration and protocol type enums
pub mod config;

/// Basic and bearer credential extraction
pub mod credentials;

/// RFC 6749 error taxonomy
pub mod error;

/// Access grant introspection endpoint
pub mod info;

/// Reference in-memory storage
pub mod memory;

/// Persisted protocol artifacts
pub mod models;

/// Transport-agnostic request abstraction
pub mod request;

/// Response model and wire payloads
pub mod response;

/// Server facade
pub mod server;

/// Host persistence interface
pub mod storage;

/// Token endpoint state machine
pub mod token;

/// Token generator interfaces and the random default
pub mod tokengen;

/// Redirect URI validation
pub mod uri;

/// Authorization request built by the authorization endpoint
pub use authorize::AuthorizationRequest;

/// Client capability traits and the plain-struct implementation
pub use client::{Client, SecretMatcher, StaticClient, UserData};

/// Configuration and the protocol type enums
pub use config::{AuthorizeRequestType, GrantType, ServerConfig};

/// Extracted credentials
pub use credentials::{basic_auth, bearer_auth, client_auth, BasicAuth, BearerAuth};

/// Protocol error taxonomy
pub use error::ProtocolError;

/// Introspection request built by the info endpoint
pub use info::InfoRequest;

/// Reference storage for tests and examples
pub use memory::MemoryStorage;

/// Persisted artifacts
pub use models::{AccessGrant, AuthorizationData};

/// Host request abstraction
pub use request::{EndpointRequest, FormParseError};

/// Response model
pub use response::{Response, ResponseMode, ResponsePayload};

/// Server facade and its injectable clock
pub use server::{Clock, Server};

/// Host persistence interface
pub use storage::Storage;

/// Token request built by the token endpoint
pub use token::TokenRequest;

/// Token generation
pub use tokengen::{AccessTokenGenerator, AuthorizationTokenGenerator, RandomTokenGenerator};

/// Redirect URI validation
pub use uri::{first_uri, validate_uri, validate_uri_list, UriValidationError};
