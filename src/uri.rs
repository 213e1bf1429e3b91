// ABOUTME: Redirect URI validation: exact match or subpath of a registered URI
// ABOUTME: Rejects fragments and path traversal; supports separator-delimited URI lists
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tollgate Contributors

use thiserror::Error;
use url::Url;

/// Why a candidate redirect URI was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriValidationError {
    /// Registered or candidate URI was empty
    #[error("urls cannot be blank")]
    Blank,
    /// One of the URIs did not parse
    #[error("failed to parse url: {0}")]
    Parse(#[from] url::ParseError),
    /// Redirect URIs must not carry fragments
    #[error("url must not include fragment")]
    Fragment,
    /// Scheme differs from the registered URI
    #[error("scheme mismatch: {base} / {candidate}")]
    SchemeMismatch {
        /// Registered URI
        base: String,
        /// Candidate redirect URI
        candidate: String,
    },
    /// Host or port differs from the registered URI
    #[error("host mismatch: {base} / {candidate}")]
    HostMismatch {
        /// Registered URI
        base: String,
        /// Candidate redirect URI
        candidate: String,
    },
    /// Candidate path is neither the registered path nor under it
    #[error("path is not a subpath: {base} / {candidate}")]
    NotASubpath {
        /// Registered URI
        base: String,
        /// Candidate redirect URI
        candidate: String,
    },
    /// Candidate subpath contains a `..` segment
    #[error("subpath cannot contain path traversal: {base} / {candidate}")]
    PathTraversal {
        /// Registered URI
        base: String,
        /// Candidate redirect URI
        candidate: String,
    },
    /// No entry of a registered URI list matched
    #[error("urls don't validate: {base} / {candidate}")]
    NoMatch {
        /// Registered URI list
        base: String,
        /// Candidate redirect URI
        candidate: String,
    },
}

impl UriValidationError {
    /// Mismatches let a list scan try the next registered entry; structural
    /// errors (blank, unparseable, fragment) abort the scan.
    #[must_use]
    pub const fn is_mismatch(&self) -> bool {
        matches!(
            self,
            Self::SchemeMismatch { .. }
                | Self::HostMismatch { .. }
                | Self::NotASubpath { .. }
                | Self::PathTraversal { .. }
                | Self::NoMatch { .. }
        )
    }
}

/// Validates that `candidate` is the registered URI or a subpath of it.
///
/// # Errors
/// Returns the reason the candidate was rejected.
pub fn validate_uri(base: &str, candidate: &str) -> Result<(), UriValidationError> {
    if base.is_empty() || candidate.is_empty() {
        return Err(UriValidationError::Blank);
    }

    let base_url = Url::parse(base)?;
    let candidate_url = Url::parse(candidate)?;

    if base_url.fragment().is_some() || candidate_url.fragment().is_some() {
        return Err(UriValidationError::Fragment);
    }

    if base_url.scheme() != candidate_url.scheme() {
        return Err(UriValidationError::SchemeMismatch {
            base: base.to_owned(),
            candidate: candidate.to_owned(),
        });
    }
    if base_url.host_str() != candidate_url.host_str() || base_url.port() != candidate_url.port() {
        return Err(UriValidationError::HostMismatch {
            base: base.to_owned(),
            candidate: candidate.to_owned(),
        });
    }

    // exact path matches are always allowed
    if base_url.path() == candidate_url.path() {
        return Ok(());
    }

    // prefix matches must be actual subpaths
    let required_prefix = format!("{}/", base_url.path().trim_end_matches('/'));
    let Some(subpath) = candidate_url.path().strip_prefix(&required_prefix) else {
        return Err(UriValidationError::NotASubpath {
            base: base.to_owned(),
            candidate: candidate.to_owned(),
        });
    };

    // and must not climb back out
    if subpath.split('/').any(|segment| segment == "..") {
        return Err(UriValidationError::PathTraversal {
            base: base.to_owned(),
            candidate: candidate.to_owned(),
        });
    }

    Ok(())
}

/// Validates `candidate` against a registered URI list.
///
/// `base_list` is split on `separator` (taken whole when the separator is
/// empty); any matching entry validates. Structural errors from an entry are
/// returned directly, never masked by the list scan.
///
/// # Errors
/// Returns the structural error, or [`UriValidationError::NoMatch`] when
/// every entry mismatched.
pub fn validate_uri_list(
    base_list: &str,
    candidate: &str,
    separator: &str,
) -> Result<(), UriValidationError> {
    let bases: Vec<&str> = if separator.is_empty() {
        vec![base_list]
    } else {
        base_list.split(separator).collect()
    };

    for base in bases {
        match validate_uri(base, candidate) {
            Ok(()) => return Ok(()),
            Err(err) if err.is_mismatch() => {}
            Err(err) => return Err(err),
        }
    }

    Err(UriValidationError::NoMatch {
        base: base_list.to_owned(),
        candidate: candidate.to_owned(),
    })
}

/// First entry of a registered URI list, or the whole string when the
/// separator is empty.
#[must_use]
pub fn first_uri<'a>(base_list: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        base_list
    } else {
        base_list.split(separator).next().unwrap_or(base_list)
    }
}
