// SPDX-License-Identifier: MIT OR Apache-2.0
//! Case-insensitive request-header map.
//!
//! Header lookup used to be re-implemented inline at every call site; this is
//! the single abstraction shared by the tenant resolver and both transports.

use std::collections::BTreeMap;

/// Immutable, case-insensitive view of a request's headers.
///
/// Keys are lowercased on insertion, so `get` is a plain map lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Empty header set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, lowercasing the name. Later values replace earlier
    /// ones, matching HTTP semantics for the single-valued headers we read.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `Host` header.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.get("host")
    }

    /// `x-adcp-tenant` header.
    #[must_use]
    pub fn tenant_header(&self) -> Option<&str> {
        self.get("x-adcp-tenant")
    }

    /// `Apx-Incoming-Host` — the edge proxy's original-host rewrite.
    #[must_use]
    pub fn apx_incoming_host(&self) -> Option<&str> {
        self.get("apx-incoming-host")
    }

    /// Extract the bearer credential.
    ///
    /// `Authorization: Bearer <token>` is preferred; `x-adcp-auth: <token>`
    /// is accepted for MCP clients that historically send it.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        if let Some(auth) = self.get("authorization") {
            let auth = auth.trim();
            if let Some(token) = auth.strip_prefix("Bearer ") {
                return Some(token.trim());
            }
        }
        self.get("x-adcp-auth").map(str::trim)
    }

    /// Number of distinct header names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no headers are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(lowercased-name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<N: AsRef<str>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
