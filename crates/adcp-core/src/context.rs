// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-request context passed to every skill handler.

use crate::headers::Headers;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Context carried through a single skill invocation.
///
/// Built by the dispatcher after tenant resolution and authentication. For
/// discovery skills invoked without credentials, `principal_id` is `None`.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Conversation correlation id (buyer-supplied or generated).
    pub context_id: String,
    /// The resolved tenant.
    pub tenant_id: String,
    /// The authenticated principal, when one exists.
    pub principal_id: Option<String>,
    /// Name of the skill being executed.
    pub tool_name: String,
    /// When the request entered the process.
    pub request_timestamp: DateTime<Utc>,
    /// Transport-specific metadata (source, protocol, ...).
    pub metadata: BTreeMap<String, Value>,
    /// Testing-harness context, when the environment is flagged as testing.
    pub testing_context: Option<Value>,
}

impl ToolContext {
    /// Build a context for an authenticated invocation.
    pub fn new(
        context_id: impl Into<String>,
        tenant_id: impl Into<String>,
        principal_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            context_id: context_id.into(),
            tenant_id: tenant_id.into(),
            principal_id: Some(principal_id.into()),
            tool_name: tool_name.into(),
            request_timestamp: Utc::now(),
            metadata: BTreeMap::new(),
            testing_context: None,
        }
    }

    /// Build a context for an unauthenticated discovery invocation.
    pub fn anonymous(
        context_id: impl Into<String>,
        tenant_id: impl Into<String>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            context_id: context_id.into(),
            tenant_id: tenant_id.into(),
            principal_id: None,
            tool_name: tool_name.into(),
            request_timestamp: Utc::now(),
            metadata: BTreeMap::new(),
            testing_context: None,
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// The principal id, or a [`crate::TransportError`]-worthy absence.
    ///
    /// Handlers for non-discovery skills may rely on the dispatcher's
    /// authorization gate and call this for the authenticated principal.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal_id.as_deref()
    }
}

/// Headers-only context for requests that have not authenticated.
///
/// Discovery skills accept this in place of a full [`ToolContext`]: it is
/// sufficient for tenant resolution and nothing else.
#[derive(Debug, Clone, Default)]
pub struct MinimalContext {
    /// The raw request headers.
    pub headers: Headers,
}

impl MinimalContext {
    /// Wrap a header set.
    #[must_use]
    pub fn new(headers: Headers) -> Self {
        Self { headers }
    }
}
