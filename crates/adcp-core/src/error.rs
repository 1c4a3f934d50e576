// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error taxonomy for the sales agent.
//!
//! Two disjoint families exist:
//!
//! - [`TransportError`] — the request never produced an AdCP response. These
//!   surface as JSON-RPC errors (A2A) or tool errors (MCP) and carry a stable
//!   snake_case code.
//! - [`AdcpError`] — a domain-level failure that lives *inside* a response's
//!   `errors` array. The skill is considered invoked; the task still
//!   completes.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Transport error kinds
// ---------------------------------------------------------------------------

/// Classification of transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No token was presented for a skill that requires one.
    MissingAuthentication,
    /// The token is unknown, or belongs to a different tenant.
    InvalidAuthToken,
    /// A request field is missing or ill-typed.
    InvalidParams,
    /// The skill or RPC method does not exist.
    MethodNotFound,
    /// The principal does not own the targeted entity.
    PermissionDenied,
    /// The entity (task, push config, media buy) does not exist.
    NotFound,
    /// The database circuit breaker is open; the call failed fast.
    DatabaseUnhealthy,
    /// Anything unexpected. Always logged.
    InternalError,
}

impl ErrorKind {
    /// Stable machine-readable code string.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingAuthentication => "missing_authentication",
            Self::InvalidAuthToken => "invalid_auth_token",
            Self::InvalidParams => "invalid_params",
            Self::MethodNotFound => "method_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::DatabaseUnhealthy => "database_unhealthy",
            Self::InternalError => "internal_error",
        }
    }

    /// JSON-RPC 2.0 error code for this kind.
    ///
    /// `-32601`/`-32602`/`-32603` are the codes JSON-RPC reserves; the
    /// remaining kinds use the implementation-defined `-32000..-32099` band.
    #[must_use]
    pub fn json_rpc_code(&self) -> i64 {
        match self {
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::MissingAuthentication => -32001,
            Self::InvalidAuthToken => -32002,
            Self::PermissionDenied => -32003,
            Self::NotFound => -32004,
            Self::DatabaseUnhealthy => -32005,
        }
    }

    /// HTTP status used when the error is surfaced on a plain REST endpoint.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingAuthentication => 401,
            Self::InvalidAuthToken => 401,
            Self::InvalidParams => 400,
            Self::MethodNotFound => 404,
            Self::PermissionDenied => 403,
            Self::NotFound => 404,
            Self::DatabaseUnhealthy => 503,
            Self::InternalError => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// A transport-level failure: the skill was never (successfully) invoked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TransportError {
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable message. Multi-tenant routing failures include the
    /// resolved tenant id and a token prefix so operators can diagnose them.
    pub message: String,
}

impl TransportError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// No token on a non-discovery skill.
    pub fn missing_authentication() -> Self {
        Self::new(
            ErrorKind::MissingAuthentication,
            "missing authentication token: provide Authorization: Bearer <token> or x-adcp-auth",
        )
    }

    /// Token unknown, or scoped to a different tenant. `tenant` is the tenant
    /// resolved from headers (or `"any"` for a global lookup) and
    /// `token_prefix` the first characters of the offending token.
    pub fn invalid_auth_token(tenant: &str, token_prefix: &str) -> Self {
        Self::new(
            ErrorKind::InvalidAuthToken,
            format!("invalid authentication token (token: {token_prefix}..., tenant: {tenant})"),
        )
    }

    /// Missing or ill-typed request field(s).
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams, message)
    }

    /// Unknown skill or RPC method.
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotFound, message)
    }

    /// The caller does not own the targeted entity.
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Entity does not exist.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Circuit breaker open.
    pub fn database_unhealthy(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseUnhealthy, message)
    }

    /// Unexpected failure.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InternalError, message)
    }
}

/// Convenience result alias used by skill handlers and the dispatcher.
pub type SkillResult<T> = Result<T, TransportError>;

// ---------------------------------------------------------------------------
// AdcpError — domain-level, carried inside responses
// ---------------------------------------------------------------------------

/// A per-item AdCP failure reported inside a response's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdcpError {
    /// Machine-readable code (e.g. `"validation_error"`, `"adapter_error"`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured context (field names, adapter codes, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AdcpError {
    /// Create an error with no details.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attach structured details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// A request-level AdCP validation failure.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("validation_error", message)
    }

    /// The ad server rejected or failed the operation. `adapter_code` is the
    /// adapter's own error identifier, preserved for the buyer.
    pub fn adapter_error(adapter_code: &str, message: impl Into<String>) -> Self {
        Self::new("adapter_error", message)
            .with_details(serde_json::json!({ "adapter_code": adapter_code }))
    }
}

impl fmt::Display for AdcpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_stable() {
        assert_eq!(ErrorKind::MissingAuthentication.code(), "missing_authentication");
        assert_eq!(ErrorKind::InvalidAuthToken.code(), "invalid_auth_token");
        assert_eq!(ErrorKind::InvalidParams.code(), "invalid_params");
        assert_eq!(ErrorKind::MethodNotFound.code(), "method_not_found");
        assert_eq!(ErrorKind::PermissionDenied.code(), "permission_denied");
        assert_eq!(ErrorKind::NotFound.code(), "not_found");
        assert_eq!(ErrorKind::DatabaseUnhealthy.code(), "database_unhealthy");
        assert_eq!(ErrorKind::InternalError.code(), "internal_error");
    }

    #[test]
    fn json_rpc_codes_use_reserved_values_where_defined() {
        assert_eq!(ErrorKind::MethodNotFound.json_rpc_code(), -32601);
        assert_eq!(ErrorKind::InvalidParams.json_rpc_code(), -32602);
        assert_eq!(ErrorKind::InternalError.json_rpc_code(), -32603);
    }

    #[test]
    fn server_error_codes_stay_in_implementation_band() {
        for kind in [
            ErrorKind::MissingAuthentication,
            ErrorKind::InvalidAuthToken,
            ErrorKind::PermissionDenied,
            ErrorKind::NotFound,
            ErrorKind::DatabaseUnhealthy,
        ] {
            let code = kind.json_rpc_code();
            assert!((-32099..=-32000).contains(&code), "{kind:?} -> {code}");
        }
    }

    #[test]
    fn invalid_auth_token_names_tenant_and_token_prefix() {
        let err = TransportError::invalid_auth_token("tenant_acme", "tok_12345");
        assert!(err.message.contains("tenant_acme"));
        assert!(err.message.contains("tok_12345"));
        assert_eq!(err.kind, ErrorKind::InvalidAuthToken);
    }

    #[test]
    fn adcp_error_serializes_without_null_details() {
        let err = AdcpError::validation_error("missing packages");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "validation_error");
        assert!(json.get("details").is_none());
    }

    #[test]
    fn adapter_error_carries_adapter_code() {
        let err = AdcpError::adapter_error("LINE_ITEM_REJECTED", "rejected by ad server");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["details"]["adapter_code"], "LINE_ITEM_REJECTED");
    }

    #[test]
    fn transport_error_display_includes_code() {
        let err = TransportError::permission_denied("media buy mb_1 belongs to another principal");
        assert!(err.to_string().starts_with("permission_denied:"));
    }
}
