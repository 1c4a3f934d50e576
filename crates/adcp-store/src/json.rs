// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON column normalization.
//!
//! Every JSON-typed column goes through exactly one of these functions on the
//! way in, so models only ever hold validated values. Array columns accept a
//! list or a JSON-string serialization of one; object columns collapse the
//! literal string `"null"` to null.

use adcp_core::FormatRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Normalization failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum JsonFieldError {
    /// The value was a string that did not parse as JSON.
    #[error("{field} must be valid JSON")]
    InvalidJson {
        /// Offending column.
        field: &'static str,
    },
    /// The value parsed but had the wrong shape.
    #[error("{field} must be {expected}")]
    WrongShape {
        /// Offending column.
        field: &'static str,
        /// What the column requires.
        expected: &'static str,
    },
    /// A semantic constraint failed (e.g. empty comment text).
    #[error("{field}: {reason}")]
    Constraint {
        /// Offending column.
        field: &'static str,
        /// What went wrong.
        reason: String,
    },
}

/// Parse a JSON-string wrapper if present.
fn unwrap_string(value: Value, field: &'static str) -> Result<Value, JsonFieldError> {
    match value {
        Value::String(s) => {
            if s == "null" {
                return Ok(Value::Null);
            }
            serde_json::from_str(&s).map_err(|_| JsonFieldError::InvalidJson { field })
        }
        other => Ok(other),
    }
}

/// Normalize an array column to a list of strings.
pub fn ensure_string_array(value: Value, field: &'static str) -> Result<Vec<String>, JsonFieldError> {
    match unwrap_string(value, field)? {
        Value::Null => Ok(vec![]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(JsonFieldError::WrongShape {
                    field,
                    expected: "a list of strings",
                }),
            })
            .collect(),
        _ => Err(JsonFieldError::WrongShape {
            field,
            expected: "a list",
        }),
    }
}

/// Normalize an object column; `null` and `"null"` collapse to `None`.
pub fn ensure_object(
    value: Value,
    field: &'static str,
) -> Result<Option<Map<String, Value>>, JsonFieldError> {
    match unwrap_string(value, field)? {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        _ => Err(JsonFieldError::WrongShape {
            field,
            expected: "an object",
        }),
    }
}

/// Normalize `format_ids`: a list of `{agent_url, id}` references.
///
/// Bare id strings are accepted; entries with no usable id are skipped with a
/// warning rather than failing the row (deletion paths trip this validator on
/// rows that predate the reference shape).
pub fn normalize_format_refs(value: Value, field: &'static str) -> Result<Vec<FormatRef>, JsonFieldError> {
    let items = match unwrap_string(value, field)? {
        Value::Null => return Ok(vec![]),
        Value::Array(items) => items,
        _ => {
            warn!(field, "expected a list for format references");
            return Ok(vec![]);
        }
    };

    let mut refs = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<FormatRef>(item.clone()) {
            Ok(r) if !r.id.trim().is_empty() => refs.push(r),
            Ok(_) => warn!(field, "skipping format reference with empty id"),
            Err(_) => warn!(field, ?item, "skipping malformed format reference"),
        }
    }
    Ok(refs)
}

/// One workflow-step comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Who commented.
    pub user: String,
    /// When.
    pub timestamp: DateTime<Utc>,
    /// The comment text.
    pub text: String,
}

/// Normalize `comments`: a list of well-formed comment objects. Empty `user`
/// or `text` rejects the entry.
pub fn normalize_comments(value: Value, field: &'static str) -> Result<Vec<Comment>, JsonFieldError> {
    let items = match unwrap_string(value, field)? {
        Value::Null => return Ok(vec![]),
        Value::Array(items) => items,
        _ => {
            return Err(JsonFieldError::WrongShape {
                field,
                expected: "a list",
            })
        }
    };

    let mut comments = Vec::with_capacity(items.len());
    for item in items {
        let comment: Comment =
            serde_json::from_value(item).map_err(|e| JsonFieldError::Constraint {
                field,
                reason: format!("each comment must be an object with user, timestamp, text: {e}"),
            })?;
        if comment.user.trim().is_empty() || comment.text.trim().is_empty() {
            return Err(JsonFieldError::Constraint {
                field,
                reason: "comment user and text cannot be empty".to_string(),
            });
        }
        comments.push(Comment {
            user: comment.user.trim().to_string(),
            timestamp: comment.timestamp,
            text: comment.text.trim().to_string(),
        });
    }
    Ok(comments)
}

/// Normalize `platform_mappings`: an object with at least one platform entry.
pub fn normalize_platform_mappings(
    value: Value,
    field: &'static str,
) -> Result<Map<String, Value>, JsonFieldError> {
    let map = ensure_object(value, field)?.ok_or(JsonFieldError::WrongShape {
        field,
        expected: "an object (not null)",
    })?;

    let has_platform = map.values().any(|v| !v.is_null());
    if !has_platform {
        return Err(JsonFieldError::Constraint {
            field,
            reason: "at least one platform mapping is required".to_string(),
        });
    }
    Ok(map)
}

/// Normalize `publisher_properties`: a list of objects.
pub fn normalize_publisher_properties(
    value: Value,
    field: &'static str,
) -> Result<Vec<Map<String, Value>>, JsonFieldError> {
    let items = match unwrap_string(value, field)? {
        Value::Null => return Ok(vec![]),
        Value::Array(items) => items,
        _ => {
            return Err(JsonFieldError::WrongShape {
                field,
                expected: "a list",
            })
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(map),
            _ => Err(JsonFieldError::WrongShape {
                field,
                expected: "a list of objects",
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_serialized_array_normalizes_to_list() {
        let out = ensure_string_array(json!("[\"a\",\"b\"]"), "authorized_emails").unwrap();
        assert_eq!(out, vec!["a", "b"]);
    }

    #[test]
    fn null_array_defaults_to_empty() {
        assert_eq!(
            ensure_string_array(Value::Null, "authorized_domains").unwrap(),
            Vec::<String>::new()
        );
    }

    #[test]
    fn non_list_array_column_rejected() {
        let err = ensure_string_array(json!({"a": 1}), "authorized_emails").unwrap_err();
        assert!(matches!(err, JsonFieldError::WrongShape { .. }));
    }

    #[test]
    fn null_string_collapses_to_none_object() {
        assert_eq!(ensure_object(json!("null"), "request_data").unwrap(), None);
    }

    #[test]
    fn format_refs_accept_objects_and_strings() {
        let out = normalize_format_refs(
            json!([
                {"agent_url": "https://fmt.example.com", "id": "video_15s"},
                "display_300x250",
            ]),
            "format_ids",
        )
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].id, "video_15s");
        assert_eq!(out[1], FormatRef::local("display_300x250"));
    }

    #[test]
    fn format_refs_skip_invalid_entries() {
        let out = normalize_format_refs(
            json!([{"agent_url": "https://x"}, "", 42, "ok_id"]),
            "format_ids",
        )
        .unwrap();
        assert_eq!(out, vec![FormatRef::local("ok_id")]);
    }

    #[test]
    fn every_persisted_format_list_is_a_whole_list() {
        // Round-tripping a two-element list must keep both elements; a
        // historical bug updated only element 0.
        let refs = normalize_format_refs(json!(["a", "b"]), "format_ids").unwrap();
        let wire = serde_json::to_value(&refs).unwrap();
        let back = normalize_format_refs(wire, "format_ids").unwrap();
        assert_eq!(back.len(), 2);
    }

    #[test]
    fn comments_reject_empty_text() {
        let err = normalize_comments(
            json!([{"user": "reviewer", "timestamp": "2026-01-01T00:00:00Z", "text": "  "}]),
            "comments",
        )
        .unwrap_err();
        assert!(matches!(err, JsonFieldError::Constraint { .. }));
    }

    #[test]
    fn comments_trim_whitespace() {
        let out = normalize_comments(
            json!([{"user": " reviewer ", "timestamp": "2026-01-01T00:00:00Z", "text": " ok "}]),
            "comments",
        )
        .unwrap();
        assert_eq!(out[0].user, "reviewer");
        assert_eq!(out[0].text, "ok");
    }

    #[test]
    fn platform_mappings_require_a_platform() {
        let err = normalize_platform_mappings(json!({}), "platform_mappings").unwrap_err();
        assert!(matches!(err, JsonFieldError::Constraint { .. }));

        let ok = normalize_platform_mappings(
            json!({"mock": {"advertiser_id": "adv_1"}}),
            "platform_mappings",
        )
        .unwrap();
        assert!(ok.contains_key("mock"));
    }

    #[test]
    fn platform_mappings_null_rejected() {
        let err = normalize_platform_mappings(Value::Null, "platform_mappings").unwrap_err();
        assert!(matches!(err, JsonFieldError::WrongShape { .. }));
    }

    #[test]
    fn publisher_properties_must_be_objects() {
        let err =
            normalize_publisher_properties(json!(["bare string"]), "publisher_properties").unwrap_err();
        assert!(matches!(err, JsonFieldError::WrongShape { .. }));
    }
}
