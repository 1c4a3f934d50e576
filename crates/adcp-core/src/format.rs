// SPDX-License-Identifier: MIT OR Apache-2.0
//! Creative-format references.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Reference to a creative format: the authoring agent's URL plus the format
/// id within that agent.
///
/// Buyers and older stored rows sometimes send a bare id string or a legacy
/// `format_id` key; both are accepted and normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FormatRef {
    /// URL of the agent that defines the format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_url: Option<String>,
    /// Format identifier within the agent.
    pub id: String,
}

impl FormatRef {
    /// Local reference (no agent URL).
    pub fn local(id: impl Into<String>) -> Self {
        Self {
            agent_url: None,
            id: id.into(),
        }
    }

    /// Fully qualified reference.
    pub fn new(agent_url: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            agent_url: Some(agent_url.into()),
            id: id.into(),
        }
    }
}

impl<'de> Deserialize<'de> for FormatRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(id) => Ok(FormatRef::local(id)),
            Value::Object(map) => {
                let id = map
                    .get("id")
                    .or_else(|| map.get("format_id"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        serde::de::Error::custom("format reference object requires an 'id'")
                    })?;
                let agent_url = map
                    .get("agent_url")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(FormatRef {
                    agent_url,
                    id: id.to_string(),
                })
            }
            other => Err(serde::de::Error::custom(format!(
                "format reference must be a string or object, got {other}"
            ))),
        }
    }
}
