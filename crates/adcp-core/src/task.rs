// SPDX-License-Identifier: MIT OR Apache-2.0
//! A2A task, artifact, and push-notification wire types.
//!
//! These follow the A2A JSON-RPC object shapes. Field names that appear on
//! the wire (`contextId`, `artifactId`, `messageId`, ...) are fixed by the
//! protocol and mapped via serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Task state
// ---------------------------------------------------------------------------

/// Lifecycle state of an A2A task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// The handler is executing.
    Working,
    /// Deferred pending approval or background work. Carries no artifacts.
    Submitted,
    /// The agent needs more input from the buyer.
    InputRequired,
    /// All requested skills produced a result.
    Completed,
    /// Every requested skill failed.
    Failed,
    /// Cancelled via `tasks/cancel`.
    Canceled,
}

impl TaskState {
    /// Terminal states receive a full `Task` webhook payload; intermediate
    /// states receive a `TaskStatusUpdateEvent`.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Wire string for this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Submitted => "submitted",
            Self::InputRequired => "input-required",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// Status block embedded in a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    /// Current state.
    pub state: TaskState,
    /// When the state was entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl TaskStatus {
    /// Status stamped with the current time.
    #[must_use]
    pub fn now(state: TaskState) -> Self {
        Self {
            state,
            timestamp: Some(Utc::now()),
        }
    }
}

// ---------------------------------------------------------------------------
// Parts and artifacts
// ---------------------------------------------------------------------------

/// One part of a message or artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    /// Human-readable text.
    Text {
        /// The text content.
        text: String,
    },
    /// Structured payload.
    Data {
        /// The structured content.
        data: Value,
    },
}

impl Part {
    /// The text content, when this is a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            Part::Data { .. } => None,
        }
    }

    /// The structured content, when this is a data part.
    #[must_use]
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Part::Data { data } => Some(data),
            Part::Text { .. } => None,
        }
    }
}

/// A named result attached to a completed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable identifier within the task.
    #[serde(rename = "artifactId")]
    pub artifact_id: String,
    /// Display name (e.g. `"get_products_result"`).
    pub name: String,
    /// Optional text part followed by the required data part.
    pub parts: Vec<Part>,
}

impl Artifact {
    /// Build an artifact with an optional human-readable text part and a
    /// required data part, the A2A TextPart + DataPart convention.
    #[must_use]
    pub fn from_result(
        artifact_id: impl Into<String>,
        name: impl Into<String>,
        text: Option<String>,
        data: Value,
    ) -> Self {
        let mut parts = Vec::with_capacity(2);
        if let Some(text) = text {
            parts.push(Part::Text { text });
        }
        parts.push(Part::Data { data });
        Self {
            artifact_id: artifact_id.into(),
            name: name.into(),
            parts,
        }
    }

    /// First data part, if any.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.parts.iter().find_map(Part::as_data)
    }
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// Protocol-level async operation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: String,
    /// Conversation correlation id.
    #[serde(rename = "contextId")]
    pub context_id: String,
    /// Always `"task"`.
    pub kind: String,
    /// Current status.
    pub status: TaskStatus,
    /// Results. Must be absent while the task is `submitted`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,
    /// Invocation metadata: requested skills, invocation type, push config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Task {
    /// New task in `working` state.
    #[must_use]
    pub fn working(id: impl Into<String>, context_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            context_id: context_id.into(),
            kind: "task".to_string(),
            status: TaskStatus::now(TaskState::Working),
            artifacts: None,
            metadata: None,
        }
    }

    /// Append an artifact.
    pub fn push_artifact(&mut self, artifact: Artifact) {
        self.artifacts.get_or_insert_with(Vec::new).push(artifact);
    }

    /// Transition to `submitted` and drop any artifacts, per the A2A rule
    /// that pending tasks carry none.
    pub fn mark_submitted(&mut self) {
        self.status = TaskStatus::now(TaskState::Submitted);
        self.artifacts = None;
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Inbound A2A message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id. Older buyers send numbers; deserialization coerces them.
    #[serde(
        rename = "messageId",
        default,
        deserialize_with = "deserialize_lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_id: Option<String>,
    /// Conversation id, when the buyer is continuing one.
    #[serde(rename = "contextId", default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    /// `"user"` or `"agent"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text and/or data parts.
    #[serde(default)]
    pub parts: Vec<Value>,
}

/// Accept a string or a number and yield a string.
pub fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "id must be a string or number, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Push notification configs
// ---------------------------------------------------------------------------

/// Authentication block on a push-notification config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushAuthenticationInfo {
    /// Auth schemes in preference order; `schemes[0]` is used on send.
    pub schemes: Vec<String>,
    /// Credential string for the selected scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
}

/// Buyer-registered webhook endpoint for async replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotificationConfig {
    /// Config identifier, generated when the buyer omits one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Delivery URL.
    pub url: String,
    /// Buyer-supplied validation token, echoed on delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Optional authentication for the delivery request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<PushAuthenticationInfo>,
}

/// A2A `tasks/pushNotificationConfig/*` response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPushNotificationConfig {
    /// Task id the config applies to; `"*"` for principal-wide configs.
    #[serde(rename = "taskId")]
    pub task_id: String,
    /// The config itself.
    #[serde(rename = "pushNotificationConfig")]
    pub push_notification_config: PushNotificationConfig,
}

// ---------------------------------------------------------------------------
// Webhook payloads
// ---------------------------------------------------------------------------

/// Intermediate-state webhook payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusUpdateEvent {
    /// Always `"status-update"`.
    pub kind: String,
    /// Task identifier.
    #[serde(rename = "taskId")]
    pub task_id: String,
    /// Conversation id.
    #[serde(rename = "contextId")]
    pub context_id: String,
    /// New status.
    pub status: TaskStatus,
    /// Whether this is the last update for the task.
    #[serde(rename = "final")]
    pub is_final: bool,
    /// Skill-specific result payload, when one exists at this point.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

/// Push-notification body: a full [`Task`] for terminal states, a
/// [`TaskStatusUpdateEvent`] for intermediate ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WebhookPayload {
    /// Terminal: the complete task with its result artifact.
    Task(Task),
    /// Intermediate: a status-update event.
    StatusUpdate(TaskStatusUpdateEvent),
}

/// Select and build the correct webhook payload shape for a state change.
///
/// Terminal states (`completed`, `failed`, `canceled`) produce the full
/// `Task`; `result` becomes a `result` artifact. On `failed`, callers merge
/// the error into `result` under `"error"` before calling this. Intermediate
/// states produce a `TaskStatusUpdateEvent` carrying `result` inline.
#[must_use]
pub fn webhook_payload(
    task_id: &str,
    context_id: &str,
    state: TaskState,
    result: Option<Value>,
) -> WebhookPayload {
    if state.is_terminal() {
        let mut task = Task {
            id: task_id.to_string(),
            context_id: context_id.to_string(),
            kind: "task".to_string(),
            status: TaskStatus::now(state),
            artifacts: None,
            metadata: None,
        };
        if let Some(result) = result {
            task.push_artifact(Artifact::from_result("result", "result", None, result));
        }
        WebhookPayload::Task(task)
    } else {
        WebhookPayload::StatusUpdate(TaskStatusUpdateEvent {
            kind: "status-update".to_string(),
            task_id: task_id.to_string(),
            context_id: context_id.to_string(),
            status: TaskStatus::now(state),
            is_final: false,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_state_wire_strings() {
        assert_eq!(serde_json::to_string(&TaskState::Working).unwrap(), "\"working\"");
        assert_eq!(
            serde_json::to_string(&TaskState::InputRequired).unwrap(),
            "\"input-required\""
        );
        assert_eq!(serde_json::to_string(&TaskState::Canceled).unwrap(), "\"canceled\"");
    }

    #[test]
    fn terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Canceled.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::InputRequired.is_terminal());
    }

    #[test]
    fn mark_submitted_drops_artifacts() {
        let mut task = Task::working("task_1", "ctx_1");
        task.push_artifact(Artifact::from_result("a1", "r", None, json!({"x": 1})));
        task.mark_submitted();
        assert_eq!(task.status.state, TaskState::Submitted);
        assert!(task.artifacts.is_none());
    }

    #[test]
    fn artifact_text_part_precedes_data_part() {
        let artifact = Artifact::from_result(
            "a1",
            "get_products_result",
            Some("Found 3 products".to_string()),
            json!({"products": []}),
        );
        assert_eq!(artifact.parts.len(), 2);
        assert_eq!(artifact.parts[0].as_text(), Some("Found 3 products"));
        assert!(artifact.parts[1].as_data().is_some());
    }

    #[test]
    fn message_id_coerced_from_number() {
        let msg: Message = serde_json::from_value(json!({
            "messageId": 42,
            "parts": [],
        }))
        .unwrap();
        assert_eq!(msg.message_id.as_deref(), Some("42"));
    }

    #[test]
    fn message_id_string_passes_through() {
        let msg: Message = serde_json::from_value(json!({"messageId": "m-1", "parts": []})).unwrap();
        assert_eq!(msg.message_id.as_deref(), Some("m-1"));
    }

    #[test]
    fn terminal_webhook_payload_is_task_with_matching_id() {
        let payload = webhook_payload("task_9", "ctx_9", TaskState::Completed, Some(json!({"ok": true})));
        match payload {
            WebhookPayload::Task(task) => {
                assert_eq!(task.id, "task_9");
                let artifacts = task.artifacts.expect("result artifact");
                assert_eq!(artifacts[0].data(), Some(&json!({"ok": true})));
            }
            WebhookPayload::StatusUpdate(_) => panic!("terminal state must produce a Task"),
        }
    }

    #[test]
    fn intermediate_webhook_payload_is_status_update() {
        let payload = webhook_payload("task_9", "ctx_9", TaskState::Submitted, None);
        match payload {
            WebhookPayload::StatusUpdate(ev) => {
                assert_eq!(ev.task_id, "task_9");
                assert_eq!(ev.status.state, TaskState::Submitted);
                assert!(!ev.is_final);
            }
            WebhookPayload::Task(_) => panic!("intermediate state must produce a status update"),
        }
    }

    #[test]
    fn push_config_roundtrip() {
        let config = PushNotificationConfig {
            id: Some("pnc_1".into()),
            url: "https://buyer.example.com/hooks".into(),
            token: Some("validate-me".into()),
            authentication: Some(PushAuthenticationInfo {
                schemes: vec!["Bearer".into()],
                credentials: Some("secret".into()),
            }),
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: PushNotificationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
