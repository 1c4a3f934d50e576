// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! AdCP protocol contract.
//!
//! This crate defines the wire types shared by every other crate in the
//! workspace: the request/response pair for each AdCP skill, the A2A task
//! and push-notification objects, the transport error taxonomy, the
//! case-insensitive header abstraction, and the per-request context that
//! flows through the dispatcher into skill handlers.
//!
//! Nothing here touches the network or a database.

pub mod context;
pub mod creatives;
pub mod discovery;
pub mod error;
pub mod format;
pub mod headers;
pub mod manifest;
pub mod media_buy;
pub mod performance;
pub mod products;
pub mod task;

pub use context::{MinimalContext, ToolContext};
pub use error::{AdcpError, ErrorKind, SkillResult, TransportError};
pub use format::FormatRef;
pub use headers::Headers;
pub use manifest::{BrandManifest, FlightStart};
pub use task::{
    Artifact, Message, Part, PushAuthenticationInfo, PushNotificationConfig, Task,
    TaskPushNotificationConfig, TaskState, TaskStatus, TaskStatusUpdateEvent, WebhookPayload,
    webhook_payload,
};

/// AdCP protocol version implemented by this agent.
pub const ADCP_VERSION: &str = "2.5.0";

/// Protocols this agent supports, advertised in the agent-card extension.
pub const PROTOCOLS_SUPPORTED: &[&str] = &["media_buy"];
