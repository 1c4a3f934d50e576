// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! MCP tool surface for the AdCP skill set.
//!
//! Each skill is registered as a typed MCP tool; replies carry the AdCP
//! response in the structured-content channel and the response's display
//! form as a text block.

pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{CallToolResult, McpTool, ToolContent, MCP_PROTOCOL_VERSION};
pub use server::{build_router, McpState};
pub use tools::tool_definitions;
