// SPDX-License-Identifier: MIT OR Apache-2.0
//! Auth-optional discovery contracts: `list_creative_formats` and
//! `list_authorized_properties`.

use crate::error::AdcpError;
use crate::format::FormatRef;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// list_creative_formats
// ---------------------------------------------------------------------------

/// `list_creative_formats` request. All fields optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListCreativeFormatsRequest {
    /// Restrict by format type (`"display"`, `"video"`, `"audio"`, `"native"`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub format_type: Option<String>,
    /// Restrict to specific formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format_ids: Option<Vec<FormatRef>>,
    /// Responsive formats only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_responsive: Option<bool>,
    /// Substring match on format names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_search: Option<String>,
    /// Minimum width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    /// Maximum width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_width: Option<u32>,
    /// Minimum height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<u32>,
    /// Maximum height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// One creative format specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeFormat {
    /// Format reference.
    pub format_id: FormatRef,
    /// Display name.
    pub name: String,
    /// Format type (`"display"`, `"video"`, `"audio"`, `"native"`).
    #[serde(rename = "type")]
    pub format_type: String,
    /// Pixel width for fixed-size formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Pixel height for fixed-size formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Duration in seconds for time-based formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Whether the format adapts to its container.
    #[serde(default)]
    pub is_responsive: bool,
}

/// `list_creative_formats` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListCreativeFormatsResponse {
    /// Matching formats.
    pub formats: Vec<CreativeFormat>,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl fmt::Display for ListCreativeFormatsResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} creative format(s) available", self.formats.len())
    }
}

// ---------------------------------------------------------------------------
// list_authorized_properties
// ---------------------------------------------------------------------------

/// `list_authorized_properties` request.
///
/// The deprecated `tags` input (removed in AdCP 2.5) is tolerated at the
/// serde layer; the handler ignores it and logs a warning.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ListAuthorizedPropertiesRequest {
    /// Deprecated; ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// `list_authorized_properties` response (AdCP v2.4 shape).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAuthorizedPropertiesResponse {
    /// Domains this agent is authorized to sell.
    pub publisher_domains: Vec<String>,
    /// Primary channels (`"web"`, `"ctv"`, ...).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_channels: Vec<String>,
    /// Primary countries (ISO 3166-1 alpha-2).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_countries: Vec<String>,
    /// Publisher portfolio description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portfolio_description: Option<String>,
    /// Advertising policy summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertising_policies: Option<String>,
    /// When the portfolio was last updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
}

impl fmt::Display for ListAuthorizedPropertiesResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Authorized for {} publisher domain(s)",
            self.publisher_domains.len()
        )
    }
}
