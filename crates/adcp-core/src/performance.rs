// SPDX-License-Identifier: MIT OR Apache-2.0
//! `update_performance_index` contract.

use crate::error::AdcpError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Buyer-observed performance for one product within a media buy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPerformance {
    /// The product being scored.
    pub product_id: String,
    /// Relative performance index; `1.0` is baseline.
    pub performance_index: f64,
    /// Buyer's confidence in the index, `0.0..=1.0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

/// `update_performance_index` request.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpdatePerformanceIndexRequest {
    /// The media buy the feedback applies to.
    pub media_buy_id: String,
    /// Per-product indices.
    pub performance_data: Vec<ProductPerformance>,
    /// Opaque buyer correlation payload, echoed back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

/// `update_performance_index` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePerformanceIndexResponse {
    /// `"accepted"` on success.
    pub status: String,
    /// Domain-level failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<AdcpError>,
    /// Echo of the request `context`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl UpdatePerformanceIndexResponse {
    /// Accepted-feedback response.
    #[must_use]
    pub fn accepted(context: Option<Value>) -> Self {
        Self {
            status: "accepted".to_string(),
            errors: vec![],
            context,
        }
    }
}

impl fmt::Display for UpdatePerformanceIndexResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Performance feedback {}", self.status)
    }
}
