// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool definitions: one MCP tool per AdCP skill.
//!
//! The input schemas mirror the skill request contracts exactly; they are
//! authored documents, not generated.

use crate::protocol::McpTool;
use serde_json::{json, Value};

fn format_ref_schema() -> Value {
    json!({
        "oneOf": [
            {"type": "string"},
            {
                "type": "object",
                "properties": {
                    "agent_url": {"type": "string"},
                    "id": {"type": "string"},
                },
                "required": ["id"],
            },
        ],
    })
}

fn brand_manifest_schema() -> Value {
    json!({
        "oneOf": [
            {"type": "string", "description": "Brand site URL"},
            {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "url": {"type": "string"},
                },
            },
        ],
    })
}

fn push_config_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "url": {"type": "string"},
            "token": {"type": "string"},
            "authentication": {
                "type": "object",
                "properties": {
                    "schemes": {"type": "array", "items": {"type": "string"}},
                    "credentials": {"type": "string"},
                },
            },
        },
        "required": ["url"],
    })
}

/// The full tool list, in skill-name order.
#[must_use]
pub fn tool_definitions() -> Vec<McpTool> {
    vec![
        McpTool {
            name: "create_media_buy".into(),
            description: "Create an advertising campaign from packages, flight window, and budget"
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "brand_manifest": brand_manifest_schema(),
                    "packages": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "buyer_ref": {"type": "string"},
                                "product_id": {"type": "string"},
                                "pricing_option_id": {"type": "string"},
                                "budget": {"type": "number"},
                                "targeting_overlay": {"type": "object"},
                                "creative_ids": {"type": "array", "items": {"type": "string"}},
                            },
                            "required": ["buyer_ref", "product_id", "pricing_option_id", "budget"],
                        },
                        "minItems": 1,
                    },
                    "start_time": {
                        "type": "string",
                        "description": "\"asap\" or an RFC-3339 timestamp",
                    },
                    "end_time": {"type": "string", "format": "date-time"},
                    "budget": {"type": "number", "description": "Legacy total; package budgets are authoritative"},
                    "po_number": {"type": "string"},
                    "buyer_ref": {"type": "string"},
                    "targeting_overlay": {"type": "object"},
                    "push_notification_config": push_config_schema(),
                    "reporting_webhook": {
                        "type": "object",
                        "properties": {
                            "url": {"type": "string"},
                            "interval_seconds": {"type": "integer"},
                        },
                        "required": ["url"],
                    },
                    "context": {},
                },
                "required": ["brand_manifest", "packages", "start_time", "end_time"],
            }),
        },
        McpTool {
            name: "get_media_buy_delivery".into(),
            description: "Get delivery metrics for media buys; all filters optional".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "media_buy_ids": {"type": "array", "items": {"type": "string"}},
                    "media_buy_id": {"type": "string", "description": "Legacy singular form"},
                    "buyer_refs": {"type": "array", "items": {"type": "string"}},
                    "status_filter": {"type": "string"},
                    "start_date": {"type": "string", "format": "date"},
                    "end_date": {"type": "string", "format": "date"},
                    "context": {},
                },
            }),
        },
        McpTool {
            name: "get_products".into(),
            description: "Discover advertising products by brief and/or brand manifest".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "brief": {"type": "string"},
                    "brand_manifest": brand_manifest_schema(),
                    "filters": {
                        "type": "object",
                        "properties": {
                            "delivery_type": {"type": "string"},
                            "format_types": {"type": "array", "items": {"type": "string"}},
                            "format_ids": {"type": "array", "items": format_ref_schema()},
                            "is_fixed_price": {"type": "boolean"},
                        },
                    },
                    "min_exposures": {"type": "integer"},
                    "adcp_version": {"type": "string"},
                    "strategy_id": {"type": "string"},
                    "context": {},
                },
            }),
        },
        McpTool {
            name: "list_authorized_properties".into(),
            description: "List publisher domains this agent is authorized to sell".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "context": {},
                },
            }),
        },
        McpTool {
            name: "list_creative_formats".into(),
            description: "List creative format specifications".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "type": {"type": "string"},
                    "format_ids": {"type": "array", "items": format_ref_schema()},
                    "is_responsive": {"type": "boolean"},
                    "name_search": {"type": "string"},
                    "min_width": {"type": "integer"},
                    "max_width": {"type": "integer"},
                    "min_height": {"type": "integer"},
                    "max_height": {"type": "integer"},
                    "context": {},
                },
            }),
        },
        McpTool {
            name: "list_creatives".into(),
            description: "Search the caller's creative library".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "media_buy_id": {"type": "string"},
                    "buyer_ref": {"type": "string"},
                    "status": {"type": "string", "enum": ["pending_review", "approved", "rejected"]},
                    "format": {"type": "string"},
                    "tags": {"type": "array", "items": {"type": "string"}},
                    "created_after": {"type": "string", "format": "date-time"},
                    "created_before": {"type": "string", "format": "date-time"},
                    "search": {"type": "string"},
                    "page": {"type": "integer", "minimum": 1},
                    "limit": {"type": "integer", "minimum": 1},
                    "sort_by": {"type": "string"},
                    "sort_order": {"type": "string", "enum": ["asc", "desc"]},
                    "context": {},
                },
            }),
        },
        McpTool {
            name: "sync_creatives".into(),
            description: "Full-upsert creatives into the library, with optional package assignment"
                .into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "creatives": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "creative_id": {"type": "string"},
                                "buyer_ref": {"type": "string"},
                                "name": {"type": "string"},
                                "format_id": format_ref_schema(),
                                "media_url": {"type": "string"},
                                "snippet": {"type": "string"},
                                "click_url": {"type": "string"},
                                "tags": {"type": "array", "items": {"type": "string"}},
                            },
                            "required": ["name", "format_id"],
                        },
                    },
                    "creative_ids": {"type": "array", "items": {"type": "string"}},
                    "assignments": {
                        "type": "object",
                        "additionalProperties": {"type": "array", "items": {"type": "string"}},
                    },
                    "delete_missing": {"type": "boolean", "default": false},
                    "dry_run": {"type": "boolean", "default": false},
                    "validation_mode": {"type": "string", "enum": ["strict", "lenient"]},
                    "push_notification_config": push_config_schema(),
                    "context": {},
                },
                "required": ["creatives"],
            }),
        },
        McpTool {
            name: "update_media_buy".into(),
            description: "Update a media buy by media_buy_id or buyer_ref (exactly one)".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "media_buy_id": {"type": "string"},
                    "buyer_ref": {"type": "string"},
                    "paused": {"type": "boolean"},
                    "start_time": {"type": "string"},
                    "end_time": {"type": "string", "format": "date-time"},
                    "budget": {"type": "number"},
                    "packages": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "package_id": {"type": "string"},
                                "buyer_ref": {"type": "string"},
                                "budget": {"type": "number"},
                                "paused": {"type": "boolean"},
                                "creative_ids": {"type": "array", "items": {"type": "string"}},
                            },
                        },
                    },
                    "push_notification_config": push_config_schema(),
                    "context": {},
                },
            }),
        },
        McpTool {
            name: "update_performance_index".into(),
            description: "Submit buyer performance feedback for a media buy".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "media_buy_id": {"type": "string"},
                    "performance_data": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "product_id": {"type": "string"},
                                "performance_index": {"type": "number"},
                                "confidence_score": {"type": "number"},
                            },
                            "required": ["product_id", "performance_index"],
                        },
                    },
                    "context": {},
                },
                "required": ["media_buy_id", "performance_data"],
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tools_cover_all_nine_skills() {
        let names: Vec<String> = tool_definitions().iter().map(|t| t.name.clone()).collect();
        assert_eq!(
            names,
            vec![
                "create_media_buy",
                "get_media_buy_delivery",
                "get_products",
                "list_authorized_properties",
                "list_creative_formats",
                "list_creatives",
                "sync_creatives",
                "update_media_buy",
                "update_performance_index",
            ]
        );
    }

    #[test]
    fn create_media_buy_schema_requires_spec_fields() {
        let tools = tool_definitions();
        let create = tools.iter().find(|t| t.name == "create_media_buy").unwrap();
        let required = create.input_schema["required"].as_array().unwrap();
        for field in ["brand_manifest", "packages", "start_time", "end_time"] {
            assert!(required.iter().any(|r| r == field), "missing {field}");
        }
        // Budget is accepted but not required at the top level.
        assert!(!required.iter().any(|r| r == "budget"));
    }

    #[test]
    fn delivery_schema_accepts_both_id_forms() {
        let tools = tool_definitions();
        let delivery = tools
            .iter()
            .find(|t| t.name == "get_media_buy_delivery")
            .unwrap();
        let props = delivery.input_schema["properties"].as_object().unwrap();
        assert!(props.contains_key("media_buy_ids"));
        assert!(props.contains_key("media_buy_id"));
    }
}
