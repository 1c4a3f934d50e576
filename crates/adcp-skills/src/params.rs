// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parameter normalization applied before a skill handler sees a request.
//!
//! Older buyers send several historical shapes; normalization keeps the
//! handlers on the current contract only:
//!
//! - `media_buy_id` (singular) is lifted into `media_buy_ids`;
//! - the legacy `updates.packages` wrapper is flattened into `packages`
//!   (the `updates` key itself never reaches a handler or an adapter);
//! - `custom_targeting` is accepted as an alias for `targeting_overlay`;
//! - A2A data parts may wrap parameters in `input` (spec) or `parameters`
//!   (legacy).

use serde_json::{Map, Value};

/// Unwrap an A2A skill-invocation data part: `{skill, input|parameters}`.
/// Returns `(skill_name, parameters)` when the part is an explicit skill
/// invocation.
#[must_use]
pub fn explicit_skill_invocation(data: &Value) -> Option<(String, Value)> {
    let obj = data.as_object()?;
    let skill = obj.get("skill")?.as_str()?.to_string();
    let params = obj
        .get("input")
        .or_else(|| obj.get("parameters"))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    Some((skill, params))
}

/// Normalize a skill's parameters. Unknown skills pass through untouched.
#[must_use]
pub fn normalize(skill_name: &str, params: Value) -> Value {
    let Value::Object(mut obj) = params else {
        return params;
    };

    match skill_name {
        "get_media_buy_delivery" => {
            // Lift the legacy singular id into the plural field.
            if !obj.contains_key("media_buy_ids") {
                if let Some(single) = obj.remove("media_buy_id") {
                    if !single.is_null() {
                        obj.insert("media_buy_ids".to_string(), Value::Array(vec![single]));
                    }
                }
            } else {
                obj.remove("media_buy_id");
            }
        }
        "update_media_buy" => {
            // Flatten the legacy `updates` wrapper; nothing downstream may
            // ever see it.
            if let Some(mut updates) = obj.remove("updates").and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            }) {
                if !obj.contains_key("packages") {
                    if let Some(packages) = updates.remove("packages") {
                        obj.insert("packages".to_string(), packages);
                    }
                }
            }
        }
        "create_media_buy" => {
            if !obj.contains_key("targeting_overlay") {
                if let Some(targeting) = obj.remove("custom_targeting") {
                    obj.insert("targeting_overlay".to_string(), targeting);
                }
            } else {
                obj.remove("custom_targeting");
            }
        }
        _ => {}
    }

    Value::Object(obj)
}
