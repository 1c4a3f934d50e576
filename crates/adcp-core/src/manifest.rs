// SPDX-License-Identifier: MIT OR Apache-2.0
//! Brand manifest and flight-start normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ---------------------------------------------------------------------------
// BrandManifest
// ---------------------------------------------------------------------------

/// The buyer's brand identification.
///
/// On the wire this is either an object `{"name": ..., "url": ...}` or a bare
/// URL string; the string form is normalized to `{url, name: <domain>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandManifest {
    /// Brand display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Brand site URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl BrandManifest {
    /// Manifest with a name only.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: None,
        }
    }

    /// Normalize a bare URL into a manifest, deriving the name from the
    /// domain portion.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self {
            name: Some(domain_of(url).to_string()),
            url: Some(url.to_string()),
        }
    }

    /// True when neither name nor url is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.url.is_none()
    }
}

fn domain_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    rest.split(['/', ':', '?']).next().unwrap_or(rest)
}

impl<'de> Deserialize<'de> for BrandManifest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(url) => Ok(BrandManifest::from_url(&url)),
            Value::Object(map) => {
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let url = map.get("url").and_then(Value::as_str).map(str::to_string);
                Ok(BrandManifest { name, url })
            }
            other => Err(serde::de::Error::custom(format!(
                "brand_manifest must be an object or URL string, got {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// FlightStart
// ---------------------------------------------------------------------------

/// Flight start: the literal `"asap"` or an RFC-3339 timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStart {
    /// Start as soon as the buy is live.
    Asap,
    /// Start at the given instant.
    At(DateTime<Utc>),
}

impl FlightStart {
    /// Resolve to a concrete instant, treating `asap` as `now`.
    #[must_use]
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            FlightStart::Asap => now,
            FlightStart::At(t) => *t,
        }
    }

    /// True when the flight has started as of `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.resolve(now) <= now
    }
}

impl Serialize for FlightStart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            FlightStart::Asap => serializer.serialize_str("asap"),
            FlightStart::At(t) => serializer.serialize_str(&t.to_rfc3339()),
        }
    }
}

impl<'de> Deserialize<'de> for FlightStart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        if raw.eq_ignore_ascii_case("asap") {
            return Ok(FlightStart::Asap);
        }
        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|e| {
            serde::de::Error::custom(format!("start_time must be \"asap\" or RFC-3339: {e}"))
        })?;
        Ok(FlightStart::At(parsed.with_timezone(&Utc)))
    }
}
