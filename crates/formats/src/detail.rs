use serde::Serialize;
use serde_json::{Map, Value};

/// How a feature presents itself when clicked.
///
/// Decided once when the feature is decoded: a non-empty `url` property makes
/// the feature `Linked` (opened in an external detail panel), everything else
/// is `Inline` (popup with name and optional image).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureDetail {
    Linked {
        url: String,
        name: Option<String>,
    },
    Inline {
        name: Option<String>,
        image: Option<String>,
    },
}

impl FeatureDetail {
    pub fn from_properties(properties: &Map<String, Value>) -> Self {
        let name = string_property(properties, "name");
        match string_property(properties, "url") {
            Some(url) => FeatureDetail::Linked { url, name },
            None => FeatureDetail::Inline {
                name,
                image: string_property(properties, "image"),
            },
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FeatureDetail::Linked { name, .. } | FeatureDetail::Inline { name, .. } => {
                name.as_deref()
            }
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            FeatureDetail::Linked { url, .. } => Some(url),
            FeatureDetail::Inline { .. } => None,
        }
    }
}

fn string_property(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
