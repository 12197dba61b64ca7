//! Normalized suggestion data.
//!
//! Server payloads, static `items` config and host options all end up as
//! [`Item`]s, optionally nested under a [`Group`].

use crate::constants::fields;
use crate::utils::coerce::{value_to_bool, value_to_string};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Free-form metadata carried by an item or option (badge style, title, ...).
pub type TagData = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub data: TagData,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<usize>,
    /// Raw values of the configured search fields.
    #[serde(skip)]
    pub search_values: Vec<String>,
}

impl Item {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            value: value.into(),
            search_values: vec![label.clone()],
            label,
            disabled: false,
            data: TagData::new(),
            selected: false,
            group_id: None,
        }
    }

    pub fn with_data(mut self, data: TagData) -> Self {
        self.data = data;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.data.get(fields::TITLE).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: usize,
    pub label: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry {
    Group(Group),
    Item(Item),
}

/// Which keys of a raw suggestion object hold the value, the label and
/// the searchable text.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMapping {
    pub value_field: String,
    pub label_field: String,
    pub search_fields: Vec<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            value_field: fields::VALUE.to_string(),
            label_field: fields::LABEL.to_string(),
            search_fields: vec![fields::LABEL.to_string()],
        }
    }
}

impl FieldMapping {
    /// Returns `None` for objects without a usable value.
    pub fn item_from_value(&self, raw: &Value, group_id: Option<usize>) -> Option<Item> {
        let obj = raw.as_object()?;
        let value = obj.get(&self.value_field).and_then(value_to_string)?;
        if value.is_empty() {
            return None;
        }
        let label = obj
            .get(&self.label_field)
            .and_then(value_to_string)
            .unwrap_or_else(|| value.clone());

        let mut data = TagData::new();
        if let Some(Value::Object(raw_data)) = obj.get(fields::DATA) {
            for (key, val) in raw_data {
                if let Some(text) = value_to_string(val) {
                    data.insert(key.clone(), text);
                }
            }
        }

        let mut item = Item {
            value,
            label,
            disabled: obj.get(fields::DISABLED).map(value_to_bool).unwrap_or(false),
            data,
            selected: obj.get(fields::SELECTED).map(value_to_bool).unwrap_or(false),
            group_id,
            search_values: Vec::new(),
        };
        item.search_values = self.search_values(&item, raw);
        Some(item)
    }

    pub fn search_values(&self, item: &Item, raw: &Value) -> Vec<String> {
        let mut out = Vec::with_capacity(self.search_fields.len());
        for field in &self.search_fields {
            let found = match field.as_str() {
                fields::LABEL => Some(item.label.clone()),
                fields::VALUE => Some(item.value.clone()),
                other => raw
                    .get(other)
                    .and_then(value_to_string)
                    .or_else(|| item.data.get(other).cloned()),
            };
            if let Some(text) = found {
                out.push(text);
            }
        }
        if out.is_empty() {
            out.push(item.label.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_from_value_uses_custom_fields() {
        let mapping = FieldMapping {
            value_field: "id".to_string(),
            label_field: "name".to_string(),
            search_fields: vec!["name".to_string(), "email".to_string()],
        };
        let raw = json!({"id": 7, "name": "Ada", "email": "ada@example.com", "data": {"badgeStyle": "info"}});
        let item = mapping.item_from_value(&raw, Some(2)).expect("item");
        assert_eq!(item.value, "7");
        assert_eq!(item.label, "Ada");
        assert_eq!(item.group_id, Some(2));
        assert_eq!(item.data.get("badgeStyle").map(String::as_str), Some("info"));
        assert_eq!(item.search_values, vec!["Ada", "ada@example.com"]);
    }

    #[test]
    fn item_without_value_is_skipped() {
        let mapping = FieldMapping::default();
        assert!(mapping.item_from_value(&json!({"label": "No value"}), None).is_none());
        assert!(mapping.item_from_value(&json!({"value": "", "label": "Empty"}), None).is_none());
        assert!(mapping.item_from_value(&json!("plain"), None).is_none());
    }

    #[test]
    fn label_defaults_to_value() {
        let item = FieldMapping::default()
            .item_from_value(&json!({"value": "x", "selected": "1"}), None)
            .expect("item");
        assert_eq!(item.label, "x");
        assert!(item.selected);
    }
}
