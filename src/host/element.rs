use crate::constants::host;
use crate::services::selection::HostOption;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_tag() -> String {
    host::SELECT_TAG.to_string()
}

/// Snapshot of the element an instance binds to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSelect {
    #[serde(default = "default_tag")]
    pub tag: String,
    /// The driver fills this in from the request id when left empty.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub options: Vec<HostOption>,
    /// `data-*` attributes, with or without the prefix.
    #[serde(default)]
    pub dataset: BTreeMap<String, String>,
    /// Current values of other inputs on the page, keyed by element id.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl HostSelect {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            tag: default_tag(),
            id: id.into(),
            multiple: false,
            disabled: false,
            readonly: false,
            placeholder: None,
            options: Vec::new(),
            dataset: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn option(mut self, option: HostOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn data(mut self, key: &str, value: &str) -> Self {
        self.dataset.insert(key.to_string(), value.to_string());
        self
    }

    pub fn field(mut self, id: &str, value: &str) -> Self {
        self.fields.insert(id.to_string(), value.to_string());
        self
    }

    pub fn is_select(&self) -> bool {
        self.tag.trim().eq_ignore_ascii_case(host::SELECT_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let element: HostSelect = serde_json::from_str(
            r#"{"id": "tags", "options": [{"value": "a", "label": "A", "selected": true}]}"#,
        )
        .expect("element");
        assert!(element.is_select());
        assert!(!element.multiple);
        assert!(element.options[0].selected);
        assert!(!element.options[0].initial);
    }

    #[test]
    fn other_tags_are_not_selects() {
        let mut element = HostSelect::new("x");
        element.tag = "input".to_string();
        assert!(!element.is_select());
        element.tag = "SELECT".to_string();
        assert!(element.is_select());
    }
}
