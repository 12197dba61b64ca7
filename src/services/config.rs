use crate::constants::{fields, host, limits, network, server};
use crate::errors::TagsError;
use crate::model::FieldMapping;
use crate::utils::coerce::{parse_bool, split_list, to_camel_case, value_to_string};
use crate::utils::merge::merge_deep;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub items: Option<Value>,
    pub allow_new: bool,
    pub show_all_suggestions: bool,
    pub badge_style: String,
    pub allow_clear: bool,
    pub selected: Vec<String>,
    pub regex: String,
    pub separator: Vec<String>,
    pub max: usize,
    pub placeholder: String,
    pub keep_open: bool,
    pub allow_same: bool,
    pub add_on_blur: bool,
    pub show_disabled: bool,
    pub suggestions_threshold: usize,
    pub maximum_items: usize,
    pub autoselect_first: bool,
    pub update_on_select: bool,
    pub highlight_typed: bool,
    pub fuzzy: bool,
    pub starts_with: bool,
    pub label_field: String,
    pub value_field: String,
    pub search_fields: Vec<String>,
    pub query_param: String,
    pub server: String,
    pub server_method: String,
    pub server_params: Map<String, Value>,
    pub server_data_key: String,
    pub live_server: bool,
    pub no_cache: bool,
    pub debounce_time: u64,
    pub not_found_message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            items: None,
            allow_new: false,
            show_all_suggestions: false,
            badge_style: "primary".to_string(),
            allow_clear: false,
            selected: Vec::new(),
            regex: String::new(),
            separator: Vec::new(),
            max: 0,
            placeholder: String::new(),
            keep_open: false,
            allow_same: false,
            add_on_blur: false,
            show_disabled: false,
            suggestions_threshold: limits::SUGGESTIONS_THRESHOLD,
            maximum_items: 0,
            autoselect_first: true,
            update_on_select: false,
            highlight_typed: false,
            fuzzy: false,
            starts_with: false,
            label_field: fields::LABEL.to_string(),
            value_field: fields::VALUE.to_string(),
            search_fields: vec![fields::LABEL.to_string()],
            query_param: server::QUERY_PARAM.to_string(),
            server: String::new(),
            server_method: network::DEFAULT_METHOD.to_string(),
            server_params: Map::new(),
            server_data_key: server::DATA_KEY.to_string(),
            live_server: false,
            no_cache: true,
            debounce_time: server::DEBOUNCE_MS,
            not_found_message: String::new(),
        }
    }
}

impl Config {
    /// Defaults, then constructor arguments, then host data attributes,
    /// then the `data-config` JSON blob. Later layers win.
    pub fn resolve(args: &Value, dataset: &BTreeMap<String, String>) -> Result<Self, TagsError> {
        let mut attributes = Map::new();
        let mut blob = Value::Null;
        for (key, raw) in dataset {
            let key = to_camel_case(key.strip_prefix("data-").unwrap_or(key));
            if key == host::CONFIG_ATTRIBUTE {
                blob = serde_json::from_str(raw).map_err(|err| {
                    TagsError::invalid_config(format!("data-config is not valid JSON: {}", err))
                })?;
                continue;
            }
            attributes.insert(key, Value::String(raw.clone()));
        }

        let args = normalize_keys(args);
        let merged = merge_deep(&args, &Value::Object(attributes));
        let merged = merge_deep(&merged, &normalize_keys(&blob));

        let mut config = Config::default();
        if let Value::Object(map) = merged {
            for (key, value) in map.iter() {
                config.apply_value(key, value)?;
            }
        }
        Ok(config)
    }

    pub fn from_args(args: &Value) -> Result<Self, TagsError> {
        Self::resolve(args, &BTreeMap::new())
    }

    /// Sets one option. Unknown keys are ignored; null leaves the current
    /// value in place.
    pub fn apply_value(&mut self, key: &str, value: &Value) -> Result<(), TagsError> {
        if value.is_null() {
            return Ok(());
        }
        match key {
            "items" => self.items = Some(as_json(key, value)?),
            "allowNew" => self.allow_new = as_bool(key, value)?,
            "showAllSuggestions" => self.show_all_suggestions = as_bool(key, value)?,
            "badgeStyle" => self.badge_style = as_string(key, value)?,
            "allowClear" => self.allow_clear = as_bool(key, value)?,
            "selected" => self.selected = as_list(key, value)?,
            "regex" => self.regex = as_string(key, value)?,
            "separator" => self.separator = as_list(key, value)?,
            "max" => self.max = as_usize(key, value)?,
            "placeholder" => self.placeholder = as_string(key, value)?,
            "keepOpen" => self.keep_open = as_bool(key, value)?,
            "allowSame" => self.allow_same = as_bool(key, value)?,
            "addOnBlur" => self.add_on_blur = as_bool(key, value)?,
            "showDisabled" => self.show_disabled = as_bool(key, value)?,
            "suggestionsThreshold" => self.suggestions_threshold = as_usize(key, value)?,
            "maximumItems" => self.maximum_items = as_usize(key, value)?,
            "autoselectFirst" => self.autoselect_first = as_bool(key, value)?,
            "updateOnSelect" => self.update_on_select = as_bool(key, value)?,
            "highlightTyped" => self.highlight_typed = as_bool(key, value)?,
            "fuzzy" => self.fuzzy = as_bool(key, value)?,
            "startsWith" => self.starts_with = as_bool(key, value)?,
            "labelField" => self.label_field = as_string(key, value)?,
            "valueField" => self.value_field = as_string(key, value)?,
            "searchFields" => self.search_fields = as_list(key, value)?,
            "queryParam" => self.query_param = as_string(key, value)?,
            "server" => self.server = as_string(key, value)?,
            "serverMethod" => {
                let method = as_string(key, value)?.trim().to_uppercase();
                if !network::ALLOWED_METHODS.contains(&method.as_str()) {
                    return Err(TagsError::invalid_config(format!(
                        "serverMethod: expected one of {}",
                        network::ALLOWED_METHODS.join(", ")
                    )));
                }
                self.server_method = method;
            }
            "serverParams" => self.server_params = as_object(key, value)?,
            "serverDataKey" => self.server_data_key = as_string(key, value)?,
            "liveServer" => self.live_server = as_bool(key, value)?,
            "noCache" => self.no_cache = as_bool(key, value)?,
            "debounceTime" => self.debounce_time = as_usize(key, value)? as u64,
            "notFoundMessage" => self.not_found_message = as_string(key, value)?,
            _ => {}
        }
        Ok(())
    }

    pub fn field_mapping(&self) -> FieldMapping {
        let mut search_fields = self.search_fields.clone();
        if search_fields.is_empty() {
            search_fields.push(fields::LABEL.to_string());
        }
        FieldMapping {
            value_field: self.value_field.clone(),
            label_field: self.label_field.clone(),
            search_fields,
        }
    }

    pub fn has_server(&self) -> bool {
        !self.server.trim().is_empty()
    }

    pub fn is_separator(&self, ch: char) -> bool {
        self.separator
            .iter()
            .any(|sep| sep.chars().count() == 1 && sep.starts_with(ch))
    }
}

fn normalize_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, val)| (to_camel_case(key), val.clone()))
                .collect(),
        ),
        _ => Value::Object(Map::new()),
    }
}

fn invalid(key: &str, expected: &str) -> TagsError {
    TagsError::invalid_config(format!("{}: expected {}", key, expected))
}

fn as_bool(key: &str, value: &Value) -> Result<bool, TagsError> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => Ok(number.as_f64().map(|n| n != 0.0).unwrap_or(false)),
        Value::String(text) => parse_bool(text).ok_or_else(|| invalid(key, "a boolean")),
        _ => Err(invalid(key, "a boolean")),
    }
}

fn as_usize(key: &str, value: &Value) -> Result<usize, TagsError> {
    let parsed = match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) if text.trim().is_empty() => Some(0),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed
        .map(|n| n.max(0) as usize)
        .ok_or_else(|| invalid(key, "an integer"))
}

fn as_string(key: &str, value: &Value) -> Result<String, TagsError> {
    match value {
        Value::Object(_) | Value::Array(_) => Err(invalid(key, "a string")),
        other => Ok(value_to_string(other).unwrap_or_default()),
    }
}

fn as_list(key: &str, value: &Value) -> Result<Vec<String>, TagsError> {
    match value {
        Value::String(text) => Ok(split_list(text)),
        Value::Array(items) => Ok(items.iter().filter_map(value_to_string).collect()),
        Value::Number(_) | Value::Bool(_) => Ok(value_to_string(value).into_iter().collect()),
        _ => Err(invalid(key, "a list")),
    }
}

fn as_object(key: &str, value: &Value) -> Result<Map<String, Value>, TagsError> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::String(text) if text.trim().is_empty() => Ok(Map::new()),
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(invalid(key, "a JSON object")),
        },
        _ => Err(invalid(key, "an object")),
    }
}

fn as_json(key: &str, value: &Value) -> Result<Value, TagsError> {
    match value {
        Value::String(text) => serde_json::from_str(text).map_err(|_| invalid(key, "JSON data")),
        Value::Array(_) | Value::Object(_) => Ok(value.clone()),
        _ => Err(invalid(key, "an array or object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_widget_defaults() {
        let config = Config::default();
        assert_eq!(config.suggestions_threshold, 1);
        assert!(config.autoselect_first);
        assert!(config.no_cache);
        assert_eq!(config.debounce_time, 300);
        assert_eq!(config.query_param, "query");
        assert_eq!(config.server_data_key, "data");
        assert_eq!(config.search_fields, vec!["label"]);
    }

    #[test]
    fn dataset_overrides_args_and_blob_overrides_dataset() {
        let args = json!({"allowNew": false, "max": 2, "badgeStyle": "info"});
        let mut dataset = BTreeMap::new();
        dataset.insert("allow-new".to_string(), "1".to_string());
        dataset.insert("max".to_string(), "5".to_string());
        dataset.insert("config".to_string(), r#"{"max": 7}"#.to_string());

        let config = Config::resolve(&args, &dataset).expect("config");
        assert!(config.allow_new);
        assert_eq!(config.max, 7);
        assert_eq!(config.badge_style, "info");
    }

    #[test]
    fn list_attributes_split_on_pipe_or_comma() {
        let mut dataset = BTreeMap::new();
        dataset.insert("separator".to_string(), " |,".to_string());
        dataset.insert("selected".to_string(), "a,b".to_string());
        let config = Config::resolve(&Value::Null, &dataset).expect("config");
        assert_eq!(config.separator, vec![" ", ","]);
        assert_eq!(config.selected, vec!["a", "b"]);
        assert!(config.is_separator(','));
        assert!(!config.is_separator(';'));
    }

    #[test]
    fn single_comma_separator_is_kept() {
        let config = Config::resolve(&json!({"separator": ","}), &BTreeMap::new()).expect("config");
        assert_eq!(config.separator, vec![","]);
        assert!(config.is_separator(','));
    }

    #[test]
    fn server_params_accept_json_strings() {
        let mut dataset = BTreeMap::new();
        dataset.insert("serverParams".to_string(), r#"{"related":"country"}"#.to_string());
        let config = Config::resolve(&json!({"server_method": "post"}), &dataset).expect("config");
        assert_eq!(config.server_params.get("related"), Some(&json!("country")));
        assert_eq!(config.server_method, "POST");
    }

    #[test]
    fn malformed_values_name_the_key() {
        let err = Config::from_args(&json!({"max": "lots"})).expect_err("invalid");
        assert!(err.message.contains("max"));
        let err = Config::from_args(&json!({"allowSame": "sometimes"})).expect_err("invalid");
        assert!(err.message.contains("allowSame"));
        let err = Config::from_args(&json!({"serverMethod": "DELETE"})).expect_err("invalid");
        assert!(err.message.contains("serverMethod"));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let config = Config::from_args(&json!({"bootstrapVersion": 5, "fixed": true})).expect("config");
        assert_eq!(config, Config::default());
    }
}
