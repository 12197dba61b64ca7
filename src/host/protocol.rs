use crate::errors::TagsError;
use crate::host::element::HostSelect;
use crate::host::events::UiEvent;
use crate::host::view::TagsView;
use crate::managers::hooks::Notification;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request line: `{"id": "...", "op": "...", ...}`.
#[derive(Debug, Deserialize)]
pub struct DriverRequest {
    pub id: String,
    #[serde(flatten)]
    pub op: DriverOp,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DriverOp {
    Bind {
        element: HostSelect,
        #[serde(default)]
        config: Value,
    },
    Event {
        event: UiEvent,
    },
    View,
    SetData {
        data: Value,
        #[serde(default)]
        init: bool,
    },
    Dispose,
}

#[derive(Debug, Serialize)]
pub struct DriverResponse {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view: Option<TagsView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TagsError>,
}

impl DriverResponse {
    pub fn success(id: impl Into<String>, view: Option<TagsView>, notifications: Vec<Notification>) -> Self {
        Self {
            id: id.into(),
            ok: true,
            view,
            notifications,
            error: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: TagsError) -> Self {
        Self {
            id: id.into(),
            ok: false,
            view: None,
            notifications: Vec::new(),
            error: Some(error),
        }
    }

    pub fn to_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_flattened_op() {
        let raw = r#"{"id":"tags","op":"event","event":{"type":"query_changed","text":"ab"}}"#;
        let parsed: DriverRequest = serde_json::from_str(raw).expect("must parse");
        assert_eq!(parsed.id, "tags");
        match parsed.op {
            DriverOp::Event { event } => {
                assert_eq!(event, UiEvent::QueryChanged { text: "ab".to_string() })
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn bind_defaults_config_and_element_tag() {
        let raw = r#"{"id":"tags","op":"bind","element":{"id":"tags","multiple":true}}"#;
        let parsed: DriverRequest = serde_json::from_str(raw).expect("must parse");
        match parsed.op {
            DriverOp::Bind { element, config } => {
                assert!(element.is_select());
                assert!(element.multiple);
                assert!(config.is_null());
            }
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn failure_omits_view_and_notifications() {
        let line = DriverResponse::failure("x", TagsError::invalid_config("max: expected an integer")).to_line();
        let value: Value = serde_json::from_str(&line).expect("json");
        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["kind"], "invalid_config");
        assert!(value.get("view").is_none());
        assert!(value.get("notifications").is_none());
    }
}
