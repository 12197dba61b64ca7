use crate::errors::TagsError;
use crate::model::{Item, TagData};
use crate::services::selection::HostOption;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Callbacks a host can plug into an instance. Every method has a no-op
/// default so implementors only override what they need.
pub trait TagsHooks: Send {
    /// Custom validation. Returning false rejects the add and flags the
    /// host invalid.
    fn can_add(&mut self, _text: &str, _data: &TagData, _is_new: bool) -> bool {
        true
    }

    /// Fires once per net selection change with the values after it.
    fn on_change(&mut self, _values: &[String]) {}

    fn on_select_item(&mut self, _item: &Item) {}

    fn on_clear_item(&mut self, _value: &str) {}

    /// A backing option had to be created for this add.
    fn on_create_item(&mut self, _option: &mut HostOption) {}

    fn on_focus(&mut self) {}

    fn on_blur(&mut self, _active: Option<&str>, _input: &str) {}

    /// Chance to reshape a decoded server payload before it is unwrapped.
    fn on_server_response(&mut self, payload: Value) -> Value {
        payload
    }

    fn on_server_error(&mut self, _error: &TagsError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl TagsHooks for NoopHooks {}

/// Host-visible record of a hook invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Change { values: Vec<String> },
    SelectItem { value: String, label: String },
    ClearItem { value: String },
    CreateItem { value: String, label: String },
    Focus,
    Blur { active: Option<String>, input: String },
    ServerError { message: String, kind: String },
}

/// Queues every notification so a driver (or a test) can drain them after
/// each operation. Clones share the queue.
#[derive(Debug, Default, Clone)]
pub struct RecordingHooks {
    queue: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, notification: Notification) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push(notification);
        }
    }

    pub fn drain(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default()
    }

    pub fn changes(&self) -> usize {
        self.queue
            .lock()
            .map(|queue| {
                queue
                    .iter()
                    .filter(|n| matches!(n, Notification::Change { .. }))
                    .count()
            })
            .unwrap_or(0)
    }
}

impl TagsHooks for RecordingHooks {
    fn on_change(&mut self, values: &[String]) {
        self.push(Notification::Change {
            values: values.to_vec(),
        });
    }

    fn on_select_item(&mut self, item: &Item) {
        self.push(Notification::SelectItem {
            value: item.value.clone(),
            label: item.label.clone(),
        });
    }

    fn on_clear_item(&mut self, value: &str) {
        self.push(Notification::ClearItem {
            value: value.to_string(),
        });
    }

    fn on_create_item(&mut self, option: &mut HostOption) {
        self.push(Notification::CreateItem {
            value: option.value.clone(),
            label: option.label.clone(),
        });
    }

    fn on_focus(&mut self) {
        self.push(Notification::Focus);
    }

    fn on_blur(&mut self, active: Option<&str>, input: &str) {
        self.push(Notification::Blur {
            active: active.map(str::to_string),
            input: input.to_string(),
        });
    }

    fn on_server_error(&mut self, error: &TagsError) {
        self.push(Notification::ServerError {
            message: error.message.clone(),
            kind: format!("{:?}", error.kind).to_lowercase(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_hooks_share_their_queue() {
        let hooks = RecordingHooks::new();
        let mut handle = hooks.clone();
        handle.on_change(&["a".to_string()]);
        handle.on_clear_item("a");
        assert_eq!(hooks.changes(), 1);
        assert_eq!(
            hooks.drain(),
            vec![
                Notification::Change {
                    values: vec!["a".to_string()]
                },
                Notification::ClearItem {
                    value: "a".to_string()
                },
            ]
        );
        assert!(hooks.drain().is_empty());
    }

    #[test]
    fn noop_hooks_accept_everything() {
        let mut hooks = NoopHooks;
        assert!(hooks.can_add("x", &TagData::new(), true));
        let payload = serde_json::json!({"data": []});
        assert_eq!(hooks.on_server_response(payload.clone()), payload);
    }
}
