use crate::model::TagData;
use serde::{Deserialize, Serialize};

/// One record of the host's native option list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostOption {
    pub value: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub data: TagData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Part of the selection captured at load time (restored by reset).
    #[serde(default, skip_deserializing)]
    pub initial: bool,
}

impl HostOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
            selected: false,
            data: TagData::new(),
            group: None,
            initial: false,
        }
    }

    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn in_group(mut self, label: impl Into<String>) -> Self {
        self.group = Some(label.into());
        self
    }

    pub fn with_data(mut self, data: TagData) -> Self {
        self.data = data;
        self
    }
}

/// Ordered list of chosen options. `order` holds indices into `options` in
/// selection order; the same option index never appears twice.
#[derive(Debug, Clone)]
pub struct SelectionModel {
    options: Vec<HostOption>,
    order: Vec<usize>,
    initial: Vec<usize>,
    multiple: bool,
    max: usize,
}

impl SelectionModel {
    /// Options flagged `selected` (with a non-empty value) become both the
    /// current and the initial selection. A missing label falls back to the
    /// value. A single-valued host keeps only
    /// the last one, as a native single select would.
    pub fn new(mut options: Vec<HostOption>, multiple: bool, max: usize) -> Self {
        let mut order: Vec<usize> = Vec::new();
        for (idx, option) in options.iter_mut().enumerate() {
            if option.label.is_empty() {
                option.label = option.value.clone();
            }
            if !option.selected {
                continue;
            }
            if option.value.is_empty() {
                option.selected = false;
                continue;
            }
            order.push(idx);
        }
        if !multiple && order.len() > 1 {
            let keep = order.pop();
            for idx in order.drain(..) {
                options[idx].selected = false;
            }
            order.extend(keep);
        }
        for idx in &order {
            options[*idx].initial = true;
        }
        Self {
            options,
            initial: order.clone(),
            order,
            multiple,
            max,
        }
    }

    pub fn options(&self) -> &[HostOption] {
        &self.options
    }

    pub fn option(&self, idx: usize) -> Option<&HostOption> {
        self.options.get(idx)
    }

    pub fn selected(&self) -> Vec<&HostOption> {
        self.order.iter().map(|idx| &self.options[*idx]).collect()
    }

    pub fn selected_values(&self) -> Vec<String> {
        self.order
            .iter()
            .map(|idx| self.options[*idx].value.clone())
            .collect()
    }

    pub fn available_values(&self) -> Vec<String> {
        self.options.iter().map(|o| o.value.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn is_single(&self) -> bool {
        !self.multiple
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_max_reached(&self) -> bool {
        self.max > 0 && self.order.len() >= self.max
    }

    /// Looks at the first option carrying `label`, as the native list would.
    pub fn is_label_selected(&self, label: &str) -> bool {
        self.options
            .iter()
            .find(|option| option.label == label)
            .map(|option| option.selected)
            .unwrap_or(false)
    }

    /// Backing option for an add. With `allow_same` only a free duplicate
    /// with the same label qualifies (the last one in the list); otherwise
    /// the first option carrying the value.
    pub fn find_for_add(&self, value: &str, label: &str, allow_same: bool) -> Option<usize> {
        if allow_same {
            return self
                .options
                .iter()
                .rposition(|o| o.value == value && o.label == label && !o.selected);
        }
        self.options.iter().position(|o| o.value == value)
    }

    pub fn push_option(&mut self, option: HostOption) -> usize {
        self.options.push(option);
        self.options.len() - 1
    }

    pub fn option_mut(&mut self, idx: usize) -> Option<&mut HostOption> {
        self.options.get_mut(idx)
    }

    /// Returns false when the option is unknown or already selected.
    pub fn select(&mut self, idx: usize) -> bool {
        let Some(option) = self.options.get_mut(idx) else {
            return false;
        };
        if option.selected && self.order.contains(&idx) {
            return false;
        }
        option.selected = true;
        self.order.push(idx);
        true
    }

    /// Deselects the most recently selected entry carrying `value`.
    pub fn deselect_value(&mut self, value: &str) -> Option<usize> {
        let pos = self
            .order
            .iter()
            .rposition(|idx| self.options[*idx].value == value)?;
        let idx = self.order.remove(pos);
        self.options[idx].selected = false;
        Some(idx)
    }

    /// Value of the newest selection whose option is not disabled.
    pub fn last_removable_value(&self) -> Option<String> {
        self.order
            .iter()
            .rev()
            .map(|idx| &self.options[*idx])
            .find(|option| !option.disabled)
            .map(|option| option.value.clone())
    }

    /// Deselects everything, returning the removed values in selection order.
    pub fn clear(&mut self) -> Vec<String> {
        let removed: Vec<usize> = self.order.drain(..).collect();
        removed
            .into_iter()
            .map(|idx| {
                self.options[idx].selected = false;
                self.options[idx].value.clone()
            })
            .collect()
    }

    /// Adds the option to the snapshot `restore_initial` goes back to. A
    /// single-valued host keeps one initial option at most.
    pub fn mark_initial(&mut self, idx: usize) {
        if idx >= self.options.len() {
            return;
        }
        if !self.multiple {
            for old in self.initial.drain(..) {
                self.options[old].initial = false;
            }
        }
        self.options[idx].initial = true;
        if !self.initial.contains(&idx) {
            self.initial.push(idx);
        }
    }

    /// Replaces the current selection with the initial snapshot, in its
    /// original order.
    pub fn restore_initial(&mut self) {
        self.clear();
        let initial = self.initial.clone();
        for idx in initial {
            self.select(idx);
        }
    }

    pub fn initial_values(&self) -> Vec<String> {
        self.initial
            .iter()
            .map(|idx| self.options[*idx].value.clone())
            .collect()
    }
}
