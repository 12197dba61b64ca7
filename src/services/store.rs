use crate::constants::fields;
use crate::model::{Entry, FieldMapping, Group, Item};
use crate::services::selection::HostOption;
use crate::utils::coerce::value_to_string;
use crate::utils::text::normalize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct GroupHeader {
    pub id: usize,
    pub label: String,
}

/// Display order of the store: group headers interleaved with items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Header(usize),
    Item(usize),
}

/// Canonical candidate list. Rebuilt wholesale by `set_data`, never patched.
///
/// Items are addressed by their position in store order; group members
/// keep a `group_id` pointing at their header.
#[derive(Debug, Clone, Default)]
pub struct SuggestionStore {
    items: Vec<Item>,
    search_keys: Vec<Vec<String>>,
    groups: Vec<GroupHeader>,
    layout: Vec<Slot>,
}

impl SuggestionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts an array of items / `{group, items}` objects, or a flat
    /// value→label object (kept in iteration order). Anything else, and any
    /// item without a value, is skipped.
    pub fn set_data(&mut self, source: &Value, mapping: &FieldMapping) {
        self.clear();
        match source {
            Value::Array(entries) => {
                for raw in entries {
                    let group_label = raw
                        .get(fields::GROUP)
                        .and_then(value_to_string)
                        .filter(|label| !label.is_empty());
                    match group_label {
                        Some(label) => {
                            let id = self.open_group(label);
                            let members = raw
                                .get(fields::GROUP_ITEMS)
                                .and_then(Value::as_array)
                                .map(Vec::as_slice)
                                .unwrap_or_default();
                            for member in members {
                                if let Some(item) = mapping.item_from_value(member, Some(id)) {
                                    self.push_item(item);
                                }
                            }
                        }
                        None => {
                            if let Some(item) = mapping.item_from_value(raw, None) {
                                self.push_item(item);
                            }
                        }
                    }
                }
            }
            Value::Object(map) => {
                for (value, label) in map {
                    if value.is_empty() {
                        continue;
                    }
                    let label = value_to_string(label).unwrap_or_else(|| value.clone());
                    let mut item = Item::new(value.clone(), label);
                    item.search_values = mapping.search_values(&item, &Value::Null);
                    self.push_item(item);
                }
            }
            _ => {}
        }
    }

    /// Builds the store from host options: consecutive options sharing a
    /// group label form one group, disabled options only with `show_disabled`.
    pub fn set_from_options(
        &mut self,
        options: &[HostOption],
        show_disabled: bool,
        mapping: &FieldMapping,
    ) {
        self.clear();
        let mut current_group: Option<(String, usize)> = None;
        for option in options {
            if option.value.is_empty() || (option.disabled && !show_disabled) {
                continue;
            }
            let group_id = match &option.group {
                Some(label) => match &current_group {
                    Some((open, id)) if open == label => Some(*id),
                    _ => {
                        let id = self.open_group(label.clone());
                        current_group = Some((label.clone(), id));
                        Some(id)
                    }
                },
                None => {
                    current_group = None;
                    None
                }
            };
            let mut item = Item::new(option.value.clone(), option.label.clone())
                .with_data(option.data.clone())
                .disabled(option.disabled);
            item.group_id = group_id;
            item.search_values = mapping.search_values(&item, &Value::Null);
            self.push_item(item);
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.search_keys.clear();
        self.groups.clear();
        self.layout.clear();
    }

    fn open_group(&mut self, label: String) -> usize {
        // ids start at one so a group id is never confused with "no group"
        let id = self.groups.len() + 1;
        self.groups.push(GroupHeader { id, label });
        self.layout.push(Slot::Header(id));
        id
    }

    fn push_item(&mut self, item: Item) {
        let keys = item.search_values.iter().map(|v| normalize(v)).collect();
        self.layout.push(Slot::Item(self.items.len()));
        self.search_keys.push(keys);
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, pos: usize) -> Option<&Item> {
        self.items.get(pos)
    }

    /// Normalized search fields of the item at `pos`.
    pub fn search_keys(&self, pos: usize) -> &[String] {
        self.search_keys.get(pos).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn groups(&self) -> &[GroupHeader] {
        &self.groups
    }

    pub fn group(&self, id: usize) -> Option<&GroupHeader> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn layout(&self) -> &[Slot] {
        &self.layout
    }

    /// True when some item, grouped or not, carries exactly this label.
    pub fn has_item(&self, label: &str) -> bool {
        self.items.iter().any(|item| item.label == label)
    }

    pub fn position_of(&self, value: &str) -> Option<usize> {
        self.items.iter().position(|item| item.value == value)
    }

    pub fn find_by_value(&self, value: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.value == value)
    }

    /// Rebuilds the nested view handed back by `getData`.
    pub fn entries(&self) -> Vec<Entry> {
        let mut out = Vec::new();
        for slot in &self.layout {
            match *slot {
                Slot::Header(id) => {
                    let label = self.group(id).map(|g| g.label.clone()).unwrap_or_default();
                    let items = self
                        .items
                        .iter()
                        .filter(|item| item.group_id == Some(id))
                        .cloned()
                        .collect();
                    out.push(Entry::Group(Group { id, label, items }));
                }
                Slot::Item(pos) => {
                    if self.items[pos].group_id.is_none() {
                        out.push(Entry::Item(self.items[pos].clone()));
                    }
                }
            }
        }
        out
    }
}
