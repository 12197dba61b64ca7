//! One bound tags input: the add/remove controller plus the UI state the
//! renderer reflects (query, dropdown, active row, validity).

use crate::constants::{fields, limits};
use crate::errors::TagsError;
use crate::host::element::HostSelect;
use crate::host::events::UiEvent;
use crate::host::view::{HighlightView, SuggestionRow, TagView, TagsView};
use crate::managers::hooks::TagsHooks;
use crate::model::{Entry, Item, TagData};
use crate::services::config::Config;
use crate::services::logger::Logger;
use crate::services::matcher::{self, MatchOptions, MatchResult, Validity};
use crate::services::remote::{FetchOutcome, FetchRequest, RemoteSync, SuggestionFetcher};
use crate::services::selection::{HostOption, SelectionModel};
use crate::services::store::{Slot, SuggestionStore};
use crate::utils::data_path::unwrap_data_key;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// What an instance needs to load server suggestions.
#[derive(Clone)]
pub struct RemoteWiring {
    pub fetcher: Arc<dyn SuggestionFetcher>,
    pub outcomes: UnboundedSender<FetchOutcome>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Next,
    Prev,
}

pub struct TagsInput {
    id: String,
    config: Config,
    regex: Option<Regex>,
    match_opts: MatchOptions,
    disabled: bool,
    readonly: bool,
    placeholder: String,
    fields: BTreeMap<String, String>,
    store: SuggestionStore,
    selection: SelectionModel,
    hooks: Box<dyn TagsHooks>,
    remote: Option<RemoteSync>,
    logger: Logger,
    query: String,
    focused: bool,
    open: bool,
    invalid: bool,
    active: Option<usize>,
    last_match: MatchResult,
    not_found: Option<String>,
    fire_events: bool,
    applied_generation: u64,
}

impl fmt::Debug for TagsInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagsInput")
            .field("id", &self.id)
            .field("selected", &self.selection.selected_values())
            .field("query", &self.query)
            .field("open", &self.open)
            .field("invalid", &self.invalid)
            .finish()
    }
}

fn compile_regex(pattern: &str) -> Result<Option<Regex>, TagsError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Ok(None);
    }
    Regex::new(pattern)
        .map(Some)
        .map_err(|err| TagsError::invalid_config(format!("regex: {}", err)))
}

/// Explicit config, then the host attribute, then the label of a leading
/// empty-valued option (which is never treated as selected).
fn resolve_placeholder(
    config: &Config,
    host_placeholder: Option<String>,
    options: &mut [HostOption],
) -> String {
    if !config.placeholder.is_empty() {
        return config.placeholder.clone();
    }
    if let Some(text) = host_placeholder.filter(|text| !text.is_empty()) {
        return text;
    }
    match options.first_mut() {
        Some(first) if config.autoselect_first && first.value.is_empty() => {
            first.selected = false;
            first.label.clone()
        }
        _ => String::new(),
    }
}

impl TagsInput {
    pub fn new(
        element: HostSelect,
        args: &Value,
        hooks: Box<dyn TagsHooks>,
        remote: Option<RemoteWiring>,
        logger: &Logger,
    ) -> Result<Self, TagsError> {
        if !element.is_select() {
            logger.error(
                "Invalid element",
                Some(&json!({ "id": element.id, "tag": element.tag })),
            );
            return Err(TagsError::invalid_target(format!(
                "Cannot bind to <{}>: expected a select element",
                element.tag
            ))
            .with_details(json!({ "id": element.id })));
        }

        let config = Config::resolve(args, &element.dataset)?;
        let regex = compile_regex(&config.regex)?;
        let logger = logger.child(&element.id);

        let HostSelect {
            id,
            multiple,
            disabled,
            readonly,
            placeholder,
            mut options,
            fields,
            ..
        } = element;
        let placeholder = resolve_placeholder(&config, placeholder, &mut options);

        let remote = if config.has_server() {
            let wiring = remote.ok_or_else(|| {
                TagsError::invalid_config("server: no fetcher is available for remote suggestions")
            })?;
            Some(RemoteSync::new(
                &id,
                wiring.fetcher,
                wiring.outcomes,
                Duration::from_millis(config.debounce_time),
                &logger,
            ))
        } else {
            None
        };

        let mut input = Self {
            selection: SelectionModel::new(options, multiple, config.max),
            match_opts: MatchOptions::from_config(&config),
            id,
            config,
            regex,
            disabled,
            readonly,
            placeholder,
            fields,
            store: SuggestionStore::new(),
            hooks,
            remote,
            logger,
            query: String::new(),
            focused: false,
            open: false,
            invalid: false,
            active: None,
            last_match: MatchResult::default(),
            not_found: None,
            fire_events: true,
            applied_generation: 0,
        };
        input.load_data();
        input.logger.debug(
            "Bound",
            Some(&json!({ "selected": input.selection.selected_values(), "items": input.store.len() })),
        );
        Ok(input)
    }

    fn load_data(&mut self) {
        if self.config.has_server() {
            // live mode loads while typing
            if !self.config.live_server {
                self.load_from_server(false, true);
            }
            return;
        }
        match self.config.items.clone() {
            Some(items) => self.set_data(&items, true),
            None => {
                self.rebuild_from_options();
                for value in self.config.selected.clone() {
                    if let Some(item) = self.store.find_by_value(&value).cloned() {
                        self.seed(&item);
                    }
                }
            }
        }
    }

    /// Rebuilds the store from the host options. The `selected` option only
    /// seeds at bind time, never here.
    pub fn reset_suggestions(&mut self) {
        self.rebuild_from_options();
        self.refresh_open();
    }

    fn rebuild_from_options(&mut self) {
        let mapping = self.config.field_mapping();
        self.store
            .set_from_options(self.selection.options(), self.config.show_disabled, &mapping);
        self.last_match = MatchResult::default();
        self.active = None;
    }

    /// Replaces the store. With `initial`, items flagged `selected` or
    /// listed in the `selected` option become the initial selection
    /// (never in live server mode).
    pub fn set_data(&mut self, source: &Value, initial: bool) {
        self.rebuild(source, initial);
        self.refresh_open();
    }

    fn rebuild(&mut self, source: &Value, initial: bool) {
        self.store.set_data(source, &self.config.field_mapping());
        self.last_match = MatchResult::default();
        self.active = None;
        if initial && !self.config.live_server {
            let seeds: Vec<Item> = self
                .store
                .items()
                .iter()
                .filter(|item| item.selected || self.config.selected.contains(&item.value))
                .cloned()
                .collect();
            for item in seeds {
                self.seed(&item);
            }
        }
    }

    fn seed(&mut self, item: &Item) {
        let previous = std::mem::replace(&mut self.fire_events, false);
        if self.can_add(&item.label, &item.data, false) {
            if let Some(idx) = self.add_item_at(&item.label, Some(&item.value), item.data.clone()) {
                self.selection.mark_initial(idx);
            }
        }
        self.fire_events = previous;
    }

    fn refresh_open(&mut self) {
        if self.open {
            self.show_suggestions();
        }
    }

    fn load_from_server(&mut self, show: bool, initial: bool) {
        let request = FetchRequest::build(&self.config, &self.query, &self.fields);
        if let Some(remote) = self.remote.as_mut() {
            remote.load_now(request, show, initial);
        }
    }

    /// Applies a fetch result addressed to this instance. Outcomes for other
    /// instances and outcomes older than the last applied one are dropped.
    pub fn apply_fetch(&mut self, outcome: FetchOutcome) -> bool {
        if outcome.instance != self.id || outcome.generation <= self.applied_generation {
            return false;
        }
        self.applied_generation = outcome.generation;
        match outcome.result {
            Ok(payload) => {
                let payload = self.hooks.on_server_response(payload);
                let data = unwrap_data_key(payload, &self.config.server_data_key);
                self.rebuild(&data, outcome.initial);
                if outcome.show || self.open {
                    self.show_suggestions();
                }
            }
            Err(err) => {
                // store keeps its last good data
                self.hooks.on_server_error(&err);
            }
        }
        true
    }

    // Add / remove controller

    pub fn can_add(&mut self, text: &str, data: &TagData, is_new: bool) -> bool {
        if text.is_empty() || self.is_disabled() {
            return false;
        }
        if is_new && !self.config.allow_new {
            return false;
        }
        if !is_new && !self.store.has_item(text) {
            return false;
        }
        // single cardinality replaces instead
        if !self.selection.is_single()
            && !self.config.allow_same
            && self.selection.is_label_selected(text)
        {
            return false;
        }
        if self.selection.is_max_reached() {
            return false;
        }
        if is_new {
            if let Some(regex) = &self.regex {
                if !regex.is_match(text) {
                    self.invalid = true;
                    return false;
                }
            }
        }
        if !self.hooks.can_add(text, data, is_new) {
            self.invalid = true;
            return false;
        }
        true
    }

    /// Selects `value` (defaults to `text`), creating a backing option when
    /// none is free. Callers are expected to check `can_add` first.
    pub fn add_item(&mut self, text: &str, value: Option<&str>, data: TagData) -> Option<HostOption> {
        let idx = self.add_item_at(text, value, data)?;
        self.selection.option(idx).cloned()
    }

    fn add_item_at(&mut self, text: &str, value: Option<&str>, data: TagData) -> Option<usize> {
        let value = value.filter(|v| !v.is_empty()).unwrap_or(text).to_string();
        if value.is_empty() {
            return None;
        }
        if self.selection.is_single() {
            // replace without a notification for the removal
            self.selection.clear();
        } else if self.selection.is_max_reached() {
            return None;
        }

        let idx = match self.selection.find_for_add(&value, text, self.config.allow_same) {
            Some(idx) => {
                if self.selection.option(idx).map(|o| o.selected).unwrap_or(false) {
                    return Some(idx);
                }
                idx
            }
            None => {
                let mut option = HostOption::new(value.clone(), text).with_data(data.clone());
                if let Some(item) = self.store.find_by_value(&value) {
                    for (key, val) in &item.data {
                        option.data.entry(key.clone()).or_insert_with(|| val.clone());
                    }
                    option.group = item
                        .group_id
                        .and_then(|id| self.store.group(id))
                        .map(|group| group.label.clone());
                }
                self.hooks.on_create_item(&mut option);
                self.selection.push_option(option)
            }
        };

        if let Some(option) = self.selection.option_mut(idx) {
            for (key, val) in data {
                option.data.entry(key).or_insert(val);
            }
        }
        self.selection.select(idx);
        if self.fire_events {
            let values = self.selection.selected_values();
            self.hooks.on_change(&values);
        }
        Some(idx)
    }

    /// Removes the newest selection carrying `value`.
    pub fn remove_item(&mut self, value: &str, silent: bool) -> bool {
        if self.selection.deselect_value(value).is_none() {
            return false;
        }
        if self.fire_events && !silent {
            let values = self.selection.selected_values();
            self.hooks.on_change(&values);
        }
        if !silent {
            self.hooks.on_clear_item(value);
        }
        true
    }

    pub fn remove_all(&mut self) -> usize {
        self.selection
            .selected_values()
            .iter()
            .filter(|value| self.remove_item(value, false))
            .count()
    }

    /// Removes the newest tag that is not disabled.
    pub fn remove_last_item(&mut self, silent: bool) -> bool {
        match self.selection.last_removable_value() {
            Some(value) => self.remove_item(&value, silent),
            None => false,
        }
    }

    /// Back to the selection captured at load time, without notifications.
    pub fn reset(&mut self) {
        let previous = std::mem::replace(&mut self.fire_events, false);
        for value in self.selection.selected_values() {
            self.remove_item(&value, true);
        }
        self.selection.restore_initial();
        self.fire_events = previous;
    }

    /// `can_add` then `add_item`, then close or refresh the dropdown.
    fn add(&mut self, text: &str, value: &str, data: TagData, is_new: bool) -> Option<HostOption> {
        if !self.can_add(text, &data, is_new) {
            return None;
        }
        let added = self.add_item(text, Some(value), data);
        if self.config.keep_open {
            self.show_suggestions();
        } else {
            self.reset_search_input();
        }
        added
    }

    fn select_item(&mut self, item: &Item) {
        if self
            .add(&item.label, &item.value, item.data.clone(), false)
            .is_some()
        {
            self.hooks.on_select_item(item);
        }
    }

    /// Confirms the active row, or the typed text as a new tag.
    fn enter_value(&mut self) -> bool {
        if let Some(item) = self.active_item() {
            self.select_item(&item);
            return true;
        }
        if self.config.allow_new && !self.query.is_empty() {
            let text = self.query.clone();
            return self.add(&text, &text, TagData::new(), true).is_some();
        }
        false
    }

    fn reset_search_input(&mut self) {
        self.query.clear();
        self.hide_suggestions(true);
        if self.selection.is_single() {
            if self.focused {
                self.focus_lost();
            }
        } else if self.focused {
            self.show_or_search(true);
        }
    }

    // UI events

    pub fn handle(&mut self, event: UiEvent) {
        match event {
            UiEvent::QueryChanged { text } => self.on_input(text),
            UiEvent::ActivateNext => {
                if self.open {
                    self.move_active(Direction::Next);
                } else {
                    self.show_or_search(false);
                }
            }
            UiEvent::ActivatePrevious => self.move_active(Direction::Prev),
            UiEvent::ConfirmActive => {
                self.enter_value();
            }
            UiEvent::RemoveLast => {
                if self.query.is_empty() {
                    self.remove_last_item(false);
                    self.show_or_search(true);
                }
            }
            UiEvent::SelectExplicit { value } => self.select_explicit(&value),
            UiEvent::ClearExplicit { value } => {
                if !self.is_disabled() {
                    self.remove_item(&value, false);
                    if self.focused {
                        self.focus_lost();
                    }
                }
            }
            UiEvent::FocusGained => {
                self.focused = true;
                self.show_or_search(true);
                self.hooks.on_focus();
            }
            UiEvent::FocusLost => self.focus_lost(),
            UiEvent::FormReset => self.reset(),
            UiEvent::Dismiss => self.hide_suggestions(true),
        }
    }

    fn on_input(&mut self, text: String) {
        self.query = text;
        let ends_with_separator = self
            .query
            .chars()
            .last()
            .map(|ch| self.config.is_separator(ch))
            .unwrap_or(false);
        if !ends_with_separator {
            self.show_or_search(true);
            return;
        }

        // the separator goes away even when nothing gets added
        self.query.pop();
        if self.config.allow_new {
            let text = self.query.clone();
            self.add(&text, &text, TagData::new(), true);
        } else if let Some(item) = self.active_item() {
            self.add(&item.label, &item.value, item.data.clone(), false);
        }
    }

    fn select_explicit(&mut self, value: &str) {
        let item = self
            .last_match
            .visible
            .iter()
            .filter_map(|pos| self.store.item(*pos))
            .find(|item| item.value == value)
            .or_else(|| self.store.find_by_value(value))
            .cloned();
        match item {
            Some(item) if !item.disabled => self.select_item(&item),
            _ => {}
        }
    }

    fn focus_lost(&mut self) {
        self.focused = false;
        if let Some(remote) = self.remote.as_mut() {
            remote.cancel();
        }
        let active = self.active_item().map(|item| item.value);
        let mut clear_validation = true;
        if self.config.add_on_blur && !self.query.is_empty() {
            clear_validation = self.enter_value();
        }
        self.hide_suggestions(clear_validation);
        if self.fire_events {
            let query = self.query.clone();
            self.hooks.on_blur(active.as_deref(), &query);
        }
    }

    fn should_show(&self) -> bool {
        !self.is_disabled()
            && !self.selection.is_max_reached()
            && self.query.chars().count() >= self.config.suggestions_threshold
    }

    fn show_or_search(&mut self, check: bool) {
        if check && !self.should_show() {
            // not enough input is not a validation error
            self.hide_suggestions(false);
            return;
        }
        if self.config.live_server && self.remote.is_some() {
            let request = FetchRequest::build(&self.config, &self.query, &self.fields);
            if let Some(remote) = self.remote.as_mut() {
                remote.schedule(request, true);
            }
        } else {
            self.show_suggestions();
        }
    }

    /// Runs a matcher pass on the current query and opens or closes the
    /// dropdown accordingly.
    pub fn show_suggestions(&mut self) {
        if self.selection.is_max_reached() {
            self.hide_suggestions(false);
            return;
        }
        let selected = self.selection.selected_values();
        let result = matcher::run(&self.store, &self.query, &selected, &self.match_opts);
        match result.validity {
            Validity::Invalid => self.invalid = true,
            Validity::Valid => self.invalid = false,
            Validity::Keep => {}
        }
        self.active = result.active;
        let empty = result.is_empty();
        self.last_match = result;

        if !empty {
            self.not_found = None;
            self.open = true;
        } else if self.config.not_found_message.is_empty() {
            self.hide_suggestions(false);
        } else {
            self.not_found = Some(self.config.not_found_message.replacen(
                limits::NOT_FOUND_PLACEHOLDER,
                &self.query,
                1,
            ));
            self.open = true;
        }
    }

    pub fn hide_suggestions(&mut self, clear_validation: bool) {
        self.open = false;
        self.active = None;
        self.not_found = None;
        if clear_validation {
            self.invalid = false;
        }
    }

    fn move_active(&mut self, direction: Direction) {
        if !self.open {
            return;
        }
        let candidates: Vec<usize> = self
            .last_match
            .visible
            .iter()
            .copied()
            .filter(|pos| self.store.item(*pos).map(|i| !i.disabled).unwrap_or(false))
            .collect();
        let current = self
            .active
            .and_then(|active| candidates.iter().position(|pos| *pos == active));
        self.active = match (current, direction) {
            (None, Direction::Next) => candidates.first().copied(),
            (None, Direction::Prev) => None,
            (Some(idx), Direction::Next) => candidates.get(idx + 1).copied().or(self.active),
            (Some(idx), Direction::Prev) => idx
                .checked_sub(1)
                .and_then(|prev| candidates.get(prev).copied())
                .or(self.active),
        };
        if self.config.update_on_select {
            if let Some(item) = self.active_item() {
                self.query = item.label;
            }
        }
    }

    fn active_item(&self) -> Option<Item> {
        self.active.and_then(|pos| self.store.item(pos)).cloned()
    }

    // State

    pub fn enable(&mut self) {
        self.disabled = false;
    }

    pub fn disable(&mut self) {
        self.disabled = true;
        if let Some(remote) = self.remote.as_mut() {
            remote.cancel();
        }
        self.hide_suggestions(true);
    }

    /// Stops timers and requests. The registry drops the instance after.
    pub fn dispose(&mut self) {
        if let Some(remote) = self.remote.as_mut() {
            remote.cancel();
        }
        self.hide_suggestions(true);
        self.logger.debug("Disposed", None);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn get_data(&self) -> Vec<Entry> {
        self.store.entries()
    }

    pub fn get_selected_values(&self) -> Vec<String> {
        self.selection.selected_values()
    }

    pub fn get_available_values(&self) -> Vec<String> {
        self.selection.available_values()
    }

    pub fn selected_options(&self) -> Vec<HostOption> {
        self.selection.selected().into_iter().cloned().collect()
    }

    pub fn has_item(&self, label: &str) -> bool {
        self.store.has_item(label)
    }

    pub fn is_selectable(&self, label: &str) -> bool {
        self.store.has_item(label)
            && (self.config.allow_same || !self.selection.is_label_selected(label))
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled || self.readonly
    }

    pub fn is_single(&self) -> bool {
        self.selection.is_single()
    }

    pub fn is_max_reached(&self) -> bool {
        self.selection.is_max_reached()
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn is_dropdown_visible(&self) -> bool {
        self.open
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_loading(&self) -> bool {
        self.remote
            .as_ref()
            .map(RemoteSync::is_loading)
            .unwrap_or(false)
    }

    pub fn active_value(&self) -> Option<&str> {
        self.active
            .and_then(|pos| self.store.item(pos))
            .map(|item| item.value.as_str())
    }

    pub fn view(&self) -> TagsView {
        let mut rows = Vec::new();
        if self.open {
            for slot in self.store.layout() {
                match *slot {
                    Slot::Header(id) => {
                        if !self.last_match.is_group_visible(id) {
                            continue;
                        }
                        if let Some(group) = self.store.group(id) {
                            rows.push(SuggestionRow::Header {
                                group_id: id,
                                label: group.label.clone(),
                            });
                        }
                    }
                    Slot::Item(pos) => {
                        if !self.last_match.is_visible(pos) {
                            continue;
                        }
                        let Some(item) = self.store.item(pos) else {
                            continue;
                        };
                        let highlight = if self.config.highlight_typed {
                            self.last_match
                                .highlights
                                .get(&pos)
                                .map(|h| HighlightView::new(&item.label, *h))
                        } else {
                            None
                        };
                        rows.push(SuggestionRow::Item {
                            value: item.value.clone(),
                            label: item.label.clone(),
                            disabled: item.disabled,
                            active: self.active == Some(pos),
                            title: item.title().map(str::to_string),
                            highlight,
                        });
                    }
                }
            }
        }

        let clearable = self.config.allow_clear && !self.is_disabled();
        let tags = self
            .selection
            .selected()
            .into_iter()
            .map(|option| TagView {
                value: option.value.clone(),
                label: option.label.clone(),
                badge_style: option
                    .data
                    .get(fields::BADGE_STYLE)
                    .cloned()
                    .unwrap_or_else(|| self.config.badge_style.clone()),
                removable: clearable && !option.disabled,
                data: option.data.clone(),
            })
            .collect();

        TagsView {
            id: self.id.clone(),
            query: self.query.clone(),
            placeholder: if self.selection.is_empty() {
                self.placeholder.clone()
            } else {
                String::new()
            },
            disabled: self.is_disabled(),
            input_enabled: !self.selection.is_max_reached(),
            invalid: self.invalid,
            loading: self.is_loading(),
            open: self.open,
            rows,
            not_found: self.not_found.clone(),
            tags,
        }
    }
}
