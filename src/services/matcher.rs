use crate::services::config::Config;
use crate::services::store::SuggestionStore;
use crate::utils::text::{is_subsequence, normalize, normalized_span};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Substring,
    Prefix,
    Fuzzy,
}

impl Strategy {
    /// Both sides are expected to be normalized already.
    pub fn matches(self, field: &str, lookup: &str) -> bool {
        match self {
            Strategy::Substring => field.contains(lookup),
            Strategy::Prefix => field.starts_with(lookup),
            Strategy::Fuzzy => field.contains(lookup) || is_subsequence(field, lookup),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOptions {
    pub strategy: Strategy,
    pub show_all_suggestions: bool,
    pub suggestions_threshold: usize,
    pub allow_same: bool,
    pub allow_new: bool,
    pub has_regex: bool,
    pub maximum_items: usize,
    pub autoselect_first: bool,
}

impl MatchOptions {
    /// `startsWith` wins over `fuzzy` when both are set.
    pub fn from_config(config: &Config) -> Self {
        let strategy = if config.starts_with {
            Strategy::Prefix
        } else if config.fuzzy {
            Strategy::Fuzzy
        } else {
            Strategy::Substring
        };
        Self {
            strategy,
            show_all_suggestions: config.show_all_suggestions,
            suggestions_threshold: config.suggestions_threshold,
            allow_same: config.allow_same,
            allow_new: config.allow_new,
            has_regex: !config.regex.trim().is_empty(),
            maximum_items: config.maximum_items,
            autoselect_first: config.autoselect_first,
        }
    }
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What a pass says about the host's invalid flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validity {
    /// Leave the flag as it is.
    #[default]
    Keep,
    Invalid,
    Valid,
}

/// Char range of the typed text inside an item label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub start: usize,
    pub len: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchResult {
    /// Store positions, in store order.
    pub visible: Vec<usize>,
    pub visible_groups: BTreeSet<usize>,
    pub active: Option<usize>,
    pub has_possible: bool,
    pub validity: Validity,
    pub highlights: BTreeMap<usize, Highlight>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub fn is_visible(&self, pos: usize) -> bool {
        self.visible.contains(&pos)
    }

    pub fn is_group_visible(&self, id: usize) -> bool {
        self.visible_groups.contains(&id)
    }
}

/// One visibility pass over the store.
///
/// `selected` is the current selection in order. Without `allow_same`, the
/// n-th store entry carrying a value is hidden while at least n+1 selections
/// carry that value, so each selection consumes one entry.
pub fn run(
    store: &SuggestionStore,
    query: &str,
    selected: &[String],
    opts: &MatchOptions,
) -> MatchResult {
    let lookup = normalize(query);
    let show_all = opts.show_all_suggestions || lookup.is_empty();

    let mut taken: HashMap<&str, usize> = HashMap::new();
    for value in selected {
        *taken.entry(value.as_str()).or_default() += 1;
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();

    let mut result = MatchResult::default();
    let mut count = 0usize;
    let mut first: Option<usize> = None;

    for (pos, item) in store.items().iter().enumerate() {
        let occurrence = seen.entry(item.value.as_str()).or_default();
        let index = *occurrence;
        *occurrence += 1;
        if !opts.allow_same && taken.get(item.value.as_str()).copied().unwrap_or(0) > index {
            continue;
        }

        let is_matched = if lookup.is_empty() {
            opts.suggestions_threshold == 0
        } else {
            store
                .search_keys(pos)
                .iter()
                .any(|key| opts.strategy.matches(key, &lookup))
        };
        if !(show_all || is_matched) {
            continue;
        }

        count += 1;
        if opts.maximum_items > 0 && count > opts.maximum_items {
            continue;
        }

        result.visible.push(pos);
        if let Some(group_id) = item.group_id {
            result.visible_groups.insert(group_id);
        }
        if !item.disabled {
            result.has_possible = true;
            if first.is_none() && (is_matched || lookup.is_empty()) {
                first = Some(pos);
            }
        }
        if is_matched {
            if let Some((start, len)) = normalized_span(&item.label, &lookup) {
                result.highlights.insert(pos, Highlight { start, len });
            }
        }
    }

    if opts.autoselect_first && result.has_possible {
        result.active = first;
    }

    result.validity = if result.has_possible || (opts.allow_new && opts.has_regex) {
        // with a regex, free text is validated when confirmed instead
        Validity::Valid
    } else if !opts.allow_new && !lookup.is_empty() {
        Validity::Invalid
    } else {
        Validity::Keep
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldMapping;
    use serde_json::{json, Value};

    fn store_from(source: Value) -> SuggestionStore {
        let mut store = SuggestionStore::new();
        store.set_data(&source, &FieldMapping::default());
        store
    }

    fn fruits() -> SuggestionStore {
        store_from(json!([
            {"value": "apple", "label": "Apple"},
            {"value": "apricot", "label": "Apricot"},
            {"value": "banana", "label": "Banana"},
            {"value": "creme", "label": "Crème brûlée"},
            {"value": "grape", "label": "Grape", "disabled": true}
        ]))
    }

    #[test]
    fn grouped_headers_follow_children() {
        let store = store_from(json!([{"group": "G", "items": [{"value": "a", "label": "A"}]}]));
        let opts = MatchOptions::default();

        let hit = run(&store, "a", &[], &opts);
        assert_eq!(hit.visible, vec![0]);
        assert!(hit.is_group_visible(1));
        assert_eq!(hit.active, Some(0));

        let miss = run(&store, "z", &[], &opts);
        assert!(miss.is_empty());
        assert!(!miss.is_group_visible(1));
        assert_eq!(miss.validity, Validity::Invalid);
    }

    #[test]
    fn substring_is_default_and_ignores_accents() {
        let store = fruits();
        let opts = MatchOptions::default();
        assert_eq!(run(&store, "ap", &[], &opts).visible, vec![0, 1, 4]);
        assert_eq!(run(&store, "BRULEE", &[], &opts).visible, vec![3]);
        assert_eq!(run(&store, "ana", &[], &opts).visible, vec![2]);
    }

    #[test]
    fn prefix_wins_over_fuzzy() {
        let config = Config {
            starts_with: true,
            fuzzy: true,
            ..Config::default()
        };
        let opts = MatchOptions::from_config(&config);
        assert_eq!(opts.strategy, Strategy::Prefix);
        assert_eq!(run(&fruits(), "ana", &[], &opts).visible, Vec::<usize>::new());
        assert_eq!(run(&fruits(), "ban", &[], &opts).visible, vec![2]);
    }

    #[test]
    fn fuzzy_is_a_superset_of_substring() {
        let store = fruits();
        let substring = MatchOptions::default();
        let fuzzy = MatchOptions {
            strategy: Strategy::Fuzzy,
            ..MatchOptions::default()
        };
        for query in ["a", "ap", "pr", "ana", "brû", "e b", "grape", "xyz"] {
            let narrow = run(&store, query, &[], &substring).visible;
            let wide = run(&store, query, &[], &fuzzy).visible;
            assert!(narrow.iter().all(|pos| wide.contains(pos)), "query {}", query);
        }
        assert_eq!(run(&store, "apct", &[], &fuzzy).visible, vec![1]);
    }

    #[test]
    fn selected_values_are_consumed_per_entry() {
        let store = store_from(json!([
            {"value": "x", "label": "X"},
            {"value": "x", "label": "X"},
            {"value": "y", "label": "Y"}
        ]));
        let opts = MatchOptions::default();
        let one = vec!["x".to_string()];
        assert_eq!(run(&store, "x", &one, &opts).visible, vec![1]);
        let two = vec!["x".to_string(), "x".to_string()];
        assert!(run(&store, "x", &two, &opts).is_empty());

        let same = MatchOptions {
            allow_same: true,
            ..MatchOptions::default()
        };
        assert_eq!(run(&store, "x", &two, &same).visible, vec![0, 1]);
    }

    #[test]
    fn empty_query_lists_everything_but_only_matches_at_threshold_zero() {
        let store = fruits();
        let opts = MatchOptions::default();
        let listing = run(&store, "", &[], &opts);
        assert_eq!(listing.visible.len(), 5);
        assert_eq!(listing.active, Some(0));
        assert!(listing.highlights.is_empty());
        assert_eq!(listing.validity, Validity::Valid);
    }

    #[test]
    fn maximum_items_caps_in_store_order() {
        let opts = MatchOptions {
            maximum_items: 2,
            ..MatchOptions::default()
        };
        assert_eq!(run(&fruits(), "", &[], &opts).visible, vec![0, 1]);
    }

    #[test]
    fn active_skips_disabled_and_respects_autoselect() {
        let store = store_from(json!([
            {"value": "g", "label": "Grape", "disabled": true},
            {"value": "gu", "label": "Guava"}
        ]));
        let opts = MatchOptions::default();
        assert_eq!(run(&store, "g", &[], &opts).active, Some(1));

        let manual = MatchOptions {
            autoselect_first: false,
            ..MatchOptions::default()
        };
        assert_eq!(run(&store, "g", &[], &manual).active, None);
    }

    #[test]
    fn show_all_keeps_active_on_matches_only() {
        let opts = MatchOptions {
            show_all_suggestions: true,
            ..MatchOptions::default()
        };
        let result = run(&fruits(), "ban", &[], &opts);
        assert_eq!(result.visible.len(), 5);
        assert_eq!(result.active, Some(2));
    }

    #[test]
    fn highlights_point_at_original_label() {
        let result = run(&fruits(), "brul", &[], &MatchOptions::default());
        assert_eq!(result.highlights.get(&3), Some(&Highlight { start: 6, len: 4 }));
    }

    #[test]
    fn validity_rules() {
        let store = store_from(json!([{"value": "a", "label": "A", "disabled": true}]));
        let strict = MatchOptions::default();
        assert_eq!(run(&store, "zz", &[], &strict).validity, Validity::Invalid);
        assert_eq!(run(&store, "", &[], &strict).validity, Validity::Keep);

        let free = MatchOptions {
            allow_new: true,
            ..MatchOptions::default()
        };
        assert_eq!(run(&store, "zz", &[], &free).validity, Validity::Keep);

        let free_regex = MatchOptions {
            allow_new: true,
            has_regex: true,
            ..MatchOptions::default()
        };
        assert_eq!(run(&store, "zz", &[], &free_regex).validity, Validity::Valid);
    }

    #[test]
    fn repeated_passes_are_identical() {
        let store = fruits();
        let opts = MatchOptions::default();
        let selected = vec!["banana".to_string()];
        assert_eq!(
            run(&store, "a", &selected, &opts),
            run(&store, "a", &selected, &opts)
        );
    }
}
