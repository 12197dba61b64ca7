use crate::model::TagData;
use crate::services::matcher::Highlight;
use crate::utils::text::split_at_chars;
use serde::Serialize;

/// Label split around the typed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightView {
    pub before: String,
    pub matched: String,
    pub after: String,
}

impl HighlightView {
    pub fn new(label: &str, highlight: Highlight) -> Self {
        let (before, matched, after) = split_at_chars(label, highlight.start, highlight.len);
        Self {
            before,
            matched,
            after,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuggestionRow {
    Header {
        group_id: usize,
        label: String,
    },
    Item {
        value: String,
        label: String,
        disabled: bool,
        active: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        highlight: Option<HighlightView>,
    },
}

impl SuggestionRow {
    pub fn value(&self) -> Option<&str> {
        match self {
            SuggestionRow::Item { value, .. } => Some(value),
            SuggestionRow::Header { .. } => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SuggestionRow::Item { active: true, .. })
    }
}

/// One badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagView {
    pub value: String,
    pub label: String,
    pub badge_style: String,
    pub removable: bool,
    pub data: TagData,
}

/// Everything a renderer needs to draw one instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagsView {
    pub id: String,
    pub query: String,
    pub placeholder: String,
    pub disabled: bool,
    /// False once `max` is reached.
    pub input_enabled: bool,
    pub invalid: bool,
    pub loading: bool,
    pub open: bool,
    pub rows: Vec<SuggestionRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_found: Option<String>,
    pub tags: Vec<TagView>,
}

impl TagsView {
    pub fn row_values(&self) -> Vec<&str> {
        self.rows.iter().filter_map(SuggestionRow::value).collect()
    }

    pub fn active_value(&self) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| row.is_active())
            .and_then(SuggestionRow::value)
    }

    pub fn tag_values(&self) -> Vec<&str> {
        self.tags.iter().map(|tag| tag.value.as_str()).collect()
    }
}
