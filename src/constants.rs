pub mod network {
    pub const TIMEOUT_REQUEST_MS: u64 = 30_000;
    pub const DEFAULT_METHOD: &str = "GET";
    pub const ALLOWED_METHODS: &[&str] = &["GET", "POST"];
}

pub mod server {
    pub const DEBOUNCE_MS: u64 = 300;
    pub const QUERY_PARAM: &str = "query";
    pub const DATA_KEY: &str = "data";
    pub const CACHE_BUST_PARAM: &str = "t";
    pub const RELATED_PARAM: &str = "related";
}

pub mod fields {
    pub const LABEL: &str = "label";
    pub const VALUE: &str = "value";
    pub const GROUP: &str = "group";
    pub const GROUP_ITEMS: &str = "items";
    pub const DATA: &str = "data";
    pub const DISABLED: &str = "disabled";
    pub const SELECTED: &str = "selected";
    pub const TITLE: &str = "title";
    pub const BADGE_STYLE: &str = "badgeStyle";
}

pub mod limits {
    pub const SUGGESTIONS_THRESHOLD: usize = 1;
    pub const NOT_FOUND_PLACEHOLDER: &str = "{{tag}}";
}

pub mod host {
    pub const SELECT_TAG: &str = "select";
    pub const CONFIG_ATTRIBUTE: &str = "config";
}
