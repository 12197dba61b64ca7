#![allow(dead_code)]

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tags_input::errors::TagsError;
use tags_input::services::remote::{FetchRequest, SuggestionFetcher};
use tokio::sync::Mutex;

pub static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Answers every query with two items whose labels contain the query.
pub struct MockFetcher {
    calls: AtomicUsize,
    queries: StdMutex<Vec<String>>,
    latency: Duration,
    fail: bool,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            queries: StdMutex::new(Vec::new()),
            latency: Duration::from_millis(20),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SuggestionFetcher for MockFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<Value, TagsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query = request.param("query").unwrap_or_default().to_string();
        self.queries.lock().unwrap().push(query.clone());
        tokio::time::sleep(self.latency).await;
        if self.fail {
            return Err(TagsError::network("upstream unavailable"));
        }
        Ok(json!({
            "data": [
                { "value": format!("{}-1", query), "label": format!("{} one", query) },
                { "value": format!("{}-2", query), "label": format!("{} two", query), "selected": true }
            ]
        }))
    }
}
