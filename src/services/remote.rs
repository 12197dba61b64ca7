use crate::constants::server;
use crate::errors::TagsError;
use crate::services::config::Config;
use crate::services::logger::Logger;
use crate::utils::coerce::value_to_string;
use crate::utils::debounce::Debouncer;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub params: Vec<(String, String)>,
}

impl FetchRequest {
    /// Server parameters for one fetch: static `serverParams`, the typed
    /// text under `queryParam`, a cache-busting timestamp when `noCache`,
    /// and `related` swapped for the live value of the field it names.
    pub fn build(config: &Config, query: &str, fields: &BTreeMap<String, String>) -> Self {
        let mut request = Self {
            url: config.server.trim().to_string(),
            method: config.server_method.clone(),
            params: Vec::new(),
        };
        for (key, value) in config.server_params.iter() {
            if let Some(text) = value_to_string(value) {
                request.set_param(key, text);
            }
        }
        request.set_param(&config.query_param, query.to_string());
        if config.no_cache {
            request.set_param(
                server::CACHE_BUST_PARAM,
                chrono::Utc::now().timestamp_millis().to_string(),
            );
        }
        let related = request
            .param(server::RELATED_PARAM)
            .and_then(|id| fields.get(id))
            .cloned();
        if let Some(live) = related {
            request.set_param(server::RELATED_PARAM, live);
        }
        request
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_param(&mut self, key: &str, value: String) {
        match self.params.iter_mut().find(|(name, _)| name == key) {
            Some(slot) => slot.1 = value,
            None => self.params.push((key.to_string(), value)),
        }
    }

    pub fn is_post(&self) -> bool {
        self.method.eq_ignore_ascii_case("POST")
    }

    /// URL with the encoded parameters appended (GET form).
    pub fn query_url(&self) -> Result<String, TagsError> {
        let encoded = serde_urlencoded::to_string(&self.params)
            .map_err(|err| TagsError::internal(format!("Failed to encode parameters: {}", err)))?;
        if encoded.is_empty() {
            return Ok(self.url.clone());
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        Ok(format!("{}{}{}", self.url, sep, encoded))
    }
}

#[async_trait]
pub trait SuggestionFetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<Value, TagsError>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, TagsError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TagsError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self { client })
    }
}

fn parse_url(raw: &str) -> Result<url::Url, TagsError> {
    url::Url::parse(raw).map_err(|err| {
        TagsError::invalid_config(format!("server: invalid URL {}: {}", raw, err))
            .with_hint("The driver needs an absolute http(s) URL.")
    })
}

#[async_trait]
impl SuggestionFetcher for HttpFetcher {
    async fn fetch(&self, request: FetchRequest) -> Result<Value, TagsError> {
        let builder = if request.is_post() {
            self.client
                .post(parse_url(&request.url)?)
                .form(&request.params)
        } else {
            self.client.get(parse_url(&request.query_url()?)?)
        };
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TagsError::network(format!(
                "{} responded with {}",
                request.url, status
            ))
            .with_details(json!({ "status": status.as_u16() })));
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Result of one fetch, routed back to the owning instance.
#[derive(Debug)]
pub struct FetchOutcome {
    pub instance: String,
    pub generation: u64,
    /// Run a visibility pass once applied (fetch came from typing).
    pub show: bool,
    /// Load-time fetch: may seed the initial selection.
    pub initial: bool,
    pub result: Result<Value, TagsError>,
}

struct InFlight {
    generation: u64,
    handle: JoinHandle<()>,
}

struct RemoteShared {
    instance: String,
    fetcher: Arc<dyn SuggestionFetcher>,
    sender: UnboundedSender<FetchOutcome>,
    logger: Logger,
    generation: AtomicU64,
    /// Bumped by `cancel` and `load_now`; debounced calls scheduled under an
    /// older epoch never start.
    epoch: AtomicU64,
    slot: Mutex<Option<InFlight>>,
}

impl RemoteShared {
    fn lock_slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.slot.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Aborts whatever is in flight and starts `request` in its place.
    fn start(self: &Arc<Self>, request: FetchRequest, show: bool, initial: bool) -> u64 {
        let mut slot = self.lock_slot();
        self.launch(&mut slot, request, show, initial)
    }

    /// Start path for debounced calls. The epoch is checked under the slot
    /// lock, so a `cancel` that raced the timer either sees the new request
    /// in the slot or makes this call a no-op.
    fn start_scheduled(self: &Arc<Self>, request: FetchRequest, show: bool, epoch: u64) -> Option<u64> {
        let mut slot = self.lock_slot();
        if self.epoch.load(Ordering::SeqCst) != epoch {
            self.logger.debug("Dropped cancelled debounced load", None);
            return None;
        }
        Some(self.launch(&mut slot, request, show, false))
    }

    fn launch(
        self: &Arc<Self>,
        slot: &mut Option<InFlight>,
        request: FetchRequest,
        show: bool,
        initial: bool,
    ) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = slot.take() {
            previous.handle.abort();
            self.logger.debug(
                "Aborted superseded request",
                Some(&json!({ "generation": previous.generation })),
            );
        }

        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let url = request.url.clone();
            let result = shared.fetcher.fetch(request).await;
            {
                let mut slot = shared.lock_slot();
                if slot.as_ref().map(|f| f.generation) != Some(generation) {
                    return;
                }
                slot.take();
            }
            if let Err(err) = &result {
                if err.is_cancelled() {
                    shared.logger.debug("Request cancelled", Some(&json!({ "url": url })));
                    return;
                }
                shared.logger.error(
                    "Suggestion fetch failed",
                    Some(&json!({ "url": url, "error": err.to_string() })),
                );
            }
            let _ = shared.sender.send(FetchOutcome {
                instance: shared.instance.clone(),
                generation,
                show,
                initial,
                result,
            });
        });
        *slot = Some(InFlight { generation, handle });
        generation
    }

    fn abort(&self) -> bool {
        match self.lock_slot().take() {
            Some(in_flight) => {
                in_flight.handle.abort();
                true
            }
            None => false,
        }
    }
}

/// Debounced, single-slot suggestion loading for one instance.
pub struct RemoteSync {
    shared: Arc<RemoteShared>,
    debouncer: Debouncer,
}

impl RemoteSync {
    pub fn new(
        instance: &str,
        fetcher: Arc<dyn SuggestionFetcher>,
        sender: UnboundedSender<FetchOutcome>,
        debounce: Duration,
        logger: &Logger,
    ) -> Self {
        Self {
            shared: Arc::new(RemoteShared {
                instance: instance.to_string(),
                fetcher,
                sender,
                logger: logger.child("remote"),
                generation: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                slot: Mutex::new(None),
            }),
            debouncer: Debouncer::new(debounce),
        }
    }

    /// Starts `request` once the quiet period elapses, replacing any call
    /// scheduled before it.
    pub fn schedule(&mut self, request: FetchRequest, show: bool) {
        let shared = Arc::clone(&self.shared);
        let epoch = shared.epoch.load(Ordering::SeqCst);
        self.debouncer.schedule(async move {
            shared.start_scheduled(request, show, epoch);
        });
    }

    /// Starts immediately, skipping the debounce.
    pub fn load_now(&mut self, request: FetchRequest, show: bool, initial: bool) -> u64 {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        self.debouncer.cancel();
        self.shared.start(request, show, initial)
    }

    /// Drops the pending debounce and aborts the in-flight request.
    pub fn cancel(&mut self) -> bool {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        let pending = self.debouncer.cancel();
        let in_flight = self.shared.abort();
        if pending || in_flight {
            self.shared
                .logger
                .debug("Cancelled pending suggestion load", None);
        }
        pending || in_flight
    }

    pub fn is_loading(&self) -> bool {
        self.shared.lock_slot().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }
}

impl Drop for RemoteSync {
    fn drop(&mut self) {
        self.shared.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    struct SlowFetcher {
        started: AtomicUsize,
        finished: AtomicUsize,
        queries: Mutex<Vec<String>>,
    }

    impl SlowFetcher {
        fn new() -> Self {
            Self {
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SuggestionFetcher for SlowFetcher {
        async fn fetch(&self, request: FetchRequest) -> Result<Value, TagsError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let query = request.param("query").unwrap_or_default().to_string();
            self.queries.lock().unwrap().push(query.clone());
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "data": [{ "value": query }] }))
        }
    }

    fn request(query: &str) -> FetchRequest {
        let config = Config {
            server: "http://localhost/search".to_string(),
            no_cache: false,
            ..Config::default()
        };
        FetchRequest::build(&config, query, &BTreeMap::new())
    }

    #[test]
    fn build_merges_params_in_order() {
        let mut config = Config {
            server: "http://localhost/search?v=1".to_string(),
            ..Config::default()
        };
        config.server_params.insert("related".to_string(), json!("country"));
        config.server_params.insert("limit".to_string(), json!(10));
        let mut fields = BTreeMap::new();
        fields.insert("country".to_string(), "BE".to_string());

        let request = FetchRequest::build(&config, "bru", &fields);
        assert_eq!(request.param("related"), Some("BE"));
        assert_eq!(request.param("limit"), Some("10"));
        assert_eq!(request.param("query"), Some("bru"));
        assert!(request.param("t").is_some());

        let url = request.query_url().unwrap();
        assert!(url.starts_with("http://localhost/search?v=1&related=BE&limit=10&query=bru&t="));
    }

    #[test]
    fn related_without_matching_field_is_kept() {
        let mut config = Config::default();
        config.no_cache = false;
        config.server_params.insert("related".to_string(), json!("missing"));
        let request = FetchRequest::build(&config, "", &BTreeMap::new());
        assert_eq!(request.param("related"), Some("missing"));
        assert_eq!(request.param("t"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_collapses_bursts() {
        let fetcher = Arc::new(SlowFetcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let logger = Logger::new("test");
        let mut remote = RemoteSync::new("tags", fetcher.clone(), tx, Duration::from_millis(300), &logger);

        for query in ["a", "ab", "abc"] {
            remote.schedule(request(query), true);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let outcome = rx.recv().await.expect("outcome");
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 1);
        assert_eq!(fetcher.queries.lock().unwrap().as_slice(), ["abc"]);
        assert!(outcome.show);
        assert_eq!(outcome.instance, "tags");
        assert!(!remote.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_aborts_in_flight_one() {
        let fetcher = Arc::new(SlowFetcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let logger = Logger::new("test");
        let mut remote = RemoteSync::new("tags", fetcher.clone(), tx, Duration::from_millis(300), &logger);

        remote.load_now(request("a"), false, false);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(remote.is_loading());
        let latest = remote.load_now(request("ab"), true, false);

        let outcome = rx.recv().await.expect("outcome");
        assert_eq!(outcome.generation, latest);
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 2);
        assert_eq!(fetcher.finished.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_swallows_everything() {
        let fetcher = Arc::new(SlowFetcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let logger = Logger::new("test");
        let mut remote = RemoteSync::new("tags", fetcher.clone(), tx, Duration::from_millis(300), &logger);

        remote.schedule(request("a"), true);
        assert!(remote.is_pending());
        assert!(remote.cancel());
        remote.load_now(request("b"), true, false);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(remote.cancel());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(fetcher.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_start_after_cancel_is_refused() {
        let fetcher = Arc::new(SlowFetcher::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let logger = Logger::new("test");
        let mut remote = RemoteSync::new("tags", fetcher.clone(), tx, Duration::from_millis(300), &logger);

        // a timer that already fired when cancel ran still holds the old epoch
        let epoch = remote.shared.epoch.load(Ordering::SeqCst);
        remote.cancel();
        assert_eq!(remote.shared.start_scheduled(request("a"), true, epoch), None);
        assert!(!remote.is_loading());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 0);

        let current = remote.shared.epoch.load(Ordering::SeqCst);
        assert!(remote.shared.start_scheduled(request("b"), true, current).is_some());
        assert!(rx.recv().await.expect("outcome").show);
    }
}
