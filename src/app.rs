use crate::errors::TagsError;
use crate::host::element::HostSelect;
use crate::managers::hooks::{Notification, RecordingHooks};
use crate::managers::tags::{RemoteWiring, TagsInput};
use crate::services::logger::Logger;
use crate::services::remote::{FetchOutcome, SuggestionFetcher};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

struct Bound {
    input: TagsInput,
    hooks: RecordingHooks,
}

/// Instance registry keyed by element id. An instance stays registered
/// until `dispose` is called for it.
pub struct App {
    pub logger: Logger,
    instances: HashMap<String, Bound>,
    fetcher: Arc<dyn SuggestionFetcher>,
    outcomes: UnboundedSender<FetchOutcome>,
}

impl App {
    pub fn new(
        fetcher: Arc<dyn SuggestionFetcher>,
        outcomes: UnboundedSender<FetchOutcome>,
        logger: Logger,
    ) -> Self {
        Self {
            logger,
            instances: HashMap::new(),
            fetcher,
            outcomes,
        }
    }

    /// Binds a new instance, or hands back the one already bound to this id.
    pub fn bind(&mut self, element: HostSelect, config: &Value) -> Result<&mut TagsInput, TagsError> {
        let id = element.id.clone();
        if !self.instances.contains_key(&id) {
            let hooks = RecordingHooks::new();
            let wiring = RemoteWiring {
                fetcher: Arc::clone(&self.fetcher),
                outcomes: self.outcomes.clone(),
            };
            let input = TagsInput::new(
                element,
                config,
                Box::new(hooks.clone()),
                Some(wiring),
                &self.logger,
            )?;
            self.logger.info("Instance bound", Some(&json!({ "id": id })));
            self.instances.insert(id.clone(), Bound { input, hooks });
        } else {
            self.logger
                .debug("Instance already bound", Some(&json!({ "id": id })));
        }
        self.get_mut(&id)
            .ok_or_else(|| TagsError::internal(format!("Instance {} vanished after bind", id)))
    }

    pub fn get(&self, id: &str) -> Option<&TagsInput> {
        self.instances.get(id).map(|bound| &bound.input)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut TagsInput> {
        self.instances.get_mut(id).map(|bound| &mut bound.input)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Notifications recorded for `id` since the last drain.
    pub fn drain_notifications(&self, id: &str) -> Vec<Notification> {
        self.instances
            .get(id)
            .map(|bound| bound.hooks.drain())
            .unwrap_or_default()
    }

    /// Cancels timers and requests, then unregisters.
    pub fn dispose(&mut self, id: &str) -> bool {
        match self.instances.remove(id) {
            Some(mut bound) => {
                bound.input.dispose();
                self.logger.info("Instance disposed", Some(&json!({ "id": id })));
                true
            }
            None => false,
        }
    }

    /// Hands a fetch result to its instance. Returns the instance id when
    /// the outcome was applied.
    pub fn route_outcome(&mut self, outcome: FetchOutcome) -> Option<String> {
        let id = outcome.instance.clone();
        if !self.contains(&id) {
            self.logger
                .debug("Dropped outcome for unbound instance", Some(&json!({ "id": id })));
            return None;
        }
        let input = self.get_mut(&id)?;
        input.apply_fetch(outcome).then_some(id)
    }
}
