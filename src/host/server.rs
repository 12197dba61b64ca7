use crate::app::App;
use crate::errors::TagsError;
use crate::host::protocol::{DriverOp, DriverRequest, DriverResponse};
use crate::services::logger::Logger;
use crate::services::remote::{FetchOutcome, SuggestionFetcher};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// JSON-lines front end over the instance registry.
pub struct Driver {
    app: App,
    outcomes: UnboundedReceiver<FetchOutcome>,
}

impl Driver {
    pub fn new(fetcher: Arc<dyn SuggestionFetcher>, logger: Logger) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            app: App::new(fetcher, tx, logger),
            outcomes: rx,
        }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Handles one request line. Blank lines produce no response.
    pub fn handle_line(&mut self, line: &str) -> Option<DriverResponse> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let parsed: Value = match serde_json::from_str(trimmed) {
            Ok(value) => value,
            Err(err) => return Some(DriverResponse::failure("", TagsError::from(err))),
        };
        let id = parsed
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let request: DriverRequest = match serde_json::from_value(parsed) {
            Ok(request) => request,
            Err(err) => {
                return Some(DriverResponse::failure(
                    id,
                    TagsError::decode(format!("Invalid request: {}", err))
                        .with_hint("Expected {\"id\", \"op\": bind|event|view|set_data|dispose}."),
                ))
            }
        };
        Some(self.handle_request(request))
    }

    pub fn handle_request(&mut self, request: DriverRequest) -> DriverResponse {
        let DriverRequest { id, op } = request;
        match op {
            DriverOp::Bind { mut element, config } => {
                if element.id.is_empty() {
                    element.id = id.clone();
                }
                match self.app.bind(element, &config) {
                    Ok(_) => self.snapshot(&id),
                    Err(err) => DriverResponse::failure(id, err),
                }
            }
            DriverOp::Dispose => {
                if self.app.dispose(&id) {
                    DriverResponse::success(id, None, Vec::new())
                } else {
                    DriverResponse::failure(id.clone(), not_bound(&id))
                }
            }
            DriverOp::View => self.snapshot(&id),
            DriverOp::Event { event } => match self.app.get_mut(&id) {
                Some(input) => {
                    input.handle(event);
                    self.snapshot(&id)
                }
                None => DriverResponse::failure(id.clone(), not_bound(&id)),
            },
            DriverOp::SetData { data, init } => match self.app.get_mut(&id) {
                Some(input) => {
                    input.set_data(&data, init);
                    self.snapshot(&id)
                }
                None => DriverResponse::failure(id.clone(), not_bound(&id)),
            },
        }
    }

    /// Applies a fetch result; the unsolicited view line for its instance.
    pub fn handle_outcome(&mut self, outcome: FetchOutcome) -> Option<DriverResponse> {
        let id = self.app.route_outcome(outcome)?;
        Some(self.snapshot(&id))
    }

    fn snapshot(&self, id: &str) -> DriverResponse {
        match self.app.get(id) {
            Some(input) => {
                DriverResponse::success(id, Some(input.view()), self.app.drain_notifications(id))
            }
            None => DriverResponse::failure(id, not_bound(id)),
        }
    }

    pub async fn next_outcome(&mut self) -> Option<FetchOutcome> {
        self.outcomes.recv().await
    }

    pub async fn run_stdio(&mut self) -> Result<(), TagsError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);

        self.app.logger.info("Driver ready", None);
        loop {
            let response = tokio::select! {
                line = reader.next_line() => match line? {
                    Some(line) => self.handle_line(&line),
                    None => break,
                },
                Some(outcome) = self.outcomes.recv() => self.handle_outcome(outcome),
            };
            if let Some(response) = response {
                writer.write_all(response.to_line().as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        self.app
            .logger
            .info("Driver stopped", Some(&json!({ "stats": self.app.logger.stats() })));
        Ok(())
    }
}

fn not_bound(id: &str) -> TagsError {
    TagsError::invalid_target(format!("No instance is bound to {}", id))
        .with_hint("Send a bind op for this id first.")
}

pub async fn run_stdio(fetcher: Arc<dyn SuggestionFetcher>, logger: Logger) -> Result<(), TagsError> {
    let mut driver = Driver::new(fetcher, logger);
    driver.run_stdio().await
}
