//! Network store over a PostgREST-style table endpoint.
//!
//! # Responsibility
//! - Map `Store` calls onto `{base_url}/rest/v1/{table}` requests.
//! - Classify failures: transport -> `Network`, failure status -> `Rejected`.
//! - Relay realtime notifications through `push_relay()`.
//!
//! # Invariants
//! - Every request carries the configured API key.
//! - Delete of an absent row (empty result or 404) succeeds.
//! - Request timeouts come from `RemoteConfig`; no call blocks unbounded.

use super::change_feed::{ChangeFeed, Subscription};
use super::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, UreqClient};
use super::{PushEvent, Store, StoreError, StoreResult};
use crate::config::RemoteConfig;
use crate::model::intervention::Intervention;
use log::{debug, warn};
use std::sync::mpsc::Sender;

const MAX_ERROR_BODY_CHARS: usize = 200;

/// REST-backed implementation of [`Store`].
pub struct RemoteStore<C: HttpClient = UreqClient> {
    config: RemoteConfig,
    client: C,
    relay: ChangeFeed,
}

impl RemoteStore<UreqClient> {
    /// Builds a store using a timeout-bounded `ureq` agent.
    pub fn connect(config: RemoteConfig) -> Self {
        let client = UreqClient::new(config.connect_timeout, config.request_timeout);
        Self::with_client(config, client)
    }
}

impl<C: HttpClient> RemoteStore<C> {
    pub fn with_client(config: RemoteConfig, client: C) -> Self {
        Self {
            config,
            client,
            relay: ChangeFeed::new(),
        }
    }

    /// Feed that a realtime adapter emits upstream changes into.
    ///
    /// Subscribers registered via [`Store::subscribe`] receive them.
    pub fn push_relay(&self) -> ChangeFeed {
        self.relay.clone()
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.table
        )
    }

    fn request(&self, method: HttpMethod) -> HttpRequest {
        HttpRequest::new(method, self.table_url())
            .header("apikey", self.config.api_key.as_str())
            .header("authorization", format!("Bearer {}", self.config.api_key))
            .header("accept", "application/json")
    }

    fn execute(&self, request: &HttpRequest) -> StoreResult<HttpResponse> {
        let response = self.client.send(request).map_err(|err| {
            warn!(
                "event=store_request module=remote_store status=error method={} error_code=network error={err}",
                request.method.as_str()
            );
            StoreError::Network(err.0)
        })?;

        debug!(
            "event=store_request module=remote_store status=ok method={} http_status={}",
            request.method.as_str(),
            response.status
        );
        Ok(response)
    }
}

impl<C: HttpClient> Store for RemoteStore<C> {
    fn create(&self, record: &Intervention) -> StoreResult<Intervention> {
        let mut payload = serde_json::to_value(record)?;
        if record.id.is_empty() {
            if let Some(object) = payload.as_object_mut() {
                object.remove("id");
            }
        }

        let request = self
            .request(HttpMethod::Post)
            .header("content-type", "application/json")
            .header(
                "prefer",
                "return=representation,resolution=ignore-duplicates",
            )
            .body(payload.to_string());
        let response = self.execute(&request)?;
        if !response.is_success() {
            return Err(rejected(&response));
        }

        let mut rows = parse_rows(&response.body)?;
        if rows.is_empty() {
            // Duplicate insert ignored by the backend.
            if record.id.is_empty() {
                return Err(StoreError::Unknown(
                    "insert returned no row and no id was supplied".to_string(),
                ));
            }
            return Ok(record.clone());
        }
        Ok(rows.swap_remove(0))
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let request = self
            .request(HttpMethod::Delete)
            .query("id", format!("eq.{id}"));
        let response = self.execute(&request)?;
        if response.is_success() || response.status == 404 {
            return Ok(());
        }
        Err(rejected(&response))
    }

    fn list(&self) -> StoreResult<Vec<Intervention>> {
        let request = self
            .request(HttpMethod::Get)
            .query("select", "*")
            .query("order", "date.desc");
        let response = self.execute(&request)?;
        if !response.is_success() {
            return Err(rejected(&response));
        }
        // Oldest first, so newest-wins tie ordering keeps the server's order.
        let mut rows = parse_rows(&response.body)?;
        rows.reverse();
        Ok(rows)
    }

    fn subscribe(&self, sink: Sender<PushEvent>) -> StoreResult<Option<Subscription>> {
        Ok(Some(self.relay.subscribe(sink)))
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}

fn parse_rows(body: &str) -> StoreResult<Vec<Intervention>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

fn rejected(response: &HttpResponse) -> StoreError {
    let message = response
        .body
        .replace(['\n', '\r'], " ")
        .chars()
        .take(MAX_ERROR_BODY_CHARS)
        .collect();
    StoreError::Rejected {
        status: response.status,
        message,
    }
}
