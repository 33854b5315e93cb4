// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Relationship-Management Service Adapter
//
// Anti-Corruption Layer for the external CRM. Missing credentials are not an
// error here: upsert returns `None` and logs, so a deployment without the
// relationships integration keeps running.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::domain::errors::LayerError;
use crate::domain::node_config::{resolve_secret, RelationshipServiceConfig};
use crate::domain::relationship::{Contact, RelationshipService};

const SERVICE: &str = "relationships";

pub struct RelationshipServiceClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    location_id: Option<String>,
}

#[derive(Deserialize)]
struct UpsertResponse {
    contact: Contact,
}

impl RelationshipServiceClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, location_id: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            location_id,
        }
    }

    pub fn from_config(config: &RelationshipServiceConfig) -> Self {
        Self::new(
            &config.endpoint,
            config.api_key.as_deref().and_then(resolve_secret),
            config.location_id.as_deref().and_then(resolve_secret),
        )
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        Some((self.api_key.as_deref()?, self.location_id.as_deref()?))
    }
}

#[async_trait]
impl RelationshipService for RelationshipServiceClient {
    async fn upsert_contact(&self, fields: &Map<String, Value>) -> Result<Option<Contact>, LayerError> {
        let Some((api_key, location_id)) = self.credentials() else {
            warn!("Relationship service not configured, skipping contact upsert");
            return Ok(None);
        };

        let mut body = fields.clone();
        body.insert("locationId".to_string(), Value::String(location_id.to_string()));

        let response = self
            .client
            .post(format!("{}/contacts/upsert", self.endpoint))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LayerError::external(SERVICE, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LayerError::external(SERVICE, format!("HTTP {}: {}", status, text)));
        }

        let parsed: UpsertResponse = response
            .json()
            .await
            .map_err(|e| LayerError::external(SERVICE, format!("Failed to parse response: {}", e)))?;

        info!(contact_id = %parsed.contact.id, "Upserted contact");
        Ok(Some(parsed.contact))
    }

    async fn add_tags(&self, contact_id: &str, tags: &[String]) {
        let Some((api_key, _)) = self.credentials() else {
            debug!("Relationship service not configured, skipping tags");
            return;
        };

        let result = self
            .client
            .post(format!("{}/contacts/{}/tags", self.endpoint, contact_id))
            .bearer_auth(api_key)
            .json(&json!({ "tags": tags }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(contact_id, count = tags.len(), "Tagged contact");
            }
            Ok(response) => warn!(contact_id, status = %response.status(), "Failed to tag contact"),
            Err(e) => warn!(contact_id, error = %e, "Failed to tag contact"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn fields() -> Map<String, Value> {
        json!({"firstName": "Ada", "email": "ada@example.com"})
            .as_object()
            .cloned()
            .unwrap()
    }

    #[tokio::test]
    async fn test_unconfigured_upsert_returns_none() {
        let client = RelationshipServiceClient::new("http://127.0.0.1:9", Some("k".to_string()), None);
        assert_eq!(client.upsert_contact(&fields()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_sends_location_and_parses_contact() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/contacts/upsert")
            .match_header("authorization", "Bearer k")
            .match_body(Matcher::PartialJson(json!({"locationId": "loc-1", "email": "ada@example.com"})))
            .with_status(200)
            .with_body(r#"{"contact":{"id":"ext-1","firstName":"Ada"}}"#)
            .create_async()
            .await;

        let client = RelationshipServiceClient::new(server.url(), Some("k".to_string()), Some("loc-1".to_string()));
        let contact = client.upsert_contact(&fields()).await.unwrap().unwrap();

        assert_eq!(contact.id, "ext-1");
        assert_eq!(contact.fields["firstName"], "Ada");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upsert_error_status_is_external_service_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/contacts/upsert")
            .with_status(422)
            .create_async()
            .await;

        let client = RelationshipServiceClient::new(server.url(), Some("k".to_string()), Some("loc".to_string()));
        assert!(matches!(
            client.upsert_contact(&fields()).await,
            Err(LayerError::ExternalService { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_tags_swallows_failures() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/contacts/ext-1/tags")
            .with_status(500)
            .create_async()
            .await;

        let client = RelationshipServiceClient::new(server.url(), Some("k".to_string()), Some("loc".to_string()));
        client.add_tags("ext-1", &["vip".to_string()]).await;
        mock.assert_async().await;
    }
}
