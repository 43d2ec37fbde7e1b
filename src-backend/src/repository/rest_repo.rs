//! Deal Repository - Supabase
//!
//! Talks to a Supabase project's PostgREST endpoint for the deals table.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};

use crate::domain::{Deal, DealFilter, DealId, DealPatch, DomainError, DomainResult};
use super::deal_positioning::DealStore;
use super::traits::Repository;

/// PostgREST-backed implementation of the deal repository
pub struct RestDealRepository {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl RestDealRepository {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            table: table.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.endpoint())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, builder: RequestBuilder) -> DomainResult<Response> {
        let response = builder
            .send()
            .await
            .map_err(|e| DomainError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        log::warn!("Supabase {} returned {}: {}", self.table, status, body);
        Err(status_to_error(status, body))
    }

    async fn read_rows(&self, response: Response) -> DomainResult<Vec<Deal>> {
        response
            .json::<Vec<Deal>>()
            .await
            .map_err(|e| DomainError::Internal(format!("Malformed {} rows: {}", self.table, e)))
    }
}

fn status_to_error(status: StatusCode, body: String) -> DomainError {
    match status {
        StatusCode::NOT_FOUND => DomainError::NotFound(body),
        StatusCode::CONFLICT => DomainError::Conflict(body),
        s if s.is_client_error() => DomainError::InvalidInput(format!("{}: {}", s, body)),
        s => DomainError::Unavailable(format!("{}: {}", s, body)),
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl Repository<Deal> for RestDealRepository {
    async fn create(&self, entity: &Deal) -> DomainResult<Deal> {
        let mut body =
            serde_json::to_value(entity).map_err(|e| DomainError::Internal(e.to_string()))?;
        if entity.id.as_str().is_empty() {
            // Let the table default generate the uuid
            if let Some(obj) = body.as_object_mut() {
                obj.remove("id");
            }
        }

        let response = self
            .send(
                self.request(Method::POST)
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await?;

        self.read_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::Internal("Insert returned no row".to_string()))
    }

    async fn find_by_id(&self, id: &DealId) -> DomainResult<Option<Deal>> {
        let response = self
            .send(
                self.request(Method::GET)
                    .query(&[("select", "*".to_string()), ("id", eq(id.as_str()))]),
            )
            .await?;
        Ok(self.read_rows(response).await?.into_iter().next())
    }

    async fn list(&self, filter: &DealFilter) -> DomainResult<Vec<Deal>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "order_index.asc,id.asc".to_string()),
        ];
        if let Some(stage) = &filter.stage {
            query.push(("stage", eq(stage.as_str())));
        }
        if let Some(contact) = &filter.contact_name {
            query.push(("contact_name", eq(contact)));
        }

        let response = self.send(self.request(Method::GET).query(&query)).await?;
        self.read_rows(response).await
    }

    async fn update(&self, id: &DealId, patch: &DealPatch) -> DomainResult<()> {
        if patch.is_empty() {
            return Err(DomainError::InvalidInput(format!("Nothing to update for deal {}", id)));
        }
        let response = self
            .send(
                self.request(Method::PATCH)
                    .query(&[("id", eq(id.as_str()))])
                    .header("Prefer", "return=representation")
                    .json(patch),
            )
            .await?;

        // PostgREST answers an unmatched filter with an empty set, not 404
        if self.read_rows(response).await?.is_empty() {
            return Err(DomainError::NotFound(format!("Deal {} not found", id)));
        }
        Ok(())
    }

    async fn delete(&self, id: &DealId) -> DomainResult<()> {
        self.send(self.request(Method::DELETE).query(&[("id", eq(id.as_str()))]))
            .await?;
        Ok(())
    }
}

impl DealStore for RestDealRepository {}
