//! Hosted relational backend reached through a PostgREST-style HTTP API.
//!
//! Tables: `shipments` (purchase orders kept as a JSON column),
//! `cost_records` keyed by `shipment_id`, and `documents`.

use crate::domain::model::{CostRecord, Dataset, Document, Shipment, ShipmentStatus};
use crate::domain::ports::Repository;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub struct RestRepository {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl RestRepository {
    pub fn new(endpoint: &str, api_key: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.endpoint, table);
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }
        builder
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!("Backend request failed with {}: {}", status, body);
        Err(AppError::BackendError {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        tracing::debug!("GET {}/{} {:?}", self.endpoint, table, filters);
        let response = self
            .request(Method::GET, table)
            .query(&[("select", "*")])
            .query(filters)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn upsert<T: serde::Serialize + Sync>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<()> {
        tracing::debug!("POST {}/{} (upsert on {})", self.endpoint, table, on_conflict);
        let response = self
            .request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Double-quotes a value for a PostgREST logical filter so reserved
/// characters (`,` `.` `(` `)`) stay part of the value.
fn quote_filter_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[async_trait]
impl Repository for RestRepository {
    async fn load_dataset(&self) -> Result<Dataset> {
        let (shipments, cost_records, documents) = tokio::try_join!(
            self.fetch::<Shipment>("shipments", &[]),
            self.fetch::<CostRecord>("cost_records", &[]),
            self.fetch::<Document>("documents", &[]),
        )?;
        tracing::info!(
            "Fetched {} shipments, {} cost records, {} documents from backend",
            shipments.len(),
            cost_records.len(),
            documents.len()
        );
        Ok(Dataset {
            shipments,
            cost_records,
            documents,
        })
    }

    async fn list_shipments(&self) -> Result<Vec<Shipment>> {
        self.fetch("shipments", &[("order", "code.asc".to_string())])
            .await
    }

    async fn get_shipment(&self, reference: &str) -> Result<Shipment> {
        let value = quote_filter_value(reference);
        let filter = format!("(id.eq.{0},code.eq.{0})", value);
        let rows: Vec<Shipment> = self.fetch("shipments", &[("or", filter)]).await?;
        rows.into_iter().next().ok_or_else(|| AppError::NotFound {
            entity: "shipment".to_string(),
            id: reference.to_string(),
        })
    }

    async fn save_shipment(&self, shipment: &Shipment) -> Result<()> {
        self.upsert("shipments", "id", shipment).await
    }

    async fn update_status(&self, reference: &str, status: ShipmentStatus) -> Result<Shipment> {
        let mut shipment = self.get_shipment(reference).await?;
        if !shipment.set_status(status, Utc::now())? {
            return Ok(shipment);
        }

        let response = self
            .request(Method::PATCH, "shipments")
            .query(&[("id", format!("eq.{}", shipment.id))])
            .header("Prefer", "return=minimal")
            .json(&serde_json::json!({
                "status": shipment.status,
                "status_changed_at": shipment.status_changed_at,
            }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(shipment)
    }

    async fn get_cost_record(&self, shipment_id: &str) -> Result<Option<CostRecord>> {
        let rows: Vec<CostRecord> = self
            .fetch("cost_records", &[("shipment_id", format!("eq.{}", shipment_id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn save_cost_record(&self, record: &CostRecord) -> Result<()> {
        self.upsert("cost_records", "shipment_id", record).await
    }

    async fn list_documents(&self, shipment_id: &str) -> Result<Vec<Document>> {
        self.fetch("documents", &[("shipment_id", format!("eq.{}", shipment_id))])
            .await
    }

    async fn add_document(&self, document: &Document) -> Result<()> {
        let response = self
            .request(Method::POST, "documents")
            .header("Prefer", "return=minimal")
            .json(&[document])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
