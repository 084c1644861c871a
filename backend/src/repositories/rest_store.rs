//! Partition store backed by the hosted database's REST query API.
//!
//! The API follows PostgREST conventions: one resource per table under
//! `/rest/v1/`, filters as `column=op.value` query parameters, exact counts
//! through `Prefer: count=exact` and the `Content-Range` header, and
//! `Prefer: return=representation` to get written rows back.

use super::partition_store::PartitionStore;
use crate::database::models::{
    AdministratorRow, ColumnValues, DoctorRow, Partition, PartitionRecord, PatientRow, RowFilter,
};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header::CONTENT_RANGE};
use serde_json::{Map, Value};
use std::time::Duration;

pub struct RestStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("failed to build HTTP client for the identity store")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table_url(&self, partition: Partition) -> String {
        format!("{}/rest/v1/{}", self.base_url, partition.table())
    }

    fn request(&self, method: Method, partition: Partition) -> RequestBuilder {
        self.client
            .request(method, self.table_url(partition))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Renders filters as PostgREST query parameters.
fn filter_params(filters: &[RowFilter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            RowFilter::Eq(column, value) => {
                (column.to_string(), format!("eq.{}", value.to_filter_literal()))
            }
            RowFilter::NotEq(column, value) => {
                (column.to_string(), format!("neq.{}", value.to_filter_literal()))
            }
        })
        .collect()
}

fn json_body(values: &ColumnValues) -> Result<Value> {
    let mut body = Map::new();
    for (column, value) in values {
        body.insert(column.to_string(), serde_json::to_value(value)?);
    }
    Ok(Value::Object(body))
}

/// Extracts the total from a `Content-Range` value such as `0-9/42` or `*/0`.
fn content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("{} failed with status {}: {}", operation, status, body)
}

fn decode_records(partition: Partition, body: &str) -> Result<Vec<PartitionRecord>> {
    let records = match partition {
        Partition::Administrators => serde_json::from_str::<Vec<AdministratorRow>>(body)?
            .into_iter()
            .map(PartitionRecord::Admin)
            .collect(),
        Partition::Doctors => serde_json::from_str::<Vec<DoctorRow>>(body)?
            .into_iter()
            .map(PartitionRecord::Doctor)
            .collect(),
        Partition::Patients => serde_json::from_str::<Vec<PatientRow>>(body)?
            .into_iter()
            .map(PartitionRecord::Patient)
            .collect(),
    };
    Ok(records)
}

async fn read_records(
    response: Response,
    partition: Partition,
    operation: &str,
) -> Result<Vec<PartitionRecord>> {
    let response = ensure_success(response, operation).await?;
    let body = response.text().await?;
    decode_records(partition, &body)
        .with_context(|| format!("{} returned an unexpected row shape", operation))
}

#[async_trait]
impl PartitionStore for RestStore {
    async fn select_one(
        &self,
        partition: Partition,
        filters: &[RowFilter],
    ) -> Result<Option<PartitionRecord>> {
        let operation = format!("select from {}", partition.table());
        let response = self
            .request(Method::GET, partition)
            .query(&[("select", "*"), ("limit", "1")])
            .query(&filter_params(filters))
            .send()
            .await
            .with_context(|| format!("{} could not reach the store", operation))?;

        Ok(read_records(response, partition, &operation)
            .await?
            .into_iter()
            .next())
    }

    async fn count(&self, partition: Partition, filters: &[RowFilter]) -> Result<u64> {
        let operation = format!("count on {}", partition.table());
        let response = self
            .request(Method::HEAD, partition)
            .header("Prefer", "count=exact")
            .query(&[("select", "id")])
            .query(&filter_params(filters))
            .send()
            .await
            .with_context(|| format!("{} could not reach the store", operation))?;
        let response = ensure_success(response, &operation).await?;

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(content_range_total)
            .ok_or_else(|| anyhow!("{} returned no usable Content-Range header", operation))
    }

    async fn insert(&self, partition: Partition, values: ColumnValues) -> Result<PartitionRecord> {
        let operation = format!("insert into {}", partition.table());
        let response = self
            .request(Method::POST, partition)
            .header("Prefer", "return=representation")
            .json(&json_body(&values)?)
            .send()
            .await
            .with_context(|| format!("{} could not reach the store", operation))?;

        read_records(response, partition, &operation)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} returned no row", operation))
    }

    async fn update(
        &self,
        partition: Partition,
        id: &str,
        values: ColumnValues,
    ) -> Result<Option<PartitionRecord>> {
        let id_filter = [RowFilter::Eq("id", id.into())];
        if values.is_empty() {
            return self.select_one(partition, &id_filter).await;
        }

        let operation = format!("update of {}", partition.table());
        let response = self
            .request(Method::PATCH, partition)
            .header("Prefer", "return=representation")
            .query(&filter_params(&id_filter))
            .json(&json_body(&values)?)
            .send()
            .await
            .with_context(|| format!("{} could not reach the store", operation))?;

        Ok(read_records(response, partition, &operation)
            .await?
            .into_iter()
            .next())
    }

    async fn ping(&self) -> Result<()> {
        let response = self
            .request(Method::GET, Partition::Administrators)
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await
            .context("identity store is unreachable")?;
        ensure_success(response, "ping").await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::ColumnValue;

    #[test]
    fn test_filter_params() {
        let params = filter_params(&[
            RowFilter::Eq("email", ColumnValue::from("ana@clinic.test")),
            Partition::Administrators.active_filter(),
            Partition::Doctors.active_filter(),
            RowFilter::NotEq("id", ColumnValue::from("7")),
        ]);
        assert_eq!(
            params,
            vec![
                ("email".to_string(), "eq.ana@clinic.test".to_string()),
                ("status".to_string(), "eq.1".to_string()),
                ("is_active".to_string(), "eq.true".to_string()),
                ("id".to_string(), "neq.7".to_string()),
            ]
        );
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total("0-0/3"), Some(3));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn test_json_body_keeps_nulls() {
        let body = json_body(&vec![
            ("first_name", ColumnValue::from("Ana")),
            ("phone", ColumnValue::Text(None)),
            ("is_active", ColumnValue::Bool(true)),
            ("specialty_id", ColumnValue::Integer(Some(3))),
        ])
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "first_name": "Ana",
                "phone": null,
                "is_active": true,
                "specialty_id": 3
            })
        );
    }

    #[test]
    fn test_decode_records_per_partition() {
        let body = r#"[{
            "id": 5,
            "email": "ana@clinic.test",
            "first_name": "Ana",
            "last_names": "Torres",
            "password_hash": "$2b$04$hash",
            "status": 1,
            "district": "Miraflores"
        }]"#;
        let records = decode_records(Partition::Administrators, body).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "5");
        assert_eq!(records[0].partition(), Partition::Administrators);

        assert!(decode_records(Partition::Doctors, body).is_err());
        assert!(decode_records(Partition::Patients, "[]").unwrap().is_empty());
    }

    #[test]
    fn test_table_urls() {
        let store = RestStore::new("https://store.example.test/", "key", 5).unwrap();
        assert_eq!(
            store.table_url(Partition::Doctors),
            "https://store.example.test/rest/v1/doctors"
        );
    }
}
