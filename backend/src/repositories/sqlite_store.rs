//! SQLite implementation of the partition store.
//!
//! Queries are assembled with `QueryBuilder`. Column names only ever come from
//! the static partition and field tables; values are always bound.

use super::partition_store::PartitionStore;
use crate::database::Database;
use crate::database::models::{
    AdministratorRow, ColumnValue, ColumnValues, DoctorRow, Partition, PartitionRecord, PatientRow,
    RowFilter,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite};

pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn fetch_optional(
        &self,
        partition: Partition,
        builder: &mut QueryBuilder<'_, Sqlite>,
    ) -> Result<Option<PartitionRecord>> {
        let pool = self.db.pool();
        let record = match partition {
            Partition::Administrators => builder
                .build_query_as::<AdministratorRow>()
                .fetch_optional(pool)
                .await?
                .map(PartitionRecord::Admin),
            Partition::Doctors => builder
                .build_query_as::<DoctorRow>()
                .fetch_optional(pool)
                .await?
                .map(PartitionRecord::Doctor),
            Partition::Patients => builder
                .build_query_as::<PatientRow>()
                .fetch_optional(pool)
                .await?
                .map(PartitionRecord::Patient),
        };
        Ok(record)
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Sqlite>, value: &ColumnValue) {
    match value.clone() {
        ColumnValue::Text(text) => builder.push_bind(text),
        ColumnValue::Integer(number) => builder.push_bind(number),
        ColumnValue::Bool(flag) => builder.push_bind(flag),
        ColumnValue::Date(date) => builder.push_bind(date),
        ColumnValue::Timestamp(at) => builder.push_bind(at),
    };
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filters: &[RowFilter]) {
    for (index, filter) in filters.iter().enumerate() {
        builder.push(if index == 0 { " WHERE " } else { " AND " });
        match filter {
            RowFilter::Eq(column, value) => {
                builder.push(*column).push(" = ");
                push_value(builder, value);
            }
            RowFilter::NotEq(column, value) => {
                builder.push(*column).push(" <> ");
                push_value(builder, value);
            }
        }
    }
}

#[async_trait]
impl PartitionStore for SqliteStore {
    async fn select_one(
        &self,
        partition: Partition,
        filters: &[RowFilter],
    ) -> Result<Option<PartitionRecord>> {
        let mut builder = QueryBuilder::new(format!("SELECT * FROM {}", partition.table()));
        push_filters(&mut builder, filters);
        builder.push(" LIMIT 1");

        self.fetch_optional(partition, &mut builder)
            .await
            .with_context(|| format!("select from {} failed", partition.table()))
    }

    async fn count(&self, partition: Partition, filters: &[RowFilter]) -> Result<u64> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", partition.table()));
        push_filters(&mut builder, filters);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(self.db.pool())
            .await
            .with_context(|| format!("count on {} failed", partition.table()))?;

        Ok(count.max(0) as u64)
    }

    async fn insert(&self, partition: Partition, values: ColumnValues) -> Result<PartitionRecord> {
        let mut builder = QueryBuilder::new(format!("INSERT INTO {} (", partition.table()));
        for (index, (column, _)) in values.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push(*column);
        }
        builder.push(") VALUES (");
        for (index, (_, value)) in values.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(") RETURNING *");

        self.fetch_optional(partition, &mut builder)
            .await
            .with_context(|| format!("insert into {} failed", partition.table()))?
            .with_context(|| format!("insert into {} returned no row", partition.table()))
    }

    async fn update(
        &self,
        partition: Partition,
        id: &str,
        values: ColumnValues,
    ) -> Result<Option<PartitionRecord>> {
        let id_filter = [RowFilter::Eq("id", ColumnValue::from(id))];
        if values.is_empty() {
            return self.select_one(partition, &id_filter).await;
        }

        let mut builder = QueryBuilder::new(format!("UPDATE {} SET ", partition.table()));
        for (index, (column, value)) in values.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            builder.push(*column).push(" = ");
            push_value(&mut builder, value);
        }
        push_filters(&mut builder, &id_filter);
        builder.push(" RETURNING *");

        self.fetch_optional(partition, &mut builder)
            .await
            .with_context(|| format!("update of {} failed", partition.table()))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.db.pool())
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
