//! Storage contract for the identity partitions.
//!
//! Backends expose per-table select, count, insert and update operations with
//! single-row result semantics. They do not cache and do not retry.

use crate::database::models::{ColumnValues, Partition, PartitionRecord, RowFilter};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PartitionStore: Send + Sync {
    /// Returns the first row of `partition` matching every filter.
    async fn select_one(
        &self,
        partition: Partition,
        filters: &[RowFilter],
    ) -> Result<Option<PartitionRecord>>;

    /// Counts rows of `partition` matching every filter.
    async fn count(&self, partition: Partition, filters: &[RowFilter]) -> Result<u64>;

    /// Inserts one row and returns it as stored.
    async fn insert(&self, partition: Partition, values: ColumnValues) -> Result<PartitionRecord>;

    /// Applies a partial update to the row with `id`, returning the updated row.
    async fn update(
        &self,
        partition: Partition,
        id: &str,
        values: ColumnValues,
    ) -> Result<Option<PartitionRecord>>;

    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}
