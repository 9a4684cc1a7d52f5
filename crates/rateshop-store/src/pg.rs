//! Postgres-backed [`RateStore`].
//!
//! Per-table plumbing lives in the entity modules; this impl composes them
//! and adds the cross-entity guards (self-reference, endpoint existence,
//! rate-count delete protection).

use async_trait::async_trait;
use sqlx::PgPool;

use rateshop_core::NormalizedRate;

use crate::competitors::{self, CompetitorRow};
use crate::import_batches::{self, BatchFilter, ImportBatchRow};
use crate::properties::{self, NewProperty, PropertyFilter, PropertyRow, UpdateProperty};
use crate::rate_records::{self, RateFilter, RateRecordRow};
use crate::stats::{self, StatsSummary};
use crate::store::RateStore;
use crate::StoreError;

#[derive(Debug, Clone)]
pub struct PgRateStore {
    pool: PgPool,
}

impl PgRateStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn require_property(&self, id: i64) -> Result<PropertyRow, StoreError> {
        properties::get_property(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "property",
                id,
            })
    }
}

#[async_trait]
impl RateStore for PgRateStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::ping(&self.pool).await.map_err(StoreError::from)
    }

    // -- properties ---------------------------------------------------------

    async fn create_property(&self, new: &NewProperty) -> Result<PropertyRow, StoreError> {
        properties::create_property(&self.pool, new).await
    }

    async fn get_property(&self, id: i64) -> Result<Option<PropertyRow>, StoreError> {
        properties::get_property(&self.pool, id).await
    }

    async fn list_properties(
        &self,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRow>, StoreError> {
        properties::list_properties(&self.pool, filter).await
    }

    async fn update_property(
        &self,
        id: i64,
        update: &UpdateProperty,
    ) -> Result<PropertyRow, StoreError> {
        properties::update_property(&self.pool, id, update).await
    }

    async fn delete_property(&self, id: i64) -> Result<(), StoreError> {
        let rate_count = rate_records::count_rates_for_property(&self.pool, id).await?;
        if rate_count > 0 {
            return Err(StoreError::PropertyHasRates { id, rate_count });
        }
        properties::delete_property(&self.pool, id).await
    }

    // -- competitor graph ---------------------------------------------------

    async fn add_competitor(
        &self,
        property_id: i64,
        competitor_id: i64,
    ) -> Result<bool, StoreError> {
        if property_id == competitor_id {
            return Err(StoreError::SelfReference { property_id });
        }
        self.require_property(property_id).await?;
        self.require_property(competitor_id).await?;
        competitors::add_competitor(&self.pool, property_id, competitor_id).await
    }

    async fn remove_competitor(
        &self,
        property_id: i64,
        competitor_id: i64,
    ) -> Result<(), StoreError> {
        competitors::remove_competitor(&self.pool, property_id, competitor_id).await
    }

    async fn list_competitors(&self, property_id: i64) -> Result<Vec<CompetitorRow>, StoreError> {
        competitors::list_competitors(&self.pool, property_id).await
    }

    // -- import ledger ------------------------------------------------------

    async fn begin_import(
        &self,
        property_id: i64,
        source_filename: &str,
        stored_filename: Option<&str>,
    ) -> Result<ImportBatchRow, StoreError> {
        import_batches::begin_import(&self.pool, property_id, source_filename, stored_filename)
            .await
    }

    async fn finalize_import(
        &self,
        batch_id: i64,
        total_rows: i32,
        accepted_rows: i32,
        rejected_rows: i32,
        errors: &[String],
    ) -> Result<ImportBatchRow, StoreError> {
        import_batches::finalize_import(
            &self.pool,
            batch_id,
            total_rows,
            accepted_rows,
            rejected_rows,
            errors,
        )
        .await
    }

    async fn mark_import_failed(&self, batch_id: i64, message: &str) -> Result<(), StoreError> {
        import_batches::mark_import_failed(&self.pool, batch_id, message).await
    }

    async fn get_import_batch(&self, id: i64) -> Result<Option<ImportBatchRow>, StoreError> {
        import_batches::get_import_batch(&self.pool, id).await
    }

    async fn list_import_batches(
        &self,
        filter: &BatchFilter,
    ) -> Result<Vec<ImportBatchRow>, StoreError> {
        import_batches::list_import_batches(&self.pool, filter).await
    }

    async fn delete_import_batch(&self, id: i64) -> Result<ImportBatchRow, StoreError> {
        import_batches::delete_import_batch(&self.pool, id).await
    }

    // -- rate records -------------------------------------------------------

    async fn insert_rates(
        &self,
        property_id: i64,
        batch_id: i64,
        rates: &[NormalizedRate],
    ) -> Result<u64, StoreError> {
        rate_records::insert_rates(&self.pool, property_id, batch_id, rates).await
    }

    async fn create_rate(
        &self,
        property_id: i64,
        rate: &NormalizedRate,
    ) -> Result<RateRecordRow, StoreError> {
        self.require_property(property_id).await?;
        rate_records::create_rate(&self.pool, property_id, rate).await
    }

    async fn update_rate(
        &self,
        id: i64,
        rate: &NormalizedRate,
    ) -> Result<RateRecordRow, StoreError> {
        rate_records::update_rate(&self.pool, id, rate).await
    }

    async fn delete_rate(&self, id: i64) -> Result<(), StoreError> {
        rate_records::delete_rate(&self.pool, id).await
    }

    async fn query_rates(&self, filter: &RateFilter) -> Result<Vec<RateRecordRow>, StoreError> {
        rate_records::query_rates(&self.pool, filter).await
    }

    // -- totals -------------------------------------------------------------

    async fn stats(&self) -> Result<StatsSummary, StoreError> {
        stats::stats(&self.pool).await
    }
}
