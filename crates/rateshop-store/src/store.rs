//! The storage seam: one trait, two backends.
//!
//! [`crate::PgRateStore`] and [`crate::MemRateStore`] implement identical
//! observable semantics for every operation here; the backend is chosen once
//! at startup (see [`crate::build_store`]) and never mixed.

use async_trait::async_trait;

use rateshop_core::NormalizedRate;

use crate::competitors::CompetitorRow;
use crate::import_batches::{BatchFilter, ImportBatchRow};
use crate::properties::{NewProperty, PropertyFilter, PropertyRow, UpdateProperty};
use crate::rate_records::{RateFilter, RateRecordRow};
use crate::stats::StatsSummary;
use crate::StoreError;

#[async_trait]
pub trait RateStore: Send + Sync {
    /// Cheap storage reachability probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;

    // -- properties ---------------------------------------------------------

    /// # Errors
    ///
    /// [`StoreError::DuplicateName`] when the name is already taken.
    async fn create_property(&self, new: &NewProperty) -> Result<PropertyRow, StoreError>;

    async fn get_property(&self, id: i64) -> Result<Option<PropertyRow>, StoreError>;

    async fn list_properties(&self, filter: &PropertyFilter) -> Result<Vec<PropertyRow>, StoreError>;

    /// Full replace of the editable fields; `is_active` is kept when absent.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown id, [`StoreError::DuplicateName`]
    /// when the new name collides with another property.
    async fn update_property(
        &self,
        id: i64,
        update: &UpdateProperty,
    ) -> Result<PropertyRow, StoreError>;

    /// Hard delete. Competitor edges and (empty) import batches cascade.
    ///
    /// # Errors
    ///
    /// [`StoreError::PropertyHasRates`] while any rate records reference the
    /// property, [`StoreError::NotFound`] for an unknown id.
    async fn delete_property(&self, id: i64) -> Result<(), StoreError>;

    // -- competitor graph ---------------------------------------------------

    /// Add a directed "tracks" edge. Returns `true` when the edge was
    /// created, `false` when it already existed (idempotent no-op).
    ///
    /// # Errors
    ///
    /// [`StoreError::SelfReference`] when both ids are equal,
    /// [`StoreError::NotFound`] when either endpoint is missing.
    async fn add_competitor(&self, property_id: i64, competitor_id: i64)
        -> Result<bool, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::EdgeNotFound`] when no such edge exists.
    async fn remove_competitor(
        &self,
        property_id: i64,
        competitor_id: i64,
    ) -> Result<(), StoreError>;

    /// Outbound edges only, ordered by competitor name.
    async fn list_competitors(&self, property_id: i64) -> Result<Vec<CompetitorRow>, StoreError>;

    // -- import ledger ------------------------------------------------------

    /// Create the `processing` batch row. Always precedes any rate write
    /// that references the batch.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown property.
    async fn begin_import(
        &self,
        property_id: i64,
        source_filename: &str,
        stored_filename: Option<&str>,
    ) -> Result<ImportBatchRow, StoreError>;

    /// Sole transition out of `processing`. The terminal status is derived
    /// from the counts; `errors` is the capped row-error list.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown batch,
    /// [`StoreError::InvalidBatchTransition`] when the batch was already
    /// finalized.
    async fn finalize_import(
        &self,
        batch_id: i64,
        total_rows: i32,
        accepted_rows: i32,
        rejected_rows: i32,
        errors: &[String],
    ) -> Result<ImportBatchRow, StoreError>;

    /// Best-effort `error` marking for the persistence-failure path. Does
    /// nothing when the batch is missing or already terminal.
    async fn mark_import_failed(&self, batch_id: i64, message: &str) -> Result<(), StoreError>;

    async fn get_import_batch(&self, id: i64) -> Result<Option<ImportBatchRow>, StoreError>;

    async fn list_import_batches(
        &self,
        filter: &BatchFilter,
    ) -> Result<Vec<ImportBatchRow>, StoreError>;

    /// Delete the batch and, atomically, every rate record referencing it.
    /// Returns the deleted row so callers can clean up the stored workbook.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown batch.
    async fn delete_import_batch(&self, id: i64) -> Result<ImportBatchRow, StoreError>;

    // -- rate records -------------------------------------------------------

    /// Persist a batch's accepted rows in one transaction. Returns the
    /// number of rows written.
    async fn insert_rates(
        &self,
        property_id: i64,
        batch_id: i64,
        rates: &[NormalizedRate],
    ) -> Result<u64, StoreError>;

    /// Manually-entered rate; carries no batch provenance.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown property.
    async fn create_rate(
        &self,
        property_id: i64,
        rate: &NormalizedRate,
    ) -> Result<RateRecordRow, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown rate record.
    async fn update_rate(&self, id: i64, rate: &NormalizedRate)
        -> Result<RateRecordRow, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] for an unknown rate record.
    async fn delete_rate(&self, id: i64) -> Result<(), StoreError>;

    /// Filtered listing, ordered by check-in date then id.
    async fn query_rates(&self, filter: &RateFilter) -> Result<Vec<RateRecordRow>, StoreError>;

    // -- totals -------------------------------------------------------------

    async fn stats(&self) -> Result<StatsSummary, StoreError>;
}
