//! In-memory [`RateStore`] used when `DATABASE_URL` is absent.
//!
//! Every operation observes the same ordering, guard, and error semantics as
//! the Postgres backend so the HTTP surface behaves identically against
//! either. Data lives for the process lifetime only.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::RwLock;

use rateshop_core::{ImportStatus, NormalizedRate};

use crate::competitors::CompetitorRow;
use crate::import_batches::{BatchFilter, ImportBatchRow};
use crate::properties::{NewProperty, PropertyFilter, PropertyRow, UpdateProperty};
use crate::rate_records::{RateFilter, RateRecordRow};
use crate::stats::StatsSummary;
use crate::store::RateStore;
use crate::StoreError;

#[derive(Debug, Default)]
struct Inner {
    properties: BTreeMap<i64, PropertyRow>,
    /// Directed edges keyed by (tracker, tracked), valued by link time.
    edges: BTreeMap<(i64, i64), DateTime<Utc>>,
    batches: BTreeMap<i64, ImportBatchRow>,
    rates: BTreeMap<i64, RateRecordRow>,
    next_property_id: i64,
    next_batch_id: i64,
    next_rate_id: i64,
}

impl Inner {
    fn property_name(&self, id: i64) -> Option<String> {
        self.properties.get(&id).map(|p| p.name.clone())
    }

    /// Batches carry the owning property's name the way the SQL join does;
    /// re-resolve it at read time so renames show through.
    fn with_current_name(&self, mut batch: ImportBatchRow) -> ImportBatchRow {
        if let Some(name) = self.property_name(batch.property_id) {
            batch.property_name = name;
        }
        batch
    }
}

#[derive(Debug, Default)]
pub struct MemRateStore {
    inner: RwLock<Inner>,
}

impl MemRateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// `OFFSET`/`LIMIT` equivalent; `None` limit returns everything.
fn page<T>(rows: Vec<T>, limit: Option<i64>, offset: i64) -> Vec<T> {
    let skip = usize::try_from(offset).unwrap_or(0);
    let take = limit
        .and_then(|l| usize::try_from(l).ok())
        .unwrap_or(usize::MAX);
    rows.into_iter().skip(skip).take(take).collect()
}

/// `ILIKE '%term%'` equivalent.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl RateStore for MemRateStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    // -- properties ---------------------------------------------------------

    async fn create_property(&self, new: &NewProperty) -> Result<PropertyRow, StoreError> {
        let mut inner = self.inner.write().await;

        if inner.properties.values().any(|p| p.name == new.name) {
            return Err(StoreError::DuplicateName {
                name: new.name.clone(),
            });
        }

        inner.next_property_id += 1;
        let now = Utc::now();
        let row = PropertyRow {
            id: inner.next_property_id,
            name: new.name.clone(),
            location: new.location.clone(),
            booking_url: new.booking_url.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        inner.properties.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_property(&self, id: i64) -> Result<Option<PropertyRow>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.properties.get(&id).cloned())
    }

    async fn list_properties(
        &self,
        filter: &PropertyFilter,
    ) -> Result<Vec<PropertyRow>, StoreError> {
        let inner = self.inner.read().await;

        let mut rows: Vec<PropertyRow> = inner
            .properties
            .values()
            .filter(|p| {
                filter.search.as_deref().is_none_or(|term| {
                    contains_ci(&p.name, term)
                        || p.location
                            .as_deref()
                            .is_some_and(|loc| contains_ci(loc, term))
                })
            })
            .filter(|p| filter.active.is_none_or(|active| p.is_active == active))
            .cloned()
            .collect();

        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(page(rows, filter.limit, filter.offset))
    }

    async fn update_property(
        &self,
        id: i64,
        update: &UpdateProperty,
    ) -> Result<PropertyRow, StoreError> {
        let mut inner = self.inner.write().await;

        if !inner.properties.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: "property",
                id,
            });
        }
        if inner
            .properties
            .values()
            .any(|p| p.id != id && p.name == update.name)
        {
            return Err(StoreError::DuplicateName {
                name: update.name.clone(),
            });
        }

        let row = inner
            .properties
            .get_mut(&id)
            .ok_or(StoreError::NotFound {
                entity: "property",
                id,
            })?;
        row.name = update.name.clone();
        row.location = update.location.clone();
        row.booking_url = update.booking_url.clone();
        if let Some(active) = update.is_active {
            row.is_active = active;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_property(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if !inner.properties.contains_key(&id) {
            return Err(StoreError::NotFound {
                entity: "property",
                id,
            });
        }
        let rate_count = inner
            .rates
            .values()
            .filter(|r| r.property_id == id)
            .count();
        if rate_count > 0 {
            return Err(StoreError::PropertyHasRates {
                id,
                rate_count: i64::try_from(rate_count).unwrap_or(i64::MAX),
            });
        }

        inner.properties.remove(&id);
        // Same reach as the FK cascades: edges touching either endpoint and
        // the property's (rate-free) batches go with it.
        inner
            .edges
            .retain(|(from, to), _| *from != id && *to != id);
        inner.batches.retain(|_, b| b.property_id != id);
        Ok(())
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

        let mut inner = self.inner.write().await;
        for id in [property_id, competitor_id] {
            if !inner.properties.contains_key(&id) {
                return Err(StoreError::NotFound {
                    entity: "property",
                    id,
                });
            }
        }

        let key = (property_id, competitor_id);
        if inner.edges.contains_key(&key) {
            return Ok(false);
        }
        inner.edges.insert(key, Utc::now());
        Ok(true)
    }

    async fn remove_competitor(
        &self,
        property_id: i64,
        competitor_id: i64,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.edges.remove(&(property_id, competitor_id)).is_none() {
            return Err(StoreError::EdgeNotFound {
                property_id,
                competitor_id,
            });
        }
        Ok(())
    }

    async fn list_competitors(&self, property_id: i64) -> Result<Vec<CompetitorRow>, StoreError> {
        let inner = self.inner.read().await;

        let mut rows: Vec<CompetitorRow> = inner
            .edges
            .iter()
            .filter(|((from, _), _)| *from == property_id)
            .filter_map(|((_, to), linked_at)| {
                inner.properties.get(to).map(|p| CompetitorRow {
                    id: p.id,
                    name: p.name.clone(),
                    location: p.location.clone(),
                    linked_at: *linked_at,
                })
            })
            .collect();

        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(rows)
    }

    // -- import ledger ------------------------------------------------------

    async fn begin_import(
        &self,
        property_id: i64,
        source_filename: &str,
        stored_filename: Option<&str>,
    ) -> Result<ImportBatchRow, StoreError> {
        let mut inner = self.inner.write().await;

        let property_name =
            inner
                .property_name(property_id)
                .ok_or(StoreError::NotFound {
                    entity: "property",
                    id: property_id,
                })?;

        inner.next_batch_id += 1;
        let row = ImportBatchRow {
            id: inner.next_batch_id,
            property_id,
            property_name,
            source_filename: source_filename.to_string(),
            stored_filename: stored_filename.map(ToString::to_string),
            status: ImportStatus::Processing.as_str().to_string(),
            total_rows: 0,
            accepted_rows: 0,
            rejected_rows: 0,
            error_details: None,
            imported_at: Utc::now(),
            completed_at: None,
        };
        inner.batches.insert(row.id, row.clone());
        Ok(row)
    }

    async fn finalize_import(
        &self,
        batch_id: i64,
        total_rows: i32,
        accepted_rows: i32,
        rejected_rows: i32,
        errors: &[String],
    ) -> Result<ImportBatchRow, StoreError> {
        let mut inner = self.inner.write().await;

        let batch = inner
            .batches
            .get_mut(&batch_id)
            .ok_or(StoreError::NotFound {
                entity: "import batch",
                id: batch_id,
            })?;
        if batch.status != ImportStatus::Processing.as_str() {
            return Err(StoreError::InvalidBatchTransition {
                id: batch_id,
                expected: "processing",
            });
        }

        let status = ImportStatus::from_counts(accepted_rows, rejected_rows);
        batch.status = status.as_str().to_string();
        batch.total_rows = total_rows;
        batch.accepted_rows = accepted_rows;
        batch.rejected_rows = rejected_rows;
        batch.error_details = if errors.is_empty() {
            None
        } else {
            Some(json!(errors))
        };
        batch.completed_at = Some(Utc::now());

        let row = batch.clone();
        Ok(inner.with_current_name(row))
    }

    async fn mark_import_failed(&self, batch_id: i64, message: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(batch) = inner.batches.get_mut(&batch_id) {
            if batch.status == ImportStatus::Processing.as_str() {
                batch.status = ImportStatus::Error.as_str().to_string();
                batch.error_details = Some(json!([message]));
                batch.completed_at = Some(Utc::now());
            }
        }
        Ok(())
    }

    async fn get_import_batch(&self, id: i64) -> Result<Option<ImportBatchRow>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .batches
            .get(&id)
            .cloned()
            .map(|b| inner.with_current_name(b)))
    }

    async fn list_import_batches(
        &self,
        filter: &BatchFilter,
    ) -> Result<Vec<ImportBatchRow>, StoreError> {
        let inner = self.inner.read().await;

        let mut rows: Vec<ImportBatchRow> = inner
            .batches
            .values()
            .filter(|b| filter.property_id.is_none_or(|id| b.property_id == id))
            .cloned()
            .map(|b| inner.with_current_name(b))
            .collect();

        rows.sort_by(|a, b| {
            b.imported_at
                .cmp(&a.imported_at)
                .then(b.id.cmp(&a.id))
        });
        Ok(page(rows, filter.limit, filter.offset))
    }

    async fn delete_import_batch(&self, id: i64) -> Result<ImportBatchRow, StoreError> {
        let mut inner = self.inner.write().await;

        let batch = inner.batches.remove(&id).ok_or(StoreError::NotFound {
            entity: "import batch",
            id,
        })?;
        inner.rates.retain(|_, r| r.import_batch_id != Some(id));
        Ok(inner.with_current_name(batch))
    }

    // -- rate records -------------------------------------------------------

    async fn insert_rates(
        &self,
        property_id: i64,
        batch_id: i64,
        rates: &[NormalizedRate],
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut written: u64 = 0;

        for rate in rates {
            inner.next_rate_id += 1;
            let row = RateRecordRow {
                id: inner.next_rate_id,
                property_id,
                import_batch_id: Some(batch_id),
                checkin_date: rate.checkin_date,
                checkout_date: rate.checkout_date,
                price: rate.price,
                currency: rate.currency.clone(),
                channel: rate.channel.clone(),
                room_type: rate.room_type.clone(),
                created_at: Utc::now(),
            };
            inner.rates.insert(row.id, row);
            written += 1;
        }
        Ok(written)
    }

    async fn create_rate(
        &self,
        property_id: i64,
        rate: &NormalizedRate,
    ) -> Result<RateRecordRow, StoreError> {
        let mut inner = self.inner.write().await;

        if !inner.properties.contains_key(&property_id) {
            return Err(StoreError::NotFound {
                entity: "property",
                id: property_id,
            });
        }

        inner.next_rate_id += 1;
        let row = RateRecordRow {
            id: inner.next_rate_id,
            property_id,
            import_batch_id: None,
            checkin_date: rate.checkin_date,
            checkout_date: rate.checkout_date,
            price: rate.price,
            currency: rate.currency.clone(),
            channel: rate.channel.clone(),
            room_type: rate.room_type.clone(),
            created_at: Utc::now(),
        };
        inner.rates.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_rate(
        &self,
        id: i64,
        rate: &NormalizedRate,
    ) -> Result<RateRecordRow, StoreError> {
        let mut inner = self.inner.write().await;

        let row = inner.rates.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "rate record",
            id,
        })?;
        row.checkin_date = rate.checkin_date;
        row.checkout_date = rate.checkout_date;
        row.price = rate.price;
        row.currency = rate.currency.clone();
        row.channel = rate.channel.clone();
        row.room_type = rate.room_type.clone();
        Ok(row.clone())
    }

    async fn delete_rate(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if inner.rates.remove(&id).is_none() {
            return Err(StoreError::NotFound {
                entity: "rate record",
                id,
            });
        }
        Ok(())
    }

    async fn query_rates(&self, filter: &RateFilter) -> Result<Vec<RateRecordRow>, StoreError> {
        let inner = self.inner.read().await;

        let mut rows: Vec<RateRecordRow> = inner
            .rates
            .values()
            .filter(|r| filter.property_id.is_none_or(|id| r.property_id == id))
            .filter(|r| filter.start_date.is_none_or(|d| r.checkin_date >= d))
            .filter(|r| filter.end_date.is_none_or(|d| r.checkin_date <= d))
            .filter(|r| {
                filter
                    .channel
                    .as_deref()
                    .is_none_or(|term| contains_ci(&r.channel, term))
            })
            .filter(|r| {
                filter
                    .room_type
                    .as_deref()
                    .is_none_or(|term| contains_ci(&r.room_type, term))
            })
            .filter(|r| filter.min_price.is_none_or(|p| r.price >= p))
            .filter(|r| filter.max_price.is_none_or(|p| r.price <= p))
            .cloned()
            .collect();

        rows.sort_by(|a, b| a.checkin_date.cmp(&b.checkin_date).then(a.id.cmp(&b.id)));
        Ok(page(rows, filter.limit, filter.offset))
    }

    // -- totals -------------------------------------------------------------

    async fn stats(&self) -> Result<StatsSummary, StoreError> {
        let inner = self.inner.read().await;

        let last_import = inner
            .batches
            .values()
            .max_by(|a, b| {
                a.imported_at
                    .cmp(&b.imported_at)
                    .then(a.id.cmp(&b.id))
            })
            .cloned()
            .map(|b| inner.with_current_name(b));

        Ok(StatsSummary {
            total_properties: i64::try_from(inner.properties.len()).unwrap_or(i64::MAX),
            total_rate_records: i64::try_from(inner.rates.len()).unwrap_or(i64::MAX),
            total_competitor_links: i64::try_from(inner.edges.len()).unwrap_or(i64::MAX),
            total_import_batches: i64::try_from(inner.batches.len()).unwrap_or(i64::MAX),
            last_import,
        })
    }
}
