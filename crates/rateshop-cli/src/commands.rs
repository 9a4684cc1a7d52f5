//! Command handlers for the CLI.
//!
//! Called from `main` once the store connection is established. User-facing
//! output goes to stdout; diagnostics go through `tracing`.

use std::path::Path;

use chrono::NaiveDate;

use rateshop_core::analysis::{build_comparison, ComparisonPeriod, PricePoint, PropertySeries};
use rateshop_import::{normalize_rows, read_first_sheet};
use rateshop_store::{NewProperty, PropertyFilter, PropertyRow, RateFilter, RateStore};

async fn require_property(store: &dyn RateStore, id: i64) -> anyhow::Result<PropertyRow> {
    store
        .get_property(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("property {id} not found"))
}

fn to_count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

/// Run the import pipeline for a local workbook and print the receipt.
/// The batch keeps no stored workbook copy; provenance is the original
/// filename only.
///
/// # Errors
///
/// Returns an error when the file cannot be read, the workbook cannot be
/// parsed, the property does not exist, or a store write fails. Per-row
/// rejections are printed, not propagated.
pub(crate) async fn run_import(
    store: &dyn RateStore,
    file: &Path,
    property_id: i64,
) -> anyhow::Result<()> {
    let bytes = std::fs::read(file)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("workbook.xlsx");

    let property = require_property(store, property_id).await?;
    let rows = read_first_sheet(&bytes)?;
    let outcome = normalize_rows(&rows);

    let batch = store.begin_import(property.id, filename, None).await?;

    if let Err(e) = store
        .insert_rates(property.id, batch.id, &outcome.accepted)
        .await
    {
        if let Err(mark_err) = store
            .mark_import_failed(batch.id, "failed to persist accepted rows")
            .await
        {
            tracing::error!(batch_id = batch.id, error = %mark_err, "failed to mark batch as errored");
        }
        return Err(e.into());
    }

    let total = to_count(outcome.total_rows());
    let accepted = to_count(outcome.accepted.len());
    let rejected = to_count(outcome.rejected.len());
    let errors = outcome.error_strings();

    let batch = store
        .finalize_import(batch.id, total, accepted, rejected, &errors)
        .await?;

    println!(
        "{filename}: {total} rows, {accepted} imported, {rejected} rejected for {} (batch {}, status {})",
        property.name, batch.id, batch.status
    );
    for line in &errors {
        eprintln!("  {line}");
    }
    Ok(())
}

async fn fetch_series(
    store: &dyn RateStore,
    property_id: i64,
    name: String,
    period: ComparisonPeriod,
) -> anyhow::Result<PropertySeries> {
    let rows = store
        .query_rates(&RateFilter {
            property_id: Some(property_id),
            start_date: Some(period.start_date),
            end_date: Some(period.end_date),
            ..RateFilter::default()
        })
        .await?;

    Ok(PropertySeries {
        property_id,
        name,
        points: rows
            .into_iter()
            .map(|row| PricePoint {
                stay_date: row.checkin_date,
                price: row.price,
            })
            .collect(),
    })
}

/// Build and print the comparison report for a property over a period.
///
/// # Errors
///
/// Returns an error for an inverted period, an unknown property, or a store
/// read failure.
pub(crate) async fn run_compare(
    store: &dyn RateStore,
    property_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    json: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        end_date >= start_date,
        "end date must not be before start date"
    );

    let focal_row = require_property(store, property_id).await?;
    let links = store.list_competitors(property_id).await?;

    let period = ComparisonPeriod {
        start_date,
        end_date,
    };
    let focal = fetch_series(store, focal_row.id, focal_row.name, period).await?;
    let mut competitors = Vec::with_capacity(links.len());
    for link in links {
        competitors.push(fetch_series(store, link.id, link.name, period).await?);
    }

    let report = build_comparison(&focal, &competitors, period);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{} vs {} tracked competitors, {} to {}",
        report.focal_property.name,
        report.competitors.len(),
        period.start_date,
        period.end_date
    );
    println!(
        "average rate: {:.2} over {} rates",
        report.focal_stats.mean, report.focal_stats.count
    );
    for comp in &report.competitors {
        match (&comp.stats, &comp.percentage_delta) {
            (Some(stats), Some(delta)) => {
                println!("  {}: mean {:.2}, delta {delta:.2}%", comp.name, stats.mean);
            }
            _ => println!("  {}: no rates in period", comp.name),
        }
    }
    for insight in &report.insights {
        println!("- {insight}");
    }
    Ok(())
}

/// # Errors
///
/// Returns an error when the listing query fails.
pub(crate) async fn run_properties_list(store: &dyn RateStore) -> anyhow::Result<()> {
    let rows = store.list_properties(&PropertyFilter::default()).await?;
    if rows.is_empty() {
        println!("no properties registered");
        return Ok(());
    }
    for row in rows {
        let flag = if row.is_active { "" } else { " [inactive]" };
        match &row.location {
            Some(location) => println!("{:>4}  {}{flag}  ({location})", row.id, row.name),
            None => println!("{:>4}  {}{flag}", row.id, row.name),
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns an error for a blank name, a duplicate name, or a store write
/// failure.
pub(crate) async fn run_properties_add(
    store: &dyn RateStore,
    name: String,
    location: Option<String>,
    booking_url: Option<String>,
) -> anyhow::Result<()> {
    let name = name.trim().to_owned();
    anyhow::ensure!(!name.is_empty(), "property name must not be empty");

    let row = store
        .create_property(&NewProperty {
            name,
            location,
            booking_url,
        })
        .await?;
    println!("created property {} ({})", row.id, row.name);
    Ok(())
}

/// # Errors
///
/// Returns an error when the totals query fails.
pub(crate) async fn run_stats(store: &dyn RateStore) -> anyhow::Result<()> {
    let summary = store.stats().await?;
    println!("properties:       {}", summary.total_properties);
    println!("rate records:     {}", summary.total_rate_records);
    println!("competitor links: {}", summary.total_competitor_links);
    println!("import batches:   {}", summary.total_import_batches);
    match &summary.last_import {
        Some(batch) => println!(
            "last import:      {} for {} ({})",
            batch.imported_at, batch.property_name, batch.status
        ),
        None => println!("last import:      never"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rateshop_store::{BatchFilter, MemRateStore};

    static MIXED_XLSX: &[u8] =
        include_bytes!("../../rateshop-import/tests/fixtures/rates_mixed.xlsx");

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn seed_property(store: &dyn RateStore, name: &str) -> i64 {
        store
            .create_property(&NewProperty {
                name: name.to_owned(),
                location: None,
                booking_url: None,
            })
            .await
            .expect("create property")
            .id
    }

    #[tokio::test]
    async fn import_runs_pipeline_and_finalizes_batch() {
        let store = MemRateStore::new();
        let id = seed_property(&store, "Hotel Foco").await;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rates_junho.xlsx");
        std::fs::write(&path, MIXED_XLSX).expect("write fixture");

        run_import(&store, &path, id).await.expect("import");

        let batches = store
            .list_import_batches(&BatchFilter::default())
            .await
            .expect("list batches");
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].status, "success_with_errors");
        assert_eq!(batches[0].accepted_rows, 2);
        assert_eq!(batches[0].rejected_rows, 5);
        assert_eq!(batches[0].source_filename, "rates_junho.xlsx");
        assert!(batches[0].stored_filename.is_none());

        let rates = store
            .query_rates(&RateFilter {
                property_id: Some(id),
                ..RateFilter::default()
            })
            .await
            .expect("query rates");
        assert_eq!(rates.len(), 2);
    }

    #[tokio::test]
    async fn import_unknown_property_fails_before_any_write() {
        let store = MemRateStore::new();
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rates.xlsx");
        std::fs::write(&path, MIXED_XLSX).expect("write fixture");

        let err = run_import(&store, &path, 42)
            .await
            .expect_err("unknown property");
        assert_eq!(err.to_string(), "property 42 not found");

        let batches = store
            .list_import_batches(&BatchFilter::default())
            .await
            .expect("list batches");
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn compare_requires_known_property() {
        let store = MemRateStore::new();
        let err = run_compare(&store, 7, d(2025, 6, 1), d(2025, 6, 30), false)
            .await
            .expect_err("unknown property");
        assert_eq!(err.to_string(), "property 7 not found");
    }

    #[tokio::test]
    async fn compare_rejects_inverted_period() {
        let store = MemRateStore::new();
        let id = seed_property(&store, "Hotel Foco").await;
        let err = run_compare(&store, id, d(2025, 6, 30), d(2025, 6, 1), false)
            .await
            .expect_err("inverted period");
        assert_eq!(err.to_string(), "end date must not be before start date");
    }

    #[tokio::test]
    async fn compare_prints_text_and_json() {
        let store = MemRateStore::new();
        let focal = seed_property(&store, "Hotel Foco").await;
        let rival = seed_property(&store, "Hotel Rival").await;
        store.add_competitor(focal, rival).await.expect("link");

        let rate = rateshop_core::NormalizedRate {
            checkin_date: d(2025, 6, 17),
            checkout_date: d(2025, 6, 18),
            price: "228.29".parse().expect("decimal"),
            currency: "BRL".into(),
            channel: "Booking.com".into(),
            room_type: "Standard".into(),
        };
        store.create_rate(focal, &rate).await.expect("focal rate");

        run_compare(&store, focal, d(2025, 6, 1), d(2025, 6, 30), false)
            .await
            .expect("text compare");
        run_compare(&store, focal, d(2025, 6, 1), d(2025, 6, 30), true)
            .await
            .expect("json compare");
    }

    #[tokio::test]
    async fn properties_add_trims_and_lists() {
        let store = MemRateStore::new();
        run_properties_add(&store, "  Hotel Foco  ".into(), Some("Recife".into()), None)
            .await
            .expect("add");

        let rows = store
            .list_properties(&PropertyFilter::default())
            .await
            .expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Hotel Foco");

        run_properties_list(&store).await.expect("list command");
        run_stats(&store).await.expect("stats command");
    }

    #[tokio::test]
    async fn properties_add_rejects_blank_name() {
        let store = MemRateStore::new();
        let err = run_properties_add(&store, "   ".into(), None, None)
            .await
            .expect_err("blank name");
        assert_eq!(err.to_string(), "property name must not be empty");
    }
}
