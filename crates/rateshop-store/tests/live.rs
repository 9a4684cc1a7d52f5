//! Live Postgres tests for the store, behind the `db-tests` feature.
//!
//! Each test gets a fresh, fully-migrated database from the sqlx test
//! harness; the `migrations` path resolves relative to this crate's root to
//! the workspace migration directory. Run with:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -p rateshop-store --features db-tests
//! ```
#![cfg(feature = "db-tests")]

use chrono::NaiveDate;
use rust_decimal::Decimal;

use rateshop_core::{NormalizedRate, DEFAULT_CHANNEL, DEFAULT_CURRENCY, DEFAULT_ROOM_TYPE};
use rateshop_store::{
    BatchFilter, NewProperty, PgRateStore, PropertyFilter, RateFilter, RateStore, StoreError,
    UpdateProperty,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn d(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn rate(checkin: NaiveDate, checkout: NaiveDate, price: &str) -> NormalizedRate {
    NormalizedRate {
        checkin_date: checkin,
        checkout_date: checkout,
        price: dec(price),
        currency: DEFAULT_CURRENCY.to_string(),
        channel: DEFAULT_CHANNEL.to_string(),
        room_type: DEFAULT_ROOM_TYPE.to_string(),
    }
}

async fn seed_property(store: &PgRateStore, name: &str) -> i64 {
    store
        .create_property(&NewProperty {
            name: name.to_string(),
            location: Some("Porto de Galinhas".to_string()),
            booking_url: None,
        })
        .await
        .unwrap_or_else(|e| panic!("seed_property failed for '{name}': {e}"))
        .id
}

// ---------------------------------------------------------------------------
// Section 1: Property constraints
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn unique_name_violation_maps_to_duplicate_name(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    seed_property(&store, "Hotel Foco").await;

    let err = store
        .create_property(&NewProperty {
            name: "Hotel Foco".to_string(),
            location: None,
            booking_url: None,
        })
        .await
        .expect_err("second create with same name should fail");

    assert!(
        matches!(err, StoreError::DuplicateName { ref name } if name == "Hotel Foco"),
        "expected DuplicateName, got {err:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn rename_onto_existing_name_maps_to_duplicate_name(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    seed_property(&store, "Hotel Foco").await;
    let other = seed_property(&store, "Hotel Rival").await;

    let err = store
        .update_property(
            other,
            &UpdateProperty {
                name: "Hotel Foco".to_string(),
                location: None,
                booking_url: None,
                is_active: None,
            },
        )
        .await
        .expect_err("rename onto a taken name should fail");
    assert!(matches!(err, StoreError::DuplicateName { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
async fn search_matches_name_and_location_case_insensitively(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    seed_property(&store, "Hotel Foco").await;
    seed_property(&store, "POUSADA BEIRA MAR").await;

    let by_name = store
        .list_properties(&PropertyFilter {
            search: Some("beira".to_string()),
            ..PropertyFilter::default()
        })
        .await
        .expect("search failed");
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "POUSADA BEIRA MAR");

    let by_location = store
        .list_properties(&PropertyFilter {
            search: Some("GALINHAS".to_string()),
            ..PropertyFilter::default()
        })
        .await
        .expect("search failed");
    assert_eq!(by_location.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn delete_property_guard_counts_live_rates(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let property_id = seed_property(&store, "Hotel Foco").await;
    let batch = store
        .begin_import(property_id, "junho.xlsx", None)
        .await
        .expect("begin failed");
    store
        .insert_rates(
            property_id,
            batch.id,
            &[
                rate(d(2025, 6, 17), d(2025, 6, 18), "174.15"),
                rate(d(2025, 6, 18), d(2025, 6, 19), "174.15"),
            ],
        )
        .await
        .expect("insert failed");

    let err = store
        .delete_property(property_id)
        .await
        .expect_err("delete should be blocked");
    assert!(matches!(
        err,
        StoreError::PropertyHasRates { rate_count: 2, .. }
    ));

    store
        .delete_import_batch(batch.id)
        .await
        .expect("batch delete failed");
    store
        .delete_property(property_id)
        .await
        .expect("delete should succeed once rates are gone");
}

// ---------------------------------------------------------------------------
// Section 2: Competitor edges
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn add_competitor_is_idempotent_at_the_database_level(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let a = seed_property(&store, "Hotel Foco").await;
    let b = seed_property(&store, "Hotel Rival").await;

    assert!(store.add_competitor(a, b).await.expect("first add failed"));
    assert!(!store.add_competitor(a, b).await.expect("second add failed"));

    let competitors = store.list_competitors(a).await.expect("list failed");
    assert_eq!(competitors.len(), 1);
    assert_eq!(competitors[0].id, b);
    assert_eq!(competitors[0].name, "Hotel Rival");
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_a_property_cascades_its_edges(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let a = seed_property(&store, "Hotel Foco").await;
    let b = seed_property(&store, "Hotel Rival").await;
    store.add_competitor(a, b).await.expect("add failed");

    store.delete_property(b).await.expect("delete failed");

    let competitors = store.list_competitors(a).await.expect("list failed");
    assert!(competitors.is_empty(), "FK cascade removes the edge");
}

#[sqlx::test(migrations = "../../migrations")]
async fn self_reference_is_rejected_before_reaching_the_check_constraint(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let a = seed_property(&store, "Hotel Foco").await;

    let err = store
        .add_competitor(a, a)
        .await
        .expect_err("self edge should fail");
    assert!(matches!(err, StoreError::SelfReference { .. }));
}

// ---------------------------------------------------------------------------
// Section 3: Import ledger transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn import_flow_persists_counts_and_error_details(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let property_id = seed_property(&store, "Hotel Foco").await;

    let batch = store
        .begin_import(property_id, "junho.xlsx", Some("abc_junho.xlsx"))
        .await
        .expect("begin failed");
    assert_eq!(batch.status, "processing");
    assert_eq!(batch.property_name, "Hotel Foco");

    store
        .insert_rates(
            property_id,
            batch.id,
            &[
                rate(d(2025, 6, 17), d(2025, 6, 18), "174.15"),
                rate(d(2025, 6, 18), d(2025, 6, 19), "174.15"),
            ],
        )
        .await
        .expect("insert failed");

    let errors = vec!["Row 4: invalid check-in date 'not-a-date'".to_string()];
    let finalized = store
        .finalize_import(batch.id, 3, 2, 1, &errors)
        .await
        .expect("finalize failed");

    assert_eq!(finalized.status, "success_with_errors");
    assert_eq!(finalized.total_rows, 3);
    assert_eq!(finalized.accepted_rows, 2);
    assert_eq!(finalized.rejected_rows, 1);
    assert_eq!(
        finalized.error_details,
        Some(serde_json::json!([
            "Row 4: invalid check-in date 'not-a-date'"
        ]))
    );
    assert!(finalized.completed_at.is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn finalize_is_guarded_by_the_processing_status(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let property_id = seed_property(&store, "Hotel Foco").await;
    let batch = store
        .begin_import(property_id, "junho.xlsx", None)
        .await
        .expect("begin failed");

    store
        .finalize_import(batch.id, 1, 1, 0, &[])
        .await
        .expect("first finalize failed");

    let err = store
        .finalize_import(batch.id, 1, 1, 0, &[])
        .await
        .expect_err("second finalize should fail");
    assert!(matches!(
        err,
        StoreError::InvalidBatchTransition {
            expected: "processing",
            ..
        }
    ));

    let err = store
        .finalize_import(999_999, 1, 1, 0, &[])
        .await
        .expect_err("unknown batch should fail");
    assert!(matches!(
        err,
        StoreError::NotFound {
            entity: "import batch",
            ..
        }
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn deleting_a_batch_removes_its_rates_atomically(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let property_id = seed_property(&store, "Hotel Foco").await;

    let keep = store
        .begin_import(property_id, "keep.xlsx", None)
        .await
        .expect("begin failed");
    store
        .insert_rates(
            property_id,
            keep.id,
            &[rate(d(2025, 6, 17), d(2025, 6, 18), "174.15")],
        )
        .await
        .expect("insert failed");

    let doomed = store
        .begin_import(property_id, "doomed.xlsx", None)
        .await
        .expect("begin failed");
    store
        .insert_rates(
            property_id,
            doomed.id,
            &[
                rate(d(2025, 7, 1), d(2025, 7, 2), "200.50"),
                rate(d(2025, 7, 2), d(2025, 7, 3), "210.00"),
            ],
        )
        .await
        .expect("insert failed");

    store
        .delete_import_batch(doomed.id)
        .await
        .expect("delete failed");

    let remaining = store
        .query_rates(&RateFilter {
            property_id: Some(property_id),
            ..RateFilter::default()
        })
        .await
        .expect("query failed");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].import_batch_id, Some(keep.id));
}

#[sqlx::test(migrations = "../../migrations")]
async fn batch_listing_is_newest_first(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let property_id = seed_property(&store, "Hotel Foco").await;

    let first = store
        .begin_import(property_id, "one.xlsx", None)
        .await
        .expect("begin failed");
    let second = store
        .begin_import(property_id, "two.xlsx", None)
        .await
        .expect("begin failed");

    let batches = store
        .list_import_batches(&BatchFilter::default())
        .await
        .expect("list failed");
    let ids: Vec<i64> = batches.iter().map(|batch| batch.id).collect();
    assert_eq!(ids, [second.id, first.id]);
}

// ---------------------------------------------------------------------------
// Section 4: Rate queries
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn rate_filters_compose_over_dates_channel_and_price(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let property_id = seed_property(&store, "Hotel Foco").await;

    let mut expedia = rate(d(2025, 6, 18), d(2025, 6, 19), "250.00");
    expedia.channel = "Expedia".to_string();
    expedia.room_type = "Deluxe".to_string();

    store
        .create_rate(property_id, &rate(d(2025, 6, 17), d(2025, 6, 18), "174.15"))
        .await
        .expect("create failed");
    store
        .create_rate(property_id, &expedia)
        .await
        .expect("create failed");
    store
        .create_rate(property_id, &rate(d(2025, 7, 1), d(2025, 7, 2), "320.00"))
        .await
        .expect("create failed");

    let june = store
        .query_rates(&RateFilter {
            property_id: Some(property_id),
            start_date: Some(d(2025, 6, 1)),
            end_date: Some(d(2025, 6, 30)),
            ..RateFilter::default()
        })
        .await
        .expect("query failed");
    assert_eq!(june.len(), 2);
    assert_eq!(june[0].checkin_date, d(2025, 6, 17), "ordered by check-in");

    let by_channel = store
        .query_rates(&RateFilter {
            channel: Some("expedia".to_string()),
            ..RateFilter::default()
        })
        .await
        .expect("query failed");
    assert_eq!(by_channel.len(), 1, "ILIKE match is case-insensitive");

    let bounded = store
        .query_rates(&RateFilter {
            min_price: Some(dec("200")),
            max_price: Some(dec("300")),
            ..RateFilter::default()
        })
        .await
        .expect("query failed");
    assert_eq!(bounded.len(), 1);
    assert_eq!(bounded[0].price, dec("250.00"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn numeric_prices_round_trip_to_two_places(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let property_id = seed_property(&store, "Hotel Foco").await;

    let row = store
        .create_rate(property_id, &rate(d(2025, 6, 17), d(2025, 6, 18), "174.15"))
        .await
        .expect("create failed");
    assert_eq!(row.price, dec("174.15"));

    let updated = store
        .update_rate(row.id, &rate(d(2025, 6, 17), d(2025, 6, 18), "228.29"))
        .await
        .expect("update failed");
    assert_eq!(updated.price, dec("228.29"));
}

// ---------------------------------------------------------------------------
// Section 5: Totals
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn stats_counts_match_inserted_rows(pool: sqlx::PgPool) {
    let store = PgRateStore::new(pool);
    let focal = seed_property(&store, "Hotel Foco").await;
    let rival = seed_property(&store, "Hotel Rival").await;
    store
        .add_competitor(focal, rival)
        .await
        .expect("add failed");

    let batch = store
        .begin_import(focal, "junho.xlsx", None)
        .await
        .expect("begin failed");
    store
        .insert_rates(
            focal,
            batch.id,
            &[rate(d(2025, 6, 17), d(2025, 6, 18), "174.15")],
        )
        .await
        .expect("insert failed");
    store
        .finalize_import(batch.id, 1, 1, 0, &[])
        .await
        .expect("finalize failed");

    let summary = store.stats().await.expect("stats failed");
    assert_eq!(summary.total_properties, 2);
    assert_eq!(summary.total_rate_records, 1);
    assert_eq!(summary.total_competitor_links, 1);
    assert_eq!(summary.total_import_batches, 1);
    assert_eq!(summary.last_import.map(|b| b.id), Some(batch.id));
}
