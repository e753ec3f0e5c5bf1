//! Database-backed contract tests for import deduplication, aggregates, and
//! export filtering.
//!
//! These tests require Docker to be running. Run with:
//!
//! ```bash
//! cargo test --test db_contract_tests -- --ignored
//! ```

mod common;

use std::io::{Cursor, Read, Write};

use common::TestPostgres;
use prices_server::features::prices::commands::import::{self, ImportPricesCommand};
use prices_server::features::prices::queries::export::{self, ExportPricesQuery};
use prices_server::features::prices::types::ExportFilters;
use prices_server::ingest::ArchiveKind;

fn zip_with_csv(csv: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("data.csv", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(csv.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

fn unzip_data_csv(zip_bytes: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes)).unwrap();
    let mut file = archive.by_name("data.csv").unwrap();
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    contents
}

async fn import_zip(pg: &TestPostgres, csv: &str) -> prices_server::features::prices::types::ImportResult {
    let command = ImportPricesCommand {
        kind: ArchiveKind::Zip,
        data: zip_with_csv(csv),
    };
    import::handle(pg.pool_clone(), command)
        .await
        .expect("import failed")
}

async fn export_filtered(pg: &TestPostgres, filters: ExportFilters) -> String {
    let zip_bytes = export::handle(pg.pool_clone(), ExportPricesQuery { filters })
        .await
        .expect("export failed");
    unzip_data_csv(&zip_bytes)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn importing_the_same_archive_twice_only_counts_duplicates() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    let csv = "\
id,name,category,price,create_date
1,Apple,Fruit,1.50,2024-01-01
2,Banana,Fruit,0.75,2024-01-02
3,Desk,Furniture,120,2024-01-03
4,Lamp,Household,free,2024-01-04
";

    let first = import_zip(&pg, csv).await;
    assert_eq!(first.total_count, 4);
    assert_eq!(first.total_items, 3);
    assert_eq!(first.duplicates_count, 0);
    assert_eq!(first.total_categories, 3);
    // 1.50 + 0.75 + 120.00 has fractional cents, so the sum is a decimal.
    assert_eq!(first.total_price, serde_json::json!(122.25));

    let second = import_zip(&pg, csv).await;
    assert_eq!(second.total_count, 4);
    assert_eq!(second.total_items, 0);
    assert_eq!(second.duplicates_count, 3);
    // Aggregates are global and unchanged by an all-duplicate call.
    assert_eq!(second.total_categories, 3);
    assert_eq!(second.total_price, serde_json::json!(122.25));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn storage_dedup_matches_on_canonical_price() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    let first = import_zip(
        &pg,
        "name,category,price,create_date\nApple,Fruit,1.5,2024-01-01\n",
    )
    .await;
    assert_eq!(first.total_items, 1);

    // Different input spelling, same canonical value: a storage-level
    // duplicate, not a new row.
    let second = import_zip(
        &pg,
        "name,category,price,create_date\nApple,Fruit,1.50,2024-01-01\n",
    )
    .await;
    assert_eq!(second.total_items, 0);
    assert_eq!(second.duplicates_count, 1);

    // A differing price is a distinct record.
    let third = import_zip(
        &pg,
        "name,category,price,create_date\nApple,Fruit,1.51,2024-01-01\n",
    )
    .await;
    assert_eq!(third.total_items, 1);
    assert_eq!(third.duplicates_count, 0);

    let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prices")
        .fetch_one(pg.pool())
        .await
        .expect("count failed");
    assert_eq!(stored, 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn aggregate_sum_is_integer_when_cents_cancel_out() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    let result = import_zip(
        &pg,
        "name,category,price,create_date\n\
         Apple,Fruit,1.50,2024-01-01\n\
         Banana,Fruit,1.50,2024-01-02\n",
    )
    .await;

    assert_eq!(result.total_price, serde_json::json!(3));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn export_price_bounds_are_inclusive_whole_units() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    import_zip(
        &pg,
        "name,category,price,create_date\n\
         Below,Test,9.99,2024-01-01\n\
         Exact,Test,10.00,2024-01-01\n\
         Above,Test,10.01,2024-01-01\n",
    )
    .await;

    let csv = export_filtered(
        &pg,
        ExportFilters {
            min: Some(10),
            max: Some(10),
            ..Default::default()
        },
    )
    .await;

    let names: Vec<&str> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(names, vec!["Exact"]);
    assert!(csv.contains(",10.00,"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn export_date_bounds_are_inclusive() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    import_zip(
        &pg,
        "name,category,price,create_date\n\
         Early,Test,1.00,2024-01-01\n\
         Start,Test,1.00,2024-02-01\n\
         End,Test,1.00,2024-03-01\n\
         Late,Test,1.00,2024-04-01\n",
    )
    .await;

    let csv = export_filtered(
        &pg,
        ExportFilters {
            start: chrono::NaiveDate::from_ymd_opt(2024, 2, 1),
            end: chrono::NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        },
    )
    .await;

    let names: Vec<&str> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(names, vec!["Start", "End"]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn export_orders_by_date_then_category_then_name() {
    let pg = TestPostgres::start().await.expect("Failed to start PostgreSQL");

    // Inserted deliberately out of export order.
    import_zip(
        &pg,
        "name,category,price,create_date\n\
         Zebra,Animals,5.00,2024-01-02\n\
         Apple,Fruit,1.00,2024-01-01\n\
         Mango,Fruit,2.00,2024-01-01\n\
         Desk,Furniture,9.00,2024-01-01\n\
         Ant,Animals,3.00,2024-01-02\n",
    )
    .await;

    let csv = export_filtered(&pg, ExportFilters::default()).await;

    let names: Vec<&str> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').nth(1).unwrap())
        .collect();
    // Date ascending, then category ("Fruit" < "Furniture"), then name.
    assert_eq!(names, vec!["Apple", "Mango", "Desk", "Ant", "Zebra"]);
}
