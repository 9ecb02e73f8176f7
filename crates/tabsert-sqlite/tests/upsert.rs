//! End-to-end upsert tests against in-memory SQLite databases.

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use tabsert_core::prelude::*;
use tabsert_sqlite::{SqliteClient, SqlitePoolSource};

async fn memory_client() -> SqliteClient {
    SqliteClient::connect(":memory:")
        .await
        .expect("failed to open in-memory SQLite database")
}

fn people() -> Dataset {
    let ts = NaiveDate::from_ymd_opt(2020, 2, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    Dataset::builder()
        .key_level("full_name")
        .column("likes_sport")
        .column("updated")
        .column("size_in_meters")
        .row(vec![
            "John Rambo".to_sql_value(),
            true.to_sql_value(),
            ts.to_sql_value(),
            1.77.to_sql_value(),
        ])
        .row(vec![
            "The Rock".to_sql_value(),
            true.to_sql_value(),
            SqlValue::Null,
            1.96.to_sql_value(),
        ])
        .build()
        .unwrap()
}

async fn all_names(client: &mut SqliteClient) -> Vec<String> {
    sqlx::query("SELECT \"full_name\" FROM \"people\" ORDER BY \"full_name\"")
        .fetch_all(client.connection())
        .await
        .unwrap()
        .iter()
        .map(|row| row.get("full_name"))
        .collect()
}

#[tokio::test]
async fn round_trip_creates_table_and_reads_back() {
    let mut client = memory_client().await;
    Upsert::new("people", ConflictMode::Update)
        .run(people(), &mut client)
        .await
        .unwrap();

    let rows = sqlx::query(
        "SELECT \"full_name\", \"likes_sport\", \"updated\", \"size_in_meters\" \
         FROM \"people\" ORDER BY \"full_name\"",
    )
    .fetch_all(client.connection())
    .await
    .unwrap();

    assert_eq!(rows.len(), 2);
    let name: String = rows[0].get("full_name");
    let likes: bool = rows[0].get("likes_sport");
    let updated: chrono::NaiveDateTime = rows[0].get("updated");
    let size: f64 = rows[0].get("size_in_meters");
    assert_eq!(name, "John Rambo");
    assert!(likes);
    assert_eq!(
        updated,
        NaiveDate::from_ymd_opt(2020, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    );
    assert!((size - 1.77).abs() < f64::EPSILON);

    let null_ts: Option<chrono::NaiveDateTime> = rows[1].get("updated");
    assert!(null_ts.is_none());
}

#[tokio::test]
async fn update_mode_is_idempotent() {
    let mut client = memory_client().await;
    let upsert = Upsert::new("people", ConflictMode::Update);
    upsert.run(people(), &mut client).await.unwrap();
    upsert.run(people(), &mut client).await.unwrap();

    assert_eq!(all_names(&mut client).await.len(), 2);
}

#[tokio::test]
async fn update_mode_overwrites_and_inserts() {
    let mut client = memory_client().await;
    Upsert::new("people", ConflictMode::Update)
        .run(people(), &mut client)
        .await
        .unwrap();

    let newer = Dataset::builder()
        .key_level("full_name")
        .column("likes_sport")
        .column("updated")
        .column("size_in_meters")
        .row(vec![
            "The Rock".to_sql_value(),
            false.to_sql_value(),
            SqlValue::Null,
            2.01.to_sql_value(),
        ])
        .row(vec![
            "John Travolta".to_sql_value(),
            false.to_sql_value(),
            SqlValue::Null,
            1.88.to_sql_value(),
        ])
        .build()
        .unwrap();
    Upsert::new("people", ConflictMode::Update)
        .run(newer, &mut client)
        .await
        .unwrap();

    assert_eq!(
        all_names(&mut client).await,
        ["John Rambo", "John Travolta", "The Rock"]
    );
    let row = sqlx::query("SELECT \"size_in_meters\" FROM \"people\" WHERE \"full_name\" = ?")
        .bind("The Rock")
        .fetch_one(client.connection())
        .await
        .unwrap();
    let size: f64 = row.get("size_in_meters");
    assert!((size - 2.01).abs() < f64::EPSILON);
}

#[tokio::test]
async fn ignore_mode_leaves_existing_rows_untouched() {
    let mut client = memory_client().await;
    let initial = Dataset::builder()
        .key_level("k")
        .column("c")
        .row(vec![1_i64.to_sql_value(), 5_i64.to_sql_value()])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(initial, &mut client)
        .await
        .unwrap();

    let incoming = Dataset::builder()
        .key_level("k")
        .column("c")
        .row(vec![1_i64.to_sql_value(), 9_i64.to_sql_value()])
        .row(vec![2_i64.to_sql_value(), 7_i64.to_sql_value()])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Ignore)
        .run(incoming, &mut client)
        .await
        .unwrap();

    let rows = sqlx::query("SELECT \"k\", \"c\" FROM \"t\" ORDER BY \"k\"")
        .fetch_all(client.connection())
        .await
        .unwrap();
    let values: Vec<(i64, i64)> = rows.iter().map(|r| (r.get("k"), r.get("c"))).collect();
    // the existing row kept c = 5; the new key was inserted
    assert_eq!(values, [(1, 5), (2, 7)]);
}

#[tokio::test]
async fn update_mode_leaves_absent_columns_untouched() {
    let mut client = memory_client().await;
    let full = Dataset::builder()
        .key_level("k")
        .column("a")
        .column("b")
        .row(vec![
            1_i64.to_sql_value(),
            1_i64.to_sql_value(),
            2_i64.to_sql_value(),
        ])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(full, &mut client)
        .await
        .unwrap();

    // column "b" is absent from the incoming dataset
    let partial = Dataset::builder()
        .key_level("k")
        .column("a")
        .row(vec![1_i64.to_sql_value(), 9_i64.to_sql_value()])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(partial, &mut client)
        .await
        .unwrap();

    let row = sqlx::query("SELECT \"a\", \"b\" FROM \"t\" WHERE \"k\" = 1")
        .fetch_one(client.connection())
        .await
        .unwrap();
    let a: i64 = row.get("a");
    let b: i64 = row.get("b");
    assert_eq!((a, b), (9, 2));
}

#[tokio::test]
async fn key_only_dataset_works_in_both_modes() {
    let mut client = memory_client().await;
    let keys = Dataset::builder()
        .key_level("id")
        .row(vec![1_i64.to_sql_value()])
        .row(vec![2_i64.to_sql_value()])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(keys.clone(), &mut client)
        .await
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(keys.clone(), &mut client)
        .await
        .unwrap();
    Upsert::new("t", ConflictMode::Ignore)
        .run(keys, &mut client)
        .await
        .unwrap();

    let rows = sqlx::query("SELECT \"id\" FROM \"t\"")
        .fetch_all(client.connection())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn missing_columns_are_added_on_request() {
    let mut client = memory_client().await;
    let narrow = Dataset::builder()
        .key_level("id")
        .column("a")
        .row(vec![1_i64.to_sql_value(), 1_i64.to_sql_value()])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(narrow, &mut client)
        .await
        .unwrap();

    let wide = Dataset::builder()
        .key_level("id")
        .column("a")
        .column("b")
        .row(vec![
            2_i64.to_sql_value(),
            2_i64.to_sql_value(),
            "new".to_sql_value(),
        ])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .add_missing_columns(true)
        .run(wide, &mut client)
        .await
        .unwrap();

    let rows = sqlx::query("SELECT \"id\", \"b\" FROM \"t\" ORDER BY \"id\"")
        .fetch_all(client.connection())
        .await
        .unwrap();
    let old_b: Option<String> = rows[0].get("b");
    let new_b: Option<String> = rows[1].get("b");
    assert!(old_b.is_none());
    assert_eq!(new_b.as_deref(), Some("new"));
}

#[tokio::test]
async fn chunked_upsert_covers_all_rows() {
    let mut client = memory_client().await;
    let mut builder = Dataset::builder().key_level("id").column("v");
    for i in 0..10_i64 {
        builder = builder.row(vec![i.to_sql_value(), (i * 10).to_sql_value()]);
    }
    let dataset = builder.build().unwrap();

    let upsert = Upsert::new("t", ConflictMode::Update).chunksize(3);
    let mut outcomes = upsert.stream(dataset, &mut client).await.unwrap();
    let mut chunks = 0;
    let mut rows_bound = 0;
    while let Some(outcome) = outcomes.next().await {
        let outcome = outcome.unwrap();
        chunks += 1;
        rows_bound += outcome.rows_in_chunk;
        assert!(outcome.rows_in_chunk <= 3);
    }
    assert_eq!(chunks, 4);
    assert_eq!(rows_bound, 10);

    let rows = sqlx::query("SELECT \"id\" FROM \"t\"")
        .fetch_all(client.connection())
        .await
        .unwrap();
    assert_eq!(rows.len(), 10);
}

#[tokio::test]
async fn pool_source_commits_the_operation() {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .unwrap();
    let source = SqlitePoolSource::new(pool.clone());

    Upsert::new("people", ConflictMode::Update)
        .run_with(people(), &source)
        .await
        .unwrap();

    let rows = sqlx::query("SELECT \"full_name\" FROM \"people\"")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn duplicate_key_fails_before_touching_the_database() {
    let mut client = memory_client().await;
    let dup = Dataset::builder()
        .key_level("id")
        .column("v")
        .row(vec![1_i64.to_sql_value(), 1_i64.to_sql_value()])
        .row(vec![1_i64.to_sql_value(), 2_i64.to_sql_value()])
        .build()
        .unwrap();
    let result = Upsert::new("t", ConflictMode::Update)
        .run(dup, &mut client)
        .await;
    assert!(matches!(
        result,
        Err(UpsertError::DuplicateKeyValues { .. })
    ));

    // zero statements were sent: the table was never created
    let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 't'")
        .fetch_optional(client.connection())
        .await
        .unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn json_values_round_trip_as_text() {
    let mut client = memory_client().await;
    let dataset = Dataset::builder()
        .key_level("id")
        .column("payload")
        .row(vec![
            1_i64.to_sql_value(),
            serde_json::json!({"colors": ["blue", "red"]}).to_sql_value(),
        ])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(dataset, &mut client)
        .await
        .unwrap();

    let row = sqlx::query("SELECT \"payload\" FROM \"t\" WHERE \"id\" = 1")
        .fetch_one(client.connection())
        .await
        .unwrap();
    let raw: String = row.get("payload");
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, serde_json::json!({"colors": ["blue", "red"]}));
}

#[tokio::test]
async fn composite_key_conflicts_on_the_whole_tuple() {
    let mut client = memory_client().await;
    let initial = Dataset::builder()
        .key_level("a")
        .key_level("b")
        .column("v")
        .row(vec![
            1_i64.to_sql_value(),
            1_i64.to_sql_value(),
            "old".to_sql_value(),
        ])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(initial, &mut client)
        .await
        .unwrap();

    let incoming = Dataset::builder()
        .key_level("a")
        .key_level("b")
        .column("v")
        .row(vec![
            1_i64.to_sql_value(),
            1_i64.to_sql_value(),
            "updated".to_sql_value(),
        ])
        .row(vec![
            1_i64.to_sql_value(),
            2_i64.to_sql_value(),
            "inserted".to_sql_value(),
        ])
        .build()
        .unwrap();
    Upsert::new("t", ConflictMode::Update)
        .run(incoming, &mut client)
        .await
        .unwrap();

    let rows = sqlx::query("SELECT \"v\" FROM \"t\" ORDER BY \"a\", \"b\"")
        .fetch_all(client.connection())
        .await
        .unwrap();
    let values: Vec<String> = rows.iter().map(|r| r.get("v")).collect();
    assert_eq!(values, ["updated", "inserted"]);
}
