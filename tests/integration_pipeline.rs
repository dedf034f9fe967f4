//! End-to-end tests: schema discovery in a local file store, alignment,
//! coercion and loading into the Parquet warehouse.

use polars::prelude::*;
use std::fs;
use std::path::Path;
use tabload::config::{ExtensionPolicy, TraversalConfig};
use tabload::storage::LocalFileStore;
use tabload::warehouse::{LocalWarehouse, Warehouse};
use tabload::{
    FileLocator, LoadOutcome, LoadTarget, SchemaFetcher, TableRef, TabloadError,
    WarehouseLoader, WriteMode,
};
use tempfile::TempDir;

const ORDERS_SCHEMA: &str = r#"[
    {"name": "order_id", "type": "INTEGER", "mode": "REQUIRED", "description": "Order number"},
    {"name": "customer", "type": "STRING", "mode": "NULLABLE"},
    {"name": "quantity", "type": "INTEGER"},
    {"name": "discount", "type": "FLOAT", "mode": null, "description": null}
]"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn store_fixture() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    write(root, "schemas/orders_schema.txt", ORDERS_SCHEMA);
    write(
        root,
        "schemas/legacy/customers_schema.txt",
        "[{'name': 'id', 'type': 'INTEGER'}, {'name': 'email', 'type': 'STRING'},]",
    );
    write(root, "schemas/README.md", "schema files");
    write(root, "data/2024/orders.csv", "order_id,customer\n1,acme\n");
    write(root, "data/2024/notes.txt", "n/a");
    temp_dir
}

fn orders_data() -> DataFrame {
    df!(
        "order_id" => [1.0, 2.0, 3.0],
        "customer" => [Some("acme"), None, Some("globex")],
        "quantity" => [Some(10.0), None, Some(7.0)],
        "internal_note" => ["x", "y", "z"],
    )
    .unwrap()
}

#[test]
fn test_listing_local_store() {
    let store_dir = store_fixture();
    let locator = FileLocator::new(LocalFileStore::new(store_dir.path()));

    let schemas = locator.list_files("schemas", Some("TXT"), Some("schemas")).unwrap();
    let names: Vec<&str> = schemas.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["customers_schema.txt", "orders_schema.txt"]);

    let legacy = schemas.iter().find(|e| e.name == "customers_schema.txt").unwrap();
    assert_eq!(legacy.id, "schemas/legacy/customers_schema.txt");
    assert_eq!(legacy.parent_name.as_deref(), Some("legacy"));

    let unfiltered = FileLocator::new(LocalFileStore::new(store_dir.path()))
        .with_config(TraversalConfig::default().with_extension_policy(ExtensionPolicy::Unfiltered))
        .list_files("data", None, None)
        .unwrap();
    let names: Vec<&str> = unfiltered.iter().map(|e| e.name.as_str()).collect();
    assert!(names.contains(&"2024"));
    assert!(names.contains(&"orders.csv"));
    assert!(names.contains(&"notes.txt"));
}

#[test]
fn test_load_from_stored_schema() {
    let store_dir = store_fixture();
    let warehouse_dir = TempDir::new().unwrap();

    let fetcher = SchemaFetcher::new(FileLocator::new(LocalFileStore::new(store_dir.path())));
    let schema = fetcher.fetch_schema("schemas", "orders_schema.txt").unwrap();
    assert_eq!(schema.len(), 4);

    let loader = WarehouseLoader::new(LocalWarehouse::new(warehouse_dir.path(), "acme"));
    let report = loader
        .load(
            schema,
            orders_data(),
            &LoadTarget::new("sales", "orders"),
            WriteMode::Truncate,
        )
        .unwrap();

    assert_eq!(report.outcome, LoadOutcome::Success);
    assert_eq!(report.submitted_columns, vec!["order_id", "customer", "quantity"]);
    assert!(report.diff.dataset_only.contains("internal_note"));
    assert!(report.diff.schema_only.contains("discount"));
    assert_eq!(report.coercion.converted, vec!["order_id", "quantity"]);

    let table = TableRef::new("acme", "sales", "orders");
    let stored = loader.warehouse().read_table(&table).unwrap();
    assert_eq!(stored.shape(), (3, 3));
    assert_eq!(stored.column("quantity").unwrap().dtype(), &DataType::Int64);
    assert_eq!(stored.column("quantity").unwrap().null_count(), 1);
    assert!(
        parquet_path(warehouse_dir.path(), &table).exists(),
        "table should be stored as parquet"
    );
}

#[test]
fn test_append_and_empty_modes() {
    let store_dir = store_fixture();
    let warehouse_dir = TempDir::new().unwrap();
    let fetcher = SchemaFetcher::new(FileLocator::new(LocalFileStore::new(store_dir.path())));
    let schema = fetcher.fetch_schema("schemas", "orders_schema.txt").unwrap();

    let loader = WarehouseLoader::new(LocalWarehouse::new(warehouse_dir.path(), "acme"));
    let target = LoadTarget::new("sales", "orders");

    for _ in 0..2 {
        let report = loader
            .load(schema.clone(), orders_data(), &target, WriteMode::Append)
            .unwrap();
        assert!(report.outcome.is_success());
    }
    let table = TableRef::new("acme", "sales", "orders");
    assert_eq!(loader.warehouse().read_table(&table).unwrap().height(), 6);

    let report = loader
        .load(schema, orders_data(), &target, WriteMode::Empty)
        .unwrap();
    match report.outcome {
        LoadOutcome::Failed(e) => assert_eq!(e.service, "warehouse"),
        _ => panic!("Expected Failed outcome"),
    }
    assert_eq!(loader.warehouse().read_table(&table).unwrap().height(), 6);
}

#[test]
fn test_required_nulls_fail_the_job() {
    let store_dir = store_fixture();
    let warehouse_dir = TempDir::new().unwrap();
    let fetcher = SchemaFetcher::new(FileLocator::new(LocalFileStore::new(store_dir.path())));
    let schema = fetcher.fetch_schema("schemas", "orders_schema.txt").unwrap();

    let data = df!("order_id" => [Some(1i64), None]).unwrap();
    let loader = WarehouseLoader::new(LocalWarehouse::new(warehouse_dir.path(), "acme"));
    let report = loader
        .load(schema, data, &LoadTarget::new("sales", "orders"), WriteMode::Append)
        .unwrap();

    assert!(!report.outcome.is_success());
    assert!(loader.warehouse().list_tables("acme", "sales").unwrap().is_empty());
}

#[test]
fn test_literal_schema_and_export() {
    let store_dir = store_fixture();
    let warehouse_dir = TempDir::new().unwrap();
    let fetcher = SchemaFetcher::new(FileLocator::new(LocalFileStore::new(store_dir.path())));

    let schema = fetcher.fetch_schema("schemas", "customers_schema.txt").unwrap();
    assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "email"]);

    let loader = WarehouseLoader::new(LocalWarehouse::new(warehouse_dir.path(), "acme"));
    let first = df!("id" => [1i64, 2, 3], "email" => ["a@x", "b@x", "c@x"]).unwrap();
    let second = df!("id" => [4i64], "email" => ["d@x"]).unwrap();

    assert!(loader.export_dataframe(first, "crm.customers", None).unwrap().outcome.is_success());
    assert!(loader.export_dataframe(second, "crm.customers", None).unwrap().outcome.is_success());

    let table = TableRef::new("acme", "crm", "customers");
    assert_eq!(loader.warehouse().read_table(&table).unwrap().height(), 1);
    assert_eq!(loader.warehouse().list_datasets("acme").unwrap(), vec!["crm"]);
}

#[test]
fn test_missing_schema_file() {
    let store_dir = store_fixture();
    let fetcher = SchemaFetcher::new(FileLocator::new(LocalFileStore::new(store_dir.path())));

    match fetcher.fetch_schema("schemas", "invoices_schema.txt").unwrap_err() {
        TabloadError::NotFound { name, folder_id } => {
            assert_eq!(name, "invoices_schema.txt");
            assert_eq!(folder_id, "schemas");
        }
        _ => panic!("Expected NotFound error"),
    }
}

fn parquet_path(root: &Path, table: &TableRef) -> std::path::PathBuf {
    root.join(&table.project)
        .join(&table.dataset)
        .join(format!("{}.parquet", table.table))
}
