//! make → load → dump against a temporary database file.

use std::env;
use std::fs;
use std::path::Path;

use clap::Parser;
use dal_fixture::{FieldValue, FixtureDocument};
use fixture_cli::{data_sources, run, Args};
use serial_test::serial;

const SCHEMA: &str = r#"{"entities":[{"table":"orders","columns":[
    {"name":"id","type":"int","primary_key":true},
    {"name":"name","type":"varchar"}]}]}"#;

const FIXTURE: &str = r#"{"tables":[{"name":"orders","rows":[
    {"id":1,"name":"a"},{"id":2,"name":"b"}]}]}"#;

fn write(dir: &Path, name: &str, text: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path.display().to_string()
}

fn fixture(argv: &[&str]) {
    let args = Args::try_parse_from(std::iter::once("fixture").chain(argv.iter().copied())).unwrap();
    run(args).unwrap();
}

#[test]
#[serial]
fn test_make_load_dump_round_trip() {
    env::remove_var("FIXTURE_DATA_SOURCES");
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data/fixture.sqlite").display().to_string();
    let schema = write(dir.path(), "orders-codegen.json", SCHEMA);
    let data = write(dir.path(), "orders.json", FIXTURE);
    let out = dir.path().join("out/orders.json");

    fixture(&["--db", &db, "make", &schema]);
    fixture(&["--db", &db, "load", &data]);
    fixture(&["--db", &db, "exec", "UPDATE orders SET name = 'z' WHERE id = 2"]);
    fixture(&["--db", &db, "query", "SELECT * FROM orders"]);
    fixture(&["--db", &db, "dump", "--out", &out.display().to_string(), "orders"]);

    let doc = FixtureDocument::parse(&fs::read_to_string(&out).unwrap()).unwrap();
    let rows = &doc.table("orders").unwrap().rows;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&FieldValue::Text("a".to_string())));
    assert_eq!(rows[1].get("name"), Some(&FieldValue::Text("z".to_string())));
}

#[test]
#[serial]
fn test_data_sources_come_from_env_and_db_flag_wins() {
    let dir = tempfile::tempdir().unwrap();
    let audit = dir.path().join("audit.sqlite");
    env::set_var(
        "FIXTURE_DATA_SOURCES",
        format!("main=/nowhere/main.sqlite,audit={}", audit.display()),
    );

    let args = Args::try_parse_from(["fixture", "--db", "/tmp/override.sqlite", "query", "SELECT 1"])
        .unwrap();
    let sources = data_sources(&args).unwrap();
    assert_eq!(sources.path_for("main"), Some(Path::new("/tmp/override.sqlite")));
    assert_eq!(sources.path_for("audit"), Some(audit.as_path()));

    // Without --db the env entry for the selected source is used.
    let schema = write(dir.path(), "orders-codegen.json", SCHEMA);
    fixture(&["--source", "audit", "make", &schema]);
    assert!(audit.exists());

    let args = Args::try_parse_from(["fixture", "--source", "missing", "query", "SELECT 1"]).unwrap();
    let err = run(args).unwrap_err();
    assert!(err.to_string().contains("no database for data source 'missing'"));

    env::set_var("FIXTURE_DATA_SOURCES", "broken");
    let args = Args::try_parse_from(["fixture", "query", "SELECT 1"]).unwrap();
    assert!(run(args).is_err());

    env::remove_var("FIXTURE_DATA_SOURCES");
}
