use clinic_core::db::migrations::latest_version;
use clinic_core::db::{Database, DbError};
use clinic_core::DatabaseConfig;
use rusqlite::Connection;

#[test]
fn open_applies_all_migrations() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&DatabaseConfig::at(dir.path().join("clinic.sqlite3"))).unwrap();
    let conn = db.connect().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "organizations",
        "professionals",
        "patients",
        "patient_tags",
        "consultations",
        "programs",
        "program_participants",
        "program_meetings",
        "program_meeting_records",
        "nutrition_plans",
        "nutrition_plan_meals",
        "tasks",
    ] {
        assert_object_exists(&conn, "table", table);
    }
    assert_object_exists(&conn, "index", "idx_nutrition_plans_one_active");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig::at(dir.path().join("clinic.sqlite3"));

    let first = Database::open(&config).unwrap();
    assert_eq!(schema_version(&first.connect().unwrap()), latest_version());
    drop(first);

    let second = Database::open(&config).unwrap();
    assert_eq!(schema_version(&second.connect().unwrap()), latest_version());
}

#[test]
fn open_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data").join("clinic.sqlite3");

    let db = Database::open(&DatabaseConfig::at(&path)).unwrap();
    assert_eq!(db.path(), path.as_path());
    assert!(path.exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = Database::open(&DatabaseConfig::at(&path)).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn connections_enforce_foreign_keys() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&DatabaseConfig::at(dir.path().join("clinic.sqlite3"))).unwrap();
    let conn = db.connect().unwrap();

    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode, "wal");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_object_exists(conn: &Connection, kind: &str, name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = ?1 AND name = ?2
            );",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "{kind} {name} does not exist");
}
