use duckdb::Connection;

const CURRENT_VERSION: u32 = 2;

/// Create the version table if needed and apply every pending migration.
pub fn run_migrations(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL, applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
    )?;

    let current = current_version(conn)?;
    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }
    if current < CURRENT_VERSION {
        tracing::info!(from = current, to = CURRENT_VERSION, "Schema migrated");
    }
    Ok(())
}

fn current_version(conn: &Connection) -> Result<u32, duckdb::Error> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
}

fn record_version(conn: &Connection, version: u32) -> Result<(), duckdb::Error> {
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])?;
    Ok(())
}

// v1: events table
fn migrate_v1(conn: &Connection) -> Result<(), duckdb::Error> {
    crate::storage::schema::init_schema(conn)?;
    record_version(conn, 1)
}

// v2: page titles, for databases created before the column existed
fn migrate_v2(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch("ALTER TABLE events ADD COLUMN IF NOT EXISTS page_title VARCHAR")?;
    record_version(conn, 2)
}
