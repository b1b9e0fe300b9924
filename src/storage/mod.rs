pub mod migrations;
pub mod schema;

use duckdb::Connection;
use std::path::Path;

/// Open the report database, bring its schema up to date and create the
/// query view over `archive_dir`.
///
/// `database` of `None` opens an in-memory database, in which case reports
/// see only the archived Parquet files.
pub fn open(database: Option<&Path>, archive_dir: &Path) -> Result<Connection, duckdb::Error> {
    let conn = match database {
        Some(path) => Connection::open(path)?,
        None => Connection::open_in_memory()?,
    };
    migrations::run_migrations(&conn)?;
    schema::setup_query_view(&conn, archive_dir)?;
    Ok(conn)
}
