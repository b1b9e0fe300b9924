use duckdb::Connection;
use std::path::Path;

/// SQL statement to create the events table read by reports.
pub const CREATE_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS events (
    site_id         VARCHAR NOT NULL,
    visitor_id      VARCHAR NOT NULL,
    timestamp       TIMESTAMP NOT NULL,
    event_name      VARCHAR NOT NULL,
    pathname        VARCHAR NOT NULL,
    page_title      VARCHAR,
    hostname        VARCHAR,
    referrer        VARCHAR,
    referrer_source VARCHAR,
    utm_source      VARCHAR,
    utm_medium      VARCHAR,
    utm_campaign    VARCHAR,
    country_code    VARCHAR(2)
)
";

/// Name of the view every report query reads from.
pub const QUERY_VIEW: &str = "events_all";

/// Initialize the database schema.
pub fn init_schema(conn: &Connection) -> Result<(), duckdb::Error> {
    conn.execute_batch(CREATE_EVENTS_TABLE)?;
    Ok(())
}

/// Create (or replace) the `events_all` view.
///
/// When `archive_dir` holds any `.parquet` files the view unions them with the
/// live table by column name, so archives written before a column existed
/// still line up. Otherwise the view is the live table alone. Returns whether
/// archived files were included.
pub fn setup_query_view(conn: &Connection, archive_dir: &Path) -> Result<bool, duckdb::Error> {
    let has_archive = contains_parquet(archive_dir);
    let sql = if has_archive {
        let pattern = archive_dir.join("**").join("*.parquet");
        let pattern = pattern.to_string_lossy().replace('\'', "''");
        format!(
            "CREATE OR REPLACE VIEW {QUERY_VIEW} AS \
             SELECT * FROM events \
             UNION ALL BY NAME \
             SELECT * FROM read_parquet('{pattern}', union_by_name = true, hive_partitioning = false)"
        )
    } else {
        format!("CREATE OR REPLACE VIEW {QUERY_VIEW} AS SELECT * FROM events")
    };
    conn.execute_batch(&sql)?;
    tracing::debug!(
        archive_dir = %archive_dir.display(),
        has_archive,
        "Query view created"
    );
    Ok(has_archive)
}

fn contains_parquet(dir: &Path) -> bool {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(Result::ok).any(|entry| {
        let path = entry.path();
        if path.is_dir() {
            contains_parquet(&path)
        } else {
            path.extension().is_some_and(|ext| ext == "parquet")
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(conn: &Connection, table: &str) -> i64 {
        let mut stmt = conn
            .prepare(&format!("SELECT COUNT(*) FROM {table}"))
            .unwrap();
        stmt.query_row([], |row| row.get(0)).unwrap()
    }

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(count(&conn, "events"), 0);
    }

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn test_page_title_column() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO events (site_id, visitor_id, timestamp, event_name, pathname, page_title)
             VALUES (?, ?, CAST(? AS TIMESTAMP), ?, ?, ?)",
            duckdb::params!["example.com", "v1", "2024-01-15 10:30:00", "pageview", "/", "Home"],
        )
        .unwrap();
        let title: String = conn
            .query_row("SELECT page_title FROM events", [], |row| row.get(0))
            .unwrap();
        assert_eq!(title, "Home");
    }

    #[test]
    fn test_query_view_without_archive() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(!setup_query_view(&conn, &dir.path().join("missing")).unwrap());
        assert_eq!(count(&conn, QUERY_VIEW), 0);
    }

    #[test]
    fn test_query_view_unions_archive() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let partition = dir.path().join("site_id=example.com").join("date=2024-01-15");
        std::fs::create_dir_all(&partition).unwrap();

        // Archive written without the page_title column.
        let file = partition.join("0001.parquet");
        conn.execute_batch(&format!(
            "COPY (SELECT 'example.com' AS site_id, 'v1' AS visitor_id,
                   TIMESTAMP '2024-01-15 10:00:00' AS timestamp, 'pageview' AS event_name,
                   '/' AS pathname) TO '{}' (FORMAT PARQUET)",
            file.to_string_lossy()
        ))
        .unwrap();
        conn.execute(
            "INSERT INTO events (site_id, visitor_id, timestamp, event_name, pathname)
             VALUES ('example.com', 'v2', TIMESTAMP '2024-02-01 09:00:00', 'pageview', '/about')",
            [],
        )
        .unwrap();

        assert!(setup_query_view(&conn, dir.path()).unwrap());
        assert_eq!(count(&conn, QUERY_VIEW), 2);
        let titles: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {QUERY_VIEW} WHERE page_title IS NULL"),
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(titles, 2);
    }
}
