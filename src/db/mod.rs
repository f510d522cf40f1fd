pub mod catalog;
pub mod models;
pub mod schema;

use anyhow::{bail, Context, Result};
use rusqlite::config::DbConfig;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use models::{EntityId, JsonRow, SiteDetails};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle on the SQLite file behind the filter server.
///
/// The server never shares a connection between requests: every lookup
/// calls [`Database::connect`] for its own read-only connection.
#[derive(Debug, Clone)]
pub struct Database {
    pub path: PathBuf,
    busy_timeout: Duration,
}

impl Database {
    /// Open an existing database for reading.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Database not found: {} (create it with `cartalex init-db`)",
                path.display()
            );
        }

        let db = Database {
            path: path.to_path_buf(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        };
        db.connect()?;

        info!("Opened database: {}", path.display());
        Ok(db)
    }

    /// Create (or upgrade) the database at the given path with the reference schema.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::create_schema(&conn)?;

        info!("Initialized database: {}", path.display());
        Ok(Database {
            path: path.to_path_buf(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        })
    }

    /// Default database path: ~/.cartalex/cartalex.db
    pub fn default_db_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".cartalex").join("cartalex.db"))
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// A fresh read-only connection.
    ///
    /// Double-quoted strings are identifiers only: an unknown `"column"`
    /// is an error instead of silently becoming a string literal.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database: {}", self.path.display()))?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DML, false)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DDL, false)?;
        Ok(conn)
    }
}

/// Run an identifier lookup; the first column of each row is the id.
pub fn query_ids(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> rusqlite::Result<Vec<EntityId>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| row.get(0))?;
    rows.collect()
}

/// Run a query and return each row as a JSON object keyed by column name.
pub fn query_rows(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> rusqlite::Result<Vec<JsonRow>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let rows = stmt.query_map(params_from_iter(params.iter()), |row| {
        let mut object = JsonRow::new();
        for (i, name) in columns.iter().enumerate() {
            object.insert(name.clone(), json_value(row.get_ref(i)?));
        }
        Ok(object)
    })?;
    rows.collect()
}

/// Load the details panel of one site, or `None` when the fid is unknown.
pub fn site_details(conn: &Connection, fid: EntityId) -> rusqlite::Result<Option<SiteDetails>> {
    let fid_param = [Value::Integer(fid)];

    let details = query_rows(conn, catalog::SITE_DETAILS_SQL, &fid_param)?
        .into_iter()
        .next();
    let Some(details) = details else {
        return Ok(None);
    };

    Ok(Some(SiteDetails {
        details,
        discoveries: query_rows(conn, catalog::SITE_DISCOVERIES_SQL, &fid_param)?,
        vestiges: query_rows(conn, catalog::SITE_VESTIGES_SQL, &fid_param)?,
        bibliographies: query_rows(conn, catalog::SITE_BIBLIOGRAPHY_SQL, &fid_param)?,
    }))
}

/// Schema version recorded by `create_schema`, if any.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM cartalex_meta WHERE key = 'schema_version'",
        [],
        |r| r.get(0),
    )
    .optional()
}

fn json_value(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null | ValueRef::Blob(_) => serde_json::Value::Null,
        ValueRef::Integer(i) => i.into(),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned().into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::create_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO sites_fouilles (id, fid, num_tkaczow, \"labelFr\")
                 VALUES (1, 101, '12a', 'Kom el-Dikka');
             INSERT INTO caracterisations (id, caracterisation, \"labelFr\")
                 VALUES (1, 'mur', 'Mur');
             INSERT INTO periodes (id, periode, \"labelFr\", date_debut, date_fin)
                 VALUES (1, 'romaine', 'Romaine', -30, 395);
             INSERT INTO vestiges (id, id_site, id_caracterisation) VALUES (1, 1, 1);
             INSERT INTO datations (id, id_vestige, id_periode) VALUES (1, 1, 1);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn rows_are_keyed_by_column_name() {
        let conn = memory_db();
        let rows = query_rows(
            &conn,
            "SELECT DISTINCT \"periode\", \"periode\" AS \"Période\", \"date_debut\" \
             FROM periodes ORDER BY \"date_debut\"",
            &[],
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["periode"], "romaine");
        assert_eq!(rows[0]["Période"], "romaine");
        assert_eq!(rows[0]["date_debut"], -30);
    }

    #[test]
    fn ids_with_bound_parameters() {
        let conn = memory_db();
        let query = catalog::entity_query("sitesFouilles", "vestiges").unwrap();
        let clause =
            query.where_clause(&[("caracterisation".to_string(), "mur".to_string())]);
        let (sql, params) = clause.to_sql();

        assert_eq!(query_ids(&conn, &query.statement(&sql), &params).unwrap(), vec![101]);
    }

    #[test]
    fn details_for_unknown_site_is_none() {
        let conn = memory_db();
        assert!(site_details(&conn, 999).unwrap().is_none());

        let details = site_details(&conn, 101).unwrap().unwrap();
        assert_eq!(details.details["label"], "Kom el-Dikka");
        assert_eq!(details.vestiges.len(), 1);
        assert_eq!(details.vestiges[0]["periode"], "Romaine");
        assert!(details.discoveries.is_empty());
    }

    #[test]
    fn schema_version_is_recorded() {
        let conn = memory_db();
        assert_eq!(schema_version(&conn).unwrap().as_deref(), Some("1"));
    }

    #[test]
    fn unknown_quoted_column_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = Database::create(&dir.path().join("cartalex.db")).unwrap();
        let conn = db.connect().unwrap();

        let query = catalog::entity_query("sitesFouilles", "vestiges").unwrap();
        let clause = query.where_clause(&[("bogus".to_string(), "bogus".to_string())]);
        let (sql, params) = clause.to_sql();
        let err = query_ids(&conn, &query.statement(&sql), &params).unwrap_err();
        assert!(err.to_string().contains("bogus"), "{err}");
    }
}
