//! Records `(hash, url, insert_time)` for every DownloadedBlob seen, keyed
//! to avoid duplicate `(url, hash)` pairs. Mirrors
//! `SQLLiteRememberDownloadedObjects`.

use chrono::Utc;
use rusqlite::{params, Connection};

use triage_protocol::config::validate_table_name;
use triage_protocol::{Kind, Object, Payload};
use triage_worker::Sink;

pub struct SqliteDedupSink {
    db_filename: String,
    db_table: String,
}

impl SqliteDedupSink {
    pub fn new(db_filename: impl Into<String>, db_table: impl Into<String>) -> anyhow::Result<Self> {
        let db_table = db_table.into();
        validate_table_name(&db_table)?;
        Ok(SqliteDedupSink {
            db_filename: db_filename.into(),
            db_table,
        })
    }

    fn ensure_table(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (hash TEXT, url TEXT, insert_time TEXT)",
                self.db_table
            ),
            [],
        )?;
        Ok(())
    }

    fn insert_if_absent(&self, conn: &Connection, url: &str, hashdig: &str) -> rusqlite::Result<()> {
        let exists: bool = conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE url = ?1 AND hash = ?2)",
                self.db_table
            ),
            params![url, hashdig],
            |row| row.get(0),
        )?;
        if exists {
            tracing::debug!(target: "triage_sinks", url, hashdig, "entry already present");
            return Ok(());
        }
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S%.f").to_string();
        conn.execute(
            &format!("INSERT INTO {} VALUES (?1, ?2, ?3)", self.db_table),
            params![hashdig, url, now],
        )?;
        tracing::debug!(target: "triage_sinks", url, hashdig, "entry added");
        Ok(())
    }
}

impl Sink for SqliteDedupSink {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::DownloadedBlob)
    }

    fn handle(&mut self, input: &Object) {
        let Payload::DownloadedBlob { url, hashdig, .. } = &input.payload else {
            return;
        };
        let conn = match Connection::open(&self.db_filename) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(target: "triage_sinks", error = %e, "sqlite open failed");
                return;
            }
        };
        if let Err(e) = self.ensure_table(&conn) {
            tracing::error!(target: "triage_sinks", error = %e, "sqlite table setup failed");
            return;
        }
        if let Err(e) = self.insert_if_absent(&conn, url, hashdig) {
            tracing::error!(target: "triage_sinks", error = %e, "sqlite insert failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_table_name() {
        assert!(SqliteDedupSink::new("x.db", "1bad").is_err());
        assert!(SqliteDedupSink::new("x.db", "bad-name").is_err());
    }

    #[test]
    fn dedups_same_url_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("dl.db");
        let sink = SqliteDedupSink::new(db_path.to_str().unwrap(), "downloads").unwrap();
        let conn = Connection::open(&db_path).unwrap();
        sink.ensure_table(&conn).unwrap();
        sink.insert_if_absent(&conn, "http://x.y/z", "abc123").unwrap();
        sink.insert_if_absent(&conn, "http://x.y/z", "abc123").unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM downloads", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
