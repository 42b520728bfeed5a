//! SQLite-backed action store.

use respond_types::{
    Action, ActionStore, ActionType, RangeQuery, RowOrder, StoreError, Triggerer,
    MAX_ROWS_PER_QUERY,
};
use std::path::Path;

const COLUMNS: &str = "codeid, did, ip, ips, action, manual, triggerer, label, detail, score, \
                       pbid, model, modeluuid, start, expires, blocked, active, cleared";

/// SQLite-backed action store for persistence.
pub struct SqliteActionStore {
    conn: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteActionStore {
    /// Open (or create) the store at `path`. Use `":memory:"` for a throwaway database.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn =
            rusqlite::Connection::open(path).map_err(|e| StoreError::Other(e.to_string()))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS antigena_actions (
                codeid INTEGER PRIMARY KEY,
                did INTEGER NOT NULL,
                ip TEXT NOT NULL,
                ips TEXT NOT NULL,
                action TEXT NOT NULL,
                manual INTEGER NOT NULL,
                triggerer TEXT,
                label TEXT NOT NULL,
                detail TEXT NOT NULL,
                score REAL NOT NULL,
                pbid INTEGER NOT NULL,
                model TEXT NOT NULL,
                modeluuid TEXT NOT NULL,
                start INTEGER NOT NULL,
                expires INTEGER NOT NULL,
                blocked INTEGER NOT NULL,
                active INTEGER NOT NULL,
                cleared INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_actions_ip ON antigena_actions(ip);
            CREATE INDEX IF NOT EXISTS idx_actions_start ON antigena_actions(start);
            "#,
        )
        .map_err(|e| StoreError::Other(e.to_string()))?;
        tracing::debug!("sqlite action store ready");

        Ok(Self {
            conn: std::sync::Mutex::new(conn),
        })
    }

    fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Other(format!("failed to acquire lock: {}", e)))?;
        f(&conn).map_err(|e| StoreError::Other(e.to_string()))
    }
}

fn row_to_action(row: &rusqlite::Row<'_>) -> Result<Action, rusqlite::Error> {
    let ips_json: String = row.get(3)?;
    let triggerer_json: Option<String> = row.get(6)?;
    let action: String = row.get(4)?;
    Ok(Action {
        codeid: row.get(0)?,
        did: row.get(1)?,
        ip: row.get(2)?,
        ips: serde_json::from_str(&ips_json).unwrap_or_default(),
        action: ActionType::from(action),
        manual: row.get(5)?,
        triggerer: triggerer_json.and_then(|t| serde_json::from_str::<Triggerer>(&t).ok()),
        label: row.get(7)?,
        detail: row.get(8)?,
        score: row.get(9)?,
        pbid: row.get(10)?,
        model: row.get(11)?,
        modeluuid: row.get(12)?,
        start: row.get(13)?,
        expires: row.get(14)?,
        blocked: row.get(15)?,
        active: row.get(16)?,
        cleared: row.get(17)?,
    })
}

#[async_trait::async_trait]
impl ActionStore for SqliteActionStore {
    async fn select_range(&self, query: &RangeQuery) -> Result<Vec<Action>, StoreError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let limit = query.len().min(MAX_ROWS_PER_QUERY) as i64;
        let offset = query.from as i64;
        let order = match query.order {
            RowOrder::Natural => "rowid ASC",
            RowOrder::StartDesc => "start DESC, rowid ASC",
        };
        self.with_conn(|conn| {
            let rows = match &query.ip {
                Some(ip) => {
                    let sql = format!(
                        "SELECT {COLUMNS} FROM antigena_actions WHERE ip = ?1 ORDER BY {order} LIMIT ?2 OFFSET ?3"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let mapped = stmt.query_map(rusqlite::params![ip, limit, offset], row_to_action)?;
                    mapped.collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let sql = format!(
                        "SELECT {COLUMNS} FROM antigena_actions ORDER BY {order} LIMIT ?1 OFFSET ?2"
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let mapped = stmt.query_map(rusqlite::params![limit, offset], row_to_action)?;
                    mapped.collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
    }

    async fn select_ips(&self, from: usize, to: usize) -> Result<Vec<String>, StoreError> {
        if to < from {
            return Ok(Vec::new());
        }
        let limit = (to - from + 1).min(MAX_ROWS_PER_QUERY) as i64;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ip FROM antigena_actions ORDER BY rowid ASC LIMIT ?1 OFFSET ?2",
            )?;
            let mapped = stmt.query_map(rusqlite::params![limit, from as i64], |row| row.get(0))?;
            mapped.collect::<Result<Vec<String>, _>>()
        })
    }

    async fn upsert(&self, rows: &[Action]) -> Result<Option<usize>, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut written = 0usize;
            {
                let sql = format!(
                    "INSERT INTO antigena_actions ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18) \
                     ON CONFLICT(codeid) DO UPDATE SET \
                     did = excluded.did, ip = excluded.ip, ips = excluded.ips, action = excluded.action, \
                     manual = excluded.manual, triggerer = excluded.triggerer, label = excluded.label, \
                     detail = excluded.detail, score = excluded.score, pbid = excluded.pbid, \
                     model = excluded.model, modeluuid = excluded.modeluuid, start = excluded.start, \
                     expires = excluded.expires, blocked = excluded.blocked, active = excluded.active, \
                     cleared = excluded.cleared"
                );
                let mut stmt = tx.prepare(&sql)?;
                for a in rows {
                    let ips_json = serde_json::to_string(&a.ips)
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                    let triggerer_json = a
                        .triggerer
                        .as_ref()
                        .map(serde_json::to_string)
                        .transpose()
                        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                    written += stmt.execute(rusqlite::params![
                        a.codeid,
                        a.did,
                        a.ip,
                        ips_json,
                        a.action.as_str(),
                        a.manual,
                        triggerer_json,
                        a.label,
                        a.detail,
                        a.score,
                        a.pbid,
                        a.model,
                        a.modeluuid,
                        a.start,
                        a.expires,
                        a.blocked,
                        a.active,
                        a.cleared,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(Some(written))
        })
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| conn.execute("DELETE FROM antigena_actions", []).map(|_| ()))
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM antigena_actions", [], |row| {
                row.get::<_, i64>(0)
            })
        })
        .map(|n| n as usize)
    }
}
