use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{KokizamiError, Result};
use crate::store::{EntryStore, TagStore};
use crate::tag::Tag;
use crate::time_entry::TimeEntry;

/// ストレージ上の日時フォーマット。UTCで保存する。
const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS kizami (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    "desc" VARCHAR(255) NOT NULL,
    started_at TIMESTAMP NOT NULL DEFAULT (DATETIME('now')),
    stopped_at TIMESTAMP NOT NULL DEFAULT (DATETIME('1970-01-01'))
);
CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    label VARCHAR(255) NOT NULL,
    UNIQUE(label) ON CONFLICT IGNORE
);
CREATE TABLE IF NOT EXISTS relation (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    kizami_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    UNIQUE(kizami_id, tag_id) ON CONFLICT IGNORE
);
"#;

const SELECT_ENTRY: &str = r#"SELECT id, "desc", started_at, stopped_at FROM kizami"#;

/// SQLiteによる`EntryStore`および`TagStore`の実装。
///
/// 1つのコネクションをコマンドの実行中保持し、dropで解放する。
///
/// # Examples
///
/// ```ignore
/// let store = SqliteStore::open(&config.db_path)?;
/// let kokizami = Kokizami::new(&store, &store);
/// ```
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// 指定されたパスのデータベースを開き、テーブルがなければ作成する。
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!("Database opened at: {:?}", path);
        Self::initialize(conn)
    }

    /// メモリ上のデータベースを開く。
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self> {
        debug!("QUERY: {}", CREATE_TABLES);
        conn.execute_batch(CREATE_TABLES)?;
        Ok(Self { conn })
    }

    /// コネクションを閉じる。
    ///
    /// dropでも閉じられるが、こちらは失敗をエラーとして返す。
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| KokizamiError::Storage(e))
    }

    fn execute<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        debug!("QUERY: {}", sql);
        Ok(self.conn.execute(sql, params)?)
    }

    fn query_entries<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<TimeEntry>> {
        debug!("QUERY: {}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt
            .query_map(params, entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn query_tags<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Tag>> {
        debug!("QUERY: {}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let tags = stmt
            .query_map(params, |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    label: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tags)
    }
}

fn to_storage(datetime: &DateTime<Utc>) -> String {
    datetime.format(STORAGE_FORMAT).to_string()
}

fn from_storage(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(index)?;
    NaiveDateTime::parse_from_str(&value, STORAGE_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<TimeEntry> {
    Ok(TimeEntry {
        id: row.get(0)?,
        description: row.get(1)?,
        started_at: from_storage(row, 2)?,
        stopped_at: from_storage(row, 3)?,
    })
}

/// `IN`句に使うプレースホルダ(`?, ?, ?`)を作る。
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl EntryStore for SqliteStore {
    fn insert(&self, description: &str) -> Result<TimeEntry> {
        let mut entry = TimeEntry::new(description)?;
        self.execute(
            r#"INSERT INTO kizami ("desc", started_at, stopped_at) VALUES (?1, ?2, ?3)"#,
            params![
                entry.description,
                to_storage(&entry.started_at),
                to_storage(&entry.stopped_at)
            ],
        )?;
        entry.id = self.conn.last_insert_rowid();
        Ok(entry)
    }

    fn find_by_id(&self, id: i64) -> Result<TimeEntry> {
        let sql = format!("{} WHERE id = ?1", SELECT_ENTRY);
        debug!("QUERY: {} [{}]", sql, id);
        self.conn
            .query_row(&sql, params![id], entry_from_row)
            .optional()?
            .ok_or_else(|| KokizamiError::entry_not_found(id))
    }

    fn find_all(&self) -> Result<Vec<TimeEntry>> {
        self.query_entries(&format!("{} ORDER BY id", SELECT_ENTRY), [])
    }

    fn find_by_stopped_at(&self, stopped_at: DateTime<Utc>) -> Result<Vec<TimeEntry>> {
        self.query_entries(
            &format!("{} WHERE stopped_at = ?1 ORDER BY id", SELECT_ENTRY),
            params![to_storage(&stopped_at)],
        )
    }

    fn update(&self, entry: &TimeEntry) -> Result<()> {
        let changed = self.execute(
            r#"UPDATE kizami SET "desc" = ?1, started_at = ?2, stopped_at = ?3 WHERE id = ?4"#,
            params![
                entry.description,
                to_storage(&entry.started_at),
                to_storage(&entry.stopped_at),
                entry.id
            ],
        )?;
        if changed == 0 {
            return Err(KokizamiError::entry_not_found(entry.id));
        }
        Ok(())
    }

    fn delete(&self, entry: &TimeEntry) -> Result<()> {
        let changed = self.execute("DELETE FROM kizami WHERE id = ?1", params![entry.id])?;
        if changed == 0 {
            return Err(KokizamiError::entry_not_found(entry.id));
        }
        Ok(())
    }

    fn begin(&self) -> Result<()> {
        debug!("QUERY: BEGIN");
        Ok(self.conn.execute_batch("BEGIN")?)
    }

    fn commit(&self) -> Result<()> {
        debug!("QUERY: COMMIT");
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(&self) -> Result<()> {
        debug!("QUERY: ROLLBACK");
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }
}

impl TagStore for SqliteStore {
    fn insert_labels(&self, labels: &[String]) -> Result<()> {
        let sql = "INSERT INTO tag (label) VALUES (?1)";
        debug!("QUERY: {} {:?}", sql, labels);
        let mut stmt = self.conn.prepare(sql)?;
        for label in labels.iter().filter(|label| !label.is_empty()) {
            stmt.execute(params![label])?;
        }
        Ok(())
    }

    fn find_all(&self) -> Result<Vec<Tag>> {
        self.query_tags("SELECT id, label FROM tag ORDER BY id", [])
    }

    fn find_by_id(&self, id: i64) -> Result<Tag> {
        let sql = "SELECT id, label FROM tag WHERE id = ?1";
        debug!("QUERY: {} [{}]", sql, id);
        self.conn
            .query_row(sql, params![id], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    label: row.get(1)?,
                })
            })
            .optional()?
            .ok_or_else(|| KokizamiError::tag_not_found(id))
    }

    fn find_by_labels(&self, labels: &[String]) -> Result<Vec<Tag>> {
        if labels.is_empty() {
            return Ok(vec![]);
        }
        let sql = format!(
            "SELECT id, label FROM tag WHERE label IN ({}) ORDER BY id",
            placeholders(labels.len())
        );
        self.query_tags(&sql, params_from_iter(labels.iter()))
    }

    fn find_by_entry_id(&self, entry_id: i64) -> Result<Vec<Tag>> {
        self.query_tags(
            "SELECT t.id, t.label FROM tag t \
             INNER JOIN relation r ON r.tag_id = t.id \
             WHERE r.kizami_id = ?1 ORDER BY t.id",
            params![entry_id],
        )
    }

    fn find_relations(&self) -> Result<Vec<(i64, Tag)>> {
        let sql = "SELECT r.kizami_id, t.id, t.label FROM relation r \
                   INNER JOIN tag t ON t.id = r.tag_id \
                   ORDER BY r.kizami_id, t.id";
        debug!("QUERY: {}", sql);
        let mut stmt = self.conn.prepare(sql)?;
        let relations = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    Tag {
                        id: row.get(1)?,
                        label: row.get(2)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(relations)
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.execute("DELETE FROM relation WHERE tag_id = ?1", params![id])?;
        let changed = self.execute("DELETE FROM tag WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(KokizamiError::tag_not_found(id));
        }
        Ok(())
    }

    fn associate(&self, entry_id: i64, tag_ids: &[i64]) -> Result<()> {
        let sql = "INSERT INTO relation (kizami_id, tag_id) VALUES (?1, ?2)";
        debug!("QUERY: {} [{}, {:?}]", sql, entry_id, tag_ids);
        let mut stmt = self.conn.prepare(sql)?;
        for tag_id in tag_ids {
            stmt.execute(params![entry_id, tag_id])?;
        }
        Ok(())
    }

    fn dissociate(&self, entry_id: i64) -> Result<()> {
        self.execute("DELETE FROM relation WHERE kizami_id = ?1", params![entry_id])?;
        Ok(())
    }
}
