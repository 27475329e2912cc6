//! Single-table `SQLite` store for indexed sauces
//!
//! Every read and write goes through one connection guarded by an async mutex.
//! Writes open a transaction lazily, it stays open until `commit`, `rollback`
//! or `close`.

pub mod record;

pub use record::{Column, Row, SauceRecord, Tag, decode_tags, encode_tags};

use crate::shell::Value;
use futures::TryStreamExt;
use record::RawRecord;
use sqlx::{
    ConnectOptions, Connection, SqliteConnection,
    sqlite::SqliteConnectOptions,
};
use std::{
    path::{Path, PathBuf},
    str::FromStr,
};
use tokio::sync::Mutex;
use tracing::debug;

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS sauces (
        id INTEGER NOT NULL UNIQUE,
        title TEXT NOT NULL,
        uploaded INTEGER NOT NULL,
        tags TEXT NOT NULL,
        pages INTEGER NOT NULL,
        favorites INTEGER NOT NULL
    )
";

const SELECT_RECORDS: &str = "SELECT id, title, uploaded, tags, pages, favorites FROM sauces";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sauce #{id} already exists")]
    AlreadyExists { id: i64 },
    #[error("the store is closed")]
    Closed,
    #[error("unknown column {0:?}, expected one of: id, title, uploaded, tags, pages, favorites")]
    UnknownColumn(String),
    #[error("{value:?} is not a valid {column}")]
    InvalidValue { column: Column, value: String },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("failed to encode tags: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// How the next id to index is derived from the stored rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// Largest stored id plus one, gaps do not matter
    #[default]
    MaxId,
    /// Number of stored rows plus one, only correct for a gap-free store
    RowCount,
}

impl FromStr for CursorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max-id" => Ok(Self::MaxId),
            "row-count" => Ok(Self::RowCount),
            _ => Err(format!("Invalid cursor mode: {s}")),
        }
    }
}

struct Inner {
    conn: Option<SqliteConnection>,
    in_transaction: bool,
}

impl Inner {
    fn connection(&mut self) -> Result<&mut SqliteConnection, StoreError> {
        self.conn.as_mut().ok_or(StoreError::Closed)
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            sqlx::query("BEGIN IMMEDIATE")
                .execute(self.connection()?)
                .await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            sqlx::query("COMMIT").execute(self.connection()?).await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            self.in_transaction = false;
            sqlx::query("ROLLBACK").execute(self.connection()?).await?;
        }
        Ok(())
    }
}

pub struct SauceStore {
    inner: Mutex<Inner>,
    path: Option<PathBuf>,
}

impl SauceStore {
    /// Open or create the database file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the table created
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options, Some(path.to_path_buf())).await
    }

    /// A private database that lives as long as the store
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        Self::connect(options, None).await
    }

    async fn connect(
        options: SqliteConnectOptions,
        path: Option<PathBuf>,
    ) -> Result<Self, StoreError> {
        let mut conn = options.disable_statement_logging().connect().await?;
        sqlx::query(CREATE_TABLE).execute(&mut conn).await?;

        debug!(path = ?path, "store opened");

        Ok(Self {
            inner: Mutex::new(Inner {
                conn: Some(conn),
                in_transaction: false,
            }),
            path,
        })
    }

    /// Database file, `None` for in-memory stores
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Next id the indexer should attempt, `1` on an empty store
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the query fails
    pub async fn next_cursor(&self, mode: CursorMode) -> Result<i64, StoreError> {
        let sql = match mode {
            CursorMode::MaxId => "SELECT COALESCE(MAX(id), 0) FROM sauces",
            CursorMode::RowCount => "SELECT COUNT(*) FROM sauces",
        };

        let mut inner = self.inner.lock().await;
        let last: i64 = sqlx::query_scalar(sql)
            .fetch_one(inner.connection()?)
            .await?;

        Ok(last + 1)
    }

    /// Insert a record unless its id is already stored
    ///
    /// The existence check and the insert run under the store lock, so two
    /// concurrent inserts of one id have exactly one winner.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if the id is stored, nothing is
    /// written in that case
    pub async fn insert(&self, record: &SauceRecord) -> Result<(), StoreError> {
        let tags = encode_tags(&record.tags)?;

        let mut inner = self.inner.lock().await;
        inner.begin().await?;
        let conn = inner.connection()?;

        let existing: Option<i64> = sqlx::query_scalar("SELECT id FROM sauces WHERE id = ?")
            .bind(record.id)
            .fetch_optional(&mut *conn)
            .await?;
        if existing.is_some() {
            return Err(StoreError::AlreadyExists { id: record.id });
        }

        sqlx::query(
            "INSERT INTO sauces (id, title, uploaded, tags, pages, favorites) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(&record.title)
        .bind(record.uploaded)
        .bind(tags)
        .bind(record.pages)
        .bind(record.favorites)
        .execute(&mut *conn)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::AlreadyExists { id: record.id }
            }
            other => StoreError::Database(other),
        })?;

        Ok(())
    }

    /// Make pending writes durable
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails or the store is closed
    pub async fn commit(&self) -> Result<(), StoreError> {
        self.inner.lock().await.commit().await
    }

    /// Discard pending writes
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails or the store is closed
    pub async fn rollback(&self) -> Result<(), StoreError> {
        self.inner.lock().await.rollback().await
    }

    /// Commit and release the connection, a second call does nothing
    ///
    /// # Errors
    ///
    /// Returns an error if the final commit or the close fails
    pub async fn close(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.conn.is_none() {
            return Ok(());
        }

        let committed = inner.commit().await;
        if let Some(conn) = inner.conn.take() {
            conn.close().await?;
        }
        committed?;

        debug!(path = ?self.path, "store closed");
        Ok(())
    }

    #[must_use]
    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.conn.is_none()
    }

    /// # Errors
    ///
    /// Returns an error if the store is closed or the query fails
    pub async fn count(&self) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM sauces")
            .fetch_one(inner.connection()?)
            .await?)
    }

    /// # Errors
    ///
    /// Returns an error if the store is closed or the query fails
    pub async fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.count().await? == 0)
    }

    /// Stream a projection of every row, in insertion order, into `visit`
    ///
    /// An empty `columns` slice selects every column. Returns the number of
    /// rows visited.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or a row cannot be read
    pub async fn scan_each<F>(&self, columns: &[Column], mut visit: F) -> Result<usize, StoreError>
    where
        F: FnMut(Row),
    {
        let columns: Vec<Column> = if columns.is_empty() {
            Column::ALL.to_vec()
        } else {
            columns.to_vec()
        };
        let sql = format!(
            "SELECT {} FROM sauces ORDER BY rowid",
            columns
                .iter()
                .map(|column| column.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let mut inner = self.inner.lock().await;
        let mut rows = sqlx::query(&sql).fetch(inner.connection()?);

        let mut visited = 0;
        while let Some(row) = rows.try_next().await? {
            visit(Row::from_sqlite(&row, &columns)?);
            visited += 1;
        }

        Ok(visited)
    }

    /// Collect a projection of every row, in insertion order
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or a row cannot be read
    pub async fn scan(&self, columns: &[Column]) -> Result<Vec<Row>, StoreError> {
        let mut rows = Vec::new();
        self.scan_each(columns, |row| rows.push(row)).await?;
        Ok(rows)
    }

    /// Every record, in insertion order
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or a row cannot be decoded
    pub async fn records(&self) -> Result<Vec<SauceRecord>, StoreError> {
        self.select(&format!("{SELECT_RECORDS} ORDER BY rowid"), None)
            .await
    }

    /// Records whose `column` matches `needle`
    ///
    /// Numeric columns compare exactly, `title` is a case-insensitive
    /// substring match and `tags` matches a tag name or a `kind:name` pair.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidValue` if `needle` does not fit a numeric
    /// column
    pub async fn find(&self, column: Column, needle: &str) -> Result<Vec<SauceRecord>, StoreError> {
        match column {
            Column::Tags => Ok(self
                .records()
                .await?
                .into_iter()
                .filter(|record| record.tags.iter().any(|tag| tag.matches(needle)))
                .collect()),
            Column::Title => {
                self.select(
                    &format!(
                        "{SELECT_RECORDS} WHERE instr(lower(title), lower(?)) > 0 ORDER BY rowid"
                    ),
                    Some(Value::Text(needle.to_string())),
                )
                .await
            }
            Column::Id | Column::Uploaded | Column::Pages | Column::Favorites => {
                let value = needle
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| StoreError::InvalidValue {
                        column,
                        value: needle.to_string(),
                    })?;
                self.select(
                    &format!("{SELECT_RECORDS} WHERE {column} = ? ORDER BY rowid"),
                    Some(Value::Integer(value)),
                )
                .await
            }
        }
    }

    async fn select(&self, sql: &str, bind: Option<Value>) -> Result<Vec<SauceRecord>, StoreError> {
        let mut query = sqlx::query_as::<_, RawRecord>(sql);
        query = match bind {
            Some(Value::Integer(value)) => query.bind(value),
            Some(Value::Float(value)) => query.bind(value),
            Some(Value::Text(value)) => query.bind(value),
            None => query,
        };

        let mut inner = self.inner.lock().await;
        let rows = query.fetch_all(inner.connection()?).await?;

        rows.into_iter().map(SauceRecord::try_from).collect()
    }
}
