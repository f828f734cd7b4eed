//! Durable summary store.
//!
//! A dedicated OS thread owns the single SQLite connection; async callers
//! send closures over an mpsc channel and receive results on oneshot
//! channels. This makes the store safe for concurrent access without any
//! external locking.

use std::{
    path::{Path, PathBuf},
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::oneshot;

mod migrations;

use crate::error::AgentFault;
use crate::models::Summary;
use migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .with_context(|| format!("failed to parse {field} '{value}'"))
}

fn row_to_summary(row: &Row<'_>) -> Result<Summary> {
    let date: String = row.get("date")?;
    Ok(Summary {
        id: row.get("id")?,
        date: parse_date(&date, "date")?,
        body: row.get("body")?,
    })
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
    db_path: Arc<PathBuf>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("notisum-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Summary store initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            db_path: Arc::new(db_path),
        })
    }

    pub fn path(&self) -> &Path {
        self.db_path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    /// Insert-or-abort: a duplicate id fails the insert and never overwrites
    /// the existing row.
    pub async fn insert_summary(&self, summary: &Summary) -> Result<()> {
        let record = summary.clone();
        self.execute(move |conn| {
            let insert = conn.execute(
                "INSERT INTO summaries (id, date, body) VALUES (?1, ?2, ?3)",
                params![record.id, record.date.to_string(), record.body],
            );
            match insert {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(AgentFault::DuplicateSummary(record.id.clone()).into())
                }
                Err(err) => {
                    Err(anyhow::Error::new(err).context("failed to insert summary"))
                }
            }
        })
        .await
    }

    pub async fn get_summary_by_id(&self, id: &str) -> Result<Option<Summary>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id, date, body FROM summaries WHERE id = ?1")?;
            let row = stmt
                .query_row(params![id], |row| {
                    Ok(row_to_summary(row))
                })
                .optional()?;
            row.transpose()
        })
        .await
    }

    /// Summaries for one calendar date, in insertion order.
    pub async fn get_summaries_by_date(&self, date: NaiveDate) -> Result<Vec<Summary>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, body FROM summaries WHERE date = ?1 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(params![date.to_string()], |row| Ok(row_to_summary(row)))?;

            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row??);
            }
            Ok(summaries)
        })
        .await
    }

    /// Summaries with date in `[start, end]`, inclusive on both ends.
    /// ISO-8601 date strings sort lexicographically, so BETWEEN is exact.
    pub async fn get_summaries_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Summary>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, date, body FROM summaries
                 WHERE date BETWEEN ?1 AND ?2
                 ORDER BY date ASC, rowid ASC",
            )?;
            let rows = stmt.query_map(
                params![start.to_string(), end.to_string()],
                |row| Ok(row_to_summary(row)),
            )?;

            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row??);
            }
            Ok(summaries)
        })
        .await
    }

    /// Store-wide reset; the only way a persisted summary is ever deleted.
    pub async fn reset(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute("DELETE FROM summaries", [])
                .context("failed to reset summary store")?;
            Ok(())
        })
        .await
    }
}
