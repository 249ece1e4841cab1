//! libSQL backend — async `RecordStore` implementation.
//!
//! Local file or in-memory databases, version-tracked migrations, RFC 3339
//! text timestamps. The email and response rows for one message are written
//! inside one transaction.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{params, Connection, Database as LibSqlDatabase};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::store::traits::{EmailRecord, RecordStore, ResponseRecord};

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: r#"
        CREATE TABLE IF NOT EXISTS emails (
            id TEXT PRIMARY KEY,
            message_id TEXT NOT NULL,
            sender TEXT NOT NULL,
            subject TEXT NOT NULL,
            body TEXT NOT NULL,
            category TEXT NOT NULL,
            category_confidence REAL NOT NULL,
            priority TEXT NOT NULL,
            priority_confidence REAL NOT NULL,
            received_at TEXT NOT NULL,
            processed_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_emails_message_id ON emails(message_id);
        CREATE INDEX IF NOT EXISTS idx_emails_sender ON emails(sender);
        CREATE INDEX IF NOT EXISTS idx_emails_category ON emails(category);

        CREATE TABLE IF NOT EXISTS responses (
            id TEXT PRIMARY KEY,
            email_id TEXT NOT NULL REFERENCES emails(id) ON DELETE CASCADE,
            draft_id TEXT NOT NULL,
            body TEXT NOT NULL,
            kind TEXT NOT NULL,
            payload TEXT NOT NULL,
            model_version TEXT NOT NULL,
            generated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_responses_email ON responses(email_id);
    "#,
}];

/// libSQL record store.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("failed to open database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("failed to create connection: {e}")))?;

        let store = Self { db: Arc::new(db), conn };
        store.run_migrations().await?;
        info!(path = %path.display(), "Record store opened");
        Ok(store)
    }

    /// In-memory database (for tests and demos).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("failed to create database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("failed to create connection: {e}")))?;

        let store = Self { db: Arc::new(db), conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Apply unapplied migrations sequentially.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS _migrations (
                    version INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                (),
            )
            .await
            .map_err(|e| StoreError::Connection(format!("migration table: {e}")))?;

        let mut rows = self
            .conn
            .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
            .await
            .map_err(|e| StoreError::Connection(format!("migration version query: {e}")))?;
        let current: i64 = match rows
            .next()
            .await
            .map_err(|e| StoreError::Connection(format!("migration version row: {e}")))?
        {
            Some(row) => row
                .get(0)
                .map_err(|e| StoreError::Connection(format!("migration version value: {e}")))?,
            None => 0,
        };

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            self.conn
                .execute_batch(migration.sql)
                .await
                .map_err(|e| {
                    StoreError::Connection(format!("migration {} failed: {e}", migration.name))
                })?;
            self.conn
                .execute(
                    "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
                    params![migration.version, migration.name],
                )
                .await
                .map_err(|e| {
                    StoreError::Connection(format!("migration {} record: {e}", migration.name))
                })?;
            info!(version = migration.version, name = migration.name, "Applied migration");
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for LibSqlStore {
    async fn write_email_and_response(
        &self,
        email: &EmailRecord,
        response: &ResponseRecord,
    ) -> Result<(), StoreError> {
        let payload_json = serde_json::to_string(&response.payload)
            .map_err(|e| StoreError::Write(format!("payload serialization: {e}")))?;

        let email_id = Uuid::new_v4().to_string();
        let response_id = Uuid::new_v4().to_string();

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| StoreError::Write(format!("begin transaction: {e}")))?;

        tx.execute(
            "INSERT INTO emails (
                id, message_id, sender, subject, body,
                category, category_confidence, priority, priority_confidence,
                received_at, processed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                email_id.clone(),
                email.message_id.clone(),
                email.sender.clone(),
                email.subject.clone(),
                email.body.clone(),
                email.category.label(),
                email.category_confidence as f64,
                email.priority.label(),
                email.priority_confidence as f64,
                email.received_at.to_rfc3339(),
                email.processed_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| StoreError::Write(format!("email insert: {e}")))?;

        tx.execute(
            "INSERT INTO responses (
                id, email_id, draft_id, body, kind, payload,
                model_version, generated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                response_id,
                email_id,
                response.draft_id.clone(),
                response.body.clone(),
                response.kind.label(),
                payload_json,
                response.model_version.clone(),
                response.generated_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| StoreError::Write(format!("response insert: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Write(format!("commit: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::pipeline::types::{Category, DraftPayload, Priority};

    fn email_record() -> EmailRecord {
        EmailRecord {
            message_id: "msg-001".into(),
            sender: "alice@example.com".into(),
            subject: "Cannot login".into(),
            body: "keep getting errors".into(),
            category: Category::Support,
            category_confidence: 0.85,
            priority: Priority::High,
            priority_confidence: 0.6,
            received_at: Utc::now(),
            processed_at: Utc::now(),
        }
    }

    fn response_record() -> ResponseRecord {
        ResponseRecord {
            draft_id: "draft-1".into(),
            body: "Dear Alice,\n\nSteps below.\n\nBest".into(),
            kind: Category::Support,
            payload: DraftPayload::Support { ticket_id: "TKT-1".into() },
            model_version: "canned-v1".into(),
            generated_at: Utc::now(),
        }
    }

    async fn count(conn: &Connection, table: &str) -> i64 {
        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM {table}"), ())
            .await
            .unwrap();
        rows.next().await.unwrap().unwrap().get(0).unwrap()
    }

    #[tokio::test]
    async fn writes_linked_records() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store
            .write_email_and_response(&email_record(), &response_record())
            .await
            .unwrap();

        assert_eq!(count(&store.conn, "emails").await, 1);
        assert_eq!(count(&store.conn, "responses").await, 1);

        // Response row links to the email row
        let mut rows = store
            .conn
            .query(
                "SELECT COUNT(*) FROM responses r JOIN emails e ON r.email_id = e.id
                 WHERE e.message_id = ?1",
                params!["msg-001"],
            )
            .await
            .unwrap();
        let linked: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(linked, 1);
    }

    #[tokio::test]
    async fn payload_round_trips_through_json_column() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store
            .write_email_and_response(&email_record(), &response_record())
            .await
            .unwrap();

        let mut rows = store
            .conn
            .query("SELECT payload FROM responses", ())
            .await
            .unwrap();
        let payload_json: String = rows.next().await.unwrap().unwrap().get(0).unwrap();
        let payload: DraftPayload = serde_json::from_str(&payload_json).unwrap();
        assert!(matches!(payload, DraftPayload::Support { ticket_id } if ticket_id == "TKT-1"));
    }

    #[tokio::test]
    async fn migrations_are_recorded_and_idempotent() {
        let store = LibSqlStore::new_memory().await.unwrap();
        // Re-running must be a no-op
        store.run_migrations().await.unwrap();
        assert_eq!(count(&store.conn, "_migrations").await, 1);
    }

    #[tokio::test]
    async fn local_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");

        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            store
                .write_email_and_response(&email_record(), &response_record())
                .await
                .unwrap();
        }

        let store = LibSqlStore::new_local(&path).await.unwrap();
        assert_eq!(count(&store.conn, "emails").await, 1);
    }
}
