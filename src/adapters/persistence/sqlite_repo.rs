//! SQLite-backed consultation store via libsql. Implements ConsultationRepo.
//!
//! Two tables: `consultations` (one row per session, disposition as JSON) and
//! `utterances` with (consultation_id, seq) as primary key so transcripts read
//! back in append order. All consultations share one database file: data/careline.db

use crate::domain::{
    Category, Consultation, ConsultationStatus, Disposition, DomainError, LanguageCode, Role,
    Utterance,
};
use crate::ports::ConsultationRepo;
use libsql::{Database, Row, params};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

const CONSULTATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS consultations (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    language TEXT NOT NULL,
    status TEXT NOT NULL,
    category TEXT,
    disposition_json TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)"#;
const CONSULTATIONS_OWNER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_consultations_owner ON consultations (owner_id, created_at DESC)";

/// Append-only transcript. `seq` is assigned inside the insert transaction.
const UTTERANCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS utterances (
    consultation_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    PRIMARY KEY (consultation_id, seq)
)"#;

const CONSULTATION_COLUMNS: &str =
    "id, owner_id, language, status, category, disposition_json, created_at, updated_at";

/// SQLite repository. One database file (careline.db) in the given base directory.
pub struct SqliteRepo {
    db: Database,
    db_path: PathBuf,
}

impl SqliteRepo {
    /// Connect to (or create) the SQLite database and ensure the schema exists.
    /// Call this once at startup; the returned repo is safe to share via Arc.
    ///
    /// Sets WAL mode and synchronous=NORMAL for concurrent read/write.
    pub async fn connect(base_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let base = base_dir.as_ref();
        std::fs::create_dir_all(base).map_err(|e| DomainError::Repo(e.to_string()))?;
        let db_path = base.join("careline.db");
        let path_str = db_path.to_string_lossy();
        let db = libsql::Builder::new_local(path_str.as_ref())
            .build()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let conn = db.connect().map_err(|e| DomainError::Repo(e.to_string()))?;

        // PRAGMA returns a row (new value); use query and consume rows (execute fails when rows are returned).
        for pragma in ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"] {
            let mut rows = conn
                .query(pragma, ())
                .await
                .map_err(|e| DomainError::Repo(format!("{} failed: {}", pragma, e)))?;
            while rows
                .next()
                .await
                .map_err(|e| DomainError::Repo(e.to_string()))?
                .is_some()
            {}
        }

        for ddl in [CONSULTATIONS_TABLE, CONSULTATIONS_OWNER_INDEX, UTTERANCES_TABLE] {
            conn.execute(ddl, ())
                .await
                .map_err(|e| DomainError::Repo(e.to_string()))?;
        }

        info!(path = %db_path.display(), "SQLite connected with WAL mode");

        Ok(Self { db, db_path })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connection(&self) -> Result<libsql::Connection, DomainError> {
        self.db
            .connect()
            .map_err(|e| DomainError::Repo(e.to_string()))
    }

    /// Map a `consultations` row. Malformed optional columns read as absent.
    fn row_to_consultation(row: &Row) -> Result<Consultation, DomainError> {
        let id: String = row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?;
        let owner_id: String = row.get(1).map_err(|e| DomainError::Repo(e.to_string()))?;
        let language_raw: String = row.get::<String>(2).unwrap_or_default();
        let status_raw: String = row.get::<String>(3).unwrap_or_default();
        let category_raw: Option<String> = row.get::<String>(4).ok();
        let disposition_json: Option<String> = row.get::<String>(5).ok();
        let created_at: i64 = row.get(6).map_err(|e| DomainError::Repo(e.to_string()))?;
        let updated_at: i64 = row.get(7).map_err(|e| DomainError::Repo(e.to_string()))?;

        let language = LanguageCode::parse(&language_raw).unwrap_or_else(|_| {
            warn!(consultation_id = %id, language = %language_raw, "stored language invalid, using default");
            LanguageCode::default()
        });
        let disposition = disposition_json
            .as_deref()
            .and_then(|s| serde_json::from_str::<Disposition>(s).ok());

        Ok(Consultation {
            id,
            owner_id,
            language,
            status: ConsultationStatus::from_code(&status_raw),
            category: category_raw.and_then(|c| c.parse().ok()),
            disposition,
            created_at,
            updated_at,
        })
    }

    async fn exists(&self, conn: &libsql::Connection, id: &str) -> Result<bool, DomainError> {
        let mut rows = conn
            .query("SELECT 1 FROM consultations WHERE id = ?1", params![id])
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        Ok(rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
            .is_some())
    }

    /// Why a guarded `status = 'ACTIVE'` write touched no row.
    async fn inactive_error(&self, conn: &libsql::Connection, id: &str) -> DomainError {
        match self.exists(conn, id).await {
            Ok(true) => DomainError::ConsultationClosed(id.to_string()),
            Ok(false) => DomainError::NotFound(id.to_string()),
            Err(e) => e,
        }
    }

    /// Insert at MAX(seq)+1. Caller owns the transaction.
    async fn insert_utterance(
        conn: &libsql::Connection,
        id: &str,
        role: Role,
        content: &str,
        now: i64,
    ) -> Result<Utterance, DomainError> {
        let mut rows = conn
            .query(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM utterances WHERE consultation_id = ?1",
                params![id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let seq: i64 = match rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            Some(row) => row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?,
            None => 1,
        };
        drop(rows);

        conn.execute(
            r#"
            INSERT INTO utterances (consultation_id, seq, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![id, seq, role.code(), content, now],
        )
        .await
        .map_err(|e| DomainError::Repo(e.to_string()))?;

        Ok(Utterance {
            seq,
            role,
            content: content.to_string(),
            created_at: now,
        })
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[async_trait::async_trait]
impl ConsultationRepo for SqliteRepo {
    async fn create(&self, c: &Consultation) -> Result<(), DomainError> {
        let conn = self.connection()?;
        let disposition_json = match &c.disposition {
            Some(d) => Some(serde_json::to_string(d).map_err(|e| DomainError::Repo(e.to_string()))?),
            None => None,
        };
        conn.execute(
            &format!(
                "INSERT INTO consultations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                CONSULTATION_COLUMNS
            ),
            params![
                c.id.as_str(),
                c.owner_id.as_str(),
                c.language.as_str(),
                c.status.code(),
                c.category.map(|cat| cat.code().to_string()),
                disposition_json,
                c.created_at,
                c.updated_at
            ],
        )
        .await
        .map_err(|e| DomainError::Repo(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Consultation>, DomainError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM consultations WHERE id = ?1",
                    CONSULTATION_COLUMNS
                ),
                params![id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        match rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            Some(row) => Ok(Some(Self::row_to_consultation(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Consultation>, DomainError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {} FROM consultations WHERE owner_id = ?1 ORDER BY created_at DESC, id",
                    CONSULTATION_COLUMNS
                ),
                params![owner_id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            out.push(Self::row_to_consultation(&row)?);
        }
        Ok(out)
    }

    async fn append_utterance(
        &self,
        id: &str,
        role: Role,
        content: &str,
    ) -> Result<Utterance, DomainError> {
        let conn = self.connection()?;
        let now = now_secs();
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;

        let touched = tx
            .execute(
                "UPDATE consultations SET updated_at = ?1 WHERE id = ?2 AND status = 'ACTIVE'",
                params![now, id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        if touched == 0 {
            return Err(self.inactive_error(&tx, id).await);
        }

        let utterance = Self::insert_utterance(&tx, id, role, content, now).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        Ok(utterance)
    }

    async fn utterances(&self, id: &str) -> Result<Vec<Utterance>, DomainError> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT seq, role, content, created_at
                FROM utterances
                WHERE consultation_id = ?1
                ORDER BY seq ASC
                "#,
                params![id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?
        {
            let seq: i64 = row.get(0).map_err(|e| DomainError::Repo(e.to_string()))?;
            let role: String = row.get::<String>(1).unwrap_or_default();
            let content: String = row.get::<String>(2).unwrap_or_default();
            let created_at: i64 = row.get::<i64>(3).unwrap_or_default();
            out.push(Utterance {
                seq,
                role: Role::from_code(&role),
                content,
                created_at,
            });
        }
        Ok(out)
    }

    async fn update_category(&self, id: &str, category: Category) -> Result<(), DomainError> {
        let conn = self.connection()?;
        let touched = conn
            .execute(
                "UPDATE consultations SET category = ?1, updated_at = ?2 WHERE id = ?3 AND status = 'ACTIVE'",
                params![category.code(), now_secs(), id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        if touched == 0 {
            return Err(self.inactive_error(&conn, id).await);
        }
        Ok(())
    }

    async fn complete(
        &self,
        id: &str,
        category: Category,
        disposition: &Disposition,
        closing_message: &str,
    ) -> Result<Utterance, DomainError> {
        let conn = self.connection()?;
        let json =
            serde_json::to_string(disposition).map_err(|e| DomainError::Repo(e.to_string()))?;
        let now = now_secs();
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;

        let touched = tx
            .execute(
                r#"
                UPDATE consultations
                SET status = 'COMPLETED', category = ?1, disposition_json = ?2, updated_at = ?3
                WHERE id = ?4 AND status = 'ACTIVE'
                "#,
                params![category.code(), json, now, id],
            )
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        if touched == 0 {
            return Err(self.inactive_error(&tx, id).await);
        }
        let closing = Self::insert_utterance(&tx, id, Role::System, closing_message, now).await?;
        tx.commit()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        Ok(closing)
    }

    async fn delete(&self, id: &str) -> Result<(), DomainError> {
        let conn = self.connection()?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        tx.execute(
            "DELETE FROM utterances WHERE consultation_id = ?1",
            params![id],
        )
        .await
        .map_err(|e| DomainError::Repo(e.to_string()))?;
        let removed = tx
            .execute("DELETE FROM consultations WHERE id = ?1", params![id])
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        if removed == 0 {
            return Err(DomainError::NotFound(id.to_string()));
        }
        tx.commit()
            .await
            .map_err(|e| DomainError::Repo(e.to_string()))?;
        Ok(())
    }
}
