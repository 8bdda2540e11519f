//! DuckDB storage layer for raw captures and normalized leads.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use duckdb::{Connection, ToSql, params, params_from_iter};
use leadvault_core::schema::{LEADS_DDL, LEADS_TABLE, RAW_CAPTURES_DDL, RAW_CAPTURES_TABLE};
use leadvault_core::{
    FIELD_NAMES, LeadFields, LeadId, LeadStatus, NewLead, NewRawCapture, NormalizedLead,
    RawCapture,
};
use tracing::{debug, info};

use crate::{LeadGateway, StoreError, classify};

const LEAD_COLUMNS: &str = "id, first_name, last_name, email, phone, company, job_title, source, \
     campaign, utm_source, utm_medium, utm_campaign, utm_term, utm_content, landing_page, \
     referrer, description, idempotency_key, request_id, status, assigned_to, created_at";

/// DuckDB store for the `raw_captures` and `leads` tables.
///
/// One connection is shared behind a mutex; every statement is a single-row
/// autocommit, so a lookup issued after an insert returns on the same handle
/// always observes it. Uniqueness is enforced by the engine, never here.
///
/// Supports both in-memory (ephemeral) and persistent (file-backed) modes.
/// Use [`open`](Self::open) for in-memory and [`open_persistent`](Self::open_persistent)
/// for file-backed storage that survives across process restarts.
#[derive(Clone)]
pub struct DuckStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened persistent lead store");
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create both tables if they do not exist yet.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(RAW_CAPTURES_DDL)?;
        conn.execute_batch(LEADS_DDL)?;
        debug!("lead schema ready");
        Ok(())
    }

    /// Release the connection.
    ///
    /// Fails if other clones of this handle are still alive.
    pub fn close(self) -> Result<(), StoreError> {
        let mutex = Arc::try_unwrap(self.conn)
            .map_err(|_| StoreError::Other("store handle still shared at close".into()))?;
        let conn = mutex.into_inner().map_err(|_| StoreError::Poisoned)?;
        conn.close().map_err(|(_, err)| StoreError::DuckDb(err))?;
        info!("lead store closed");
        Ok(())
    }

    // ── Inspection ──

    /// Number of rows in `raw_captures`.
    pub fn raw_capture_count(&self) -> Result<usize, StoreError> {
        self.count_table(RAW_CAPTURES_TABLE)
    }

    /// Number of rows in `leads`.
    pub fn lead_count(&self) -> Result<usize, StoreError> {
        self.count_table(LEADS_TABLE)
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        let conn = self.lock()?;
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Fetch a raw capture by id.
    pub fn raw_capture(&self, id: LeadId) -> Result<Option<RawCapture>, StoreError> {
        let conn = self.lock()?;
        let row = conn.query_row(
            "SELECT id, payload, idempotency_key, request_id, created_at
             FROM raw_captures WHERE id = ?",
            [id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, NaiveDateTime>(4)?,
                ))
            },
        );
        let (id, payload, idempotency_key, request_id, created_at) = match row {
            Ok(row) => row,
            Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(RawCapture {
            id: parse_id(&id)?,
            payload: serde_json::from_str(&payload)?,
            idempotency_key,
            request_id,
            created_at: created_at.and_utc(),
        }))
    }

    /// Fetch a normalized lead by id.
    pub fn lead(&self, id: LeadId) -> Result<Option<NormalizedLead>, StoreError> {
        let conn = self.lock()?;
        select_lead(&conn, "id", &id.to_string())
    }

    /// Execute arbitrary SQL statements.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run blocking DuckDB work off the async executor.
    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl LeadGateway for DuckStore {
    async fn insert_raw_capture(&self, capture: NewRawCapture) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&capture.payload)?;
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO raw_captures (id, payload, idempotency_key, request_id, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    capture.id.to_string(),
                    payload,
                    capture.idempotency_key,
                    capture.request_id,
                    capture.created_at.naive_utc(),
                ],
            )
            .map_err(classify_duckdb)?;
            Ok(())
        })
        .await
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<(), StoreError> {
        self.blocking(move |conn| {
            let id = lead.id.to_string();
            let status = lead.status.as_str();
            let created_at = lead.created_at.naive_utc();
            let fields = lead.fields.values();

            // Columns and bound values are built together so they cannot drift.
            let mut columns: Vec<&str> = Vec::with_capacity(FIELD_NAMES.len() + 5);
            let mut values: Vec<&dyn ToSql> = Vec::with_capacity(FIELD_NAMES.len() + 5);
            columns.push("id");
            values.push(&id);
            for ((column, _), value) in FIELD_NAMES.iter().zip(&fields) {
                columns.push(*column);
                values.push(value);
            }
            columns.extend(["idempotency_key", "request_id", "status", "created_at"]);
            values.push(&lead.idempotency_key);
            values.push(&lead.request_id);
            values.push(&status);
            values.push(&created_at);

            let sql = insert_lead_sql(&columns);
            conn.execute(&sql, params_from_iter(values))
                .map_err(classify_duckdb)?;
            Ok(())
        })
        .await
    }

    async fn find_lead_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<NormalizedLead>, StoreError> {
        let key = key.to_owned();
        self.blocking(move |conn| select_lead(conn, "idempotency_key", &key))
            .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.blocking(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
            Ok(())
        })
        .await
    }
}

/// Turn an engine error into the gateway taxonomy.
fn classify_duckdb(err: duckdb::Error) -> StoreError {
    match classify::duplicate_key_fields(&err.to_string()) {
        Some(fields) => StoreError::UniqueViolation { fields },
        None => StoreError::DuckDb(err),
    }
}

/// `INSERT` into `leads` with one placeholder per named column.
fn insert_lead_sql(columns: &[&str]) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {LEADS_TABLE} ({}) VALUES ({placeholders})",
        columns.join(", ")
    )
}

fn select_lead(
    conn: &Connection,
    column: &str,
    value: &str,
) -> Result<Option<NormalizedLead>, StoreError> {
    let sql = format!("SELECT {LEAD_COLUMNS} FROM leads WHERE {column} = ?");
    let row = conn.query_row(&sql, [value], |row| {
        let mut fields: [Option<String>; 16] = Default::default();
        for (i, slot) in fields.iter_mut().enumerate() {
            *slot = row.get(i + 1)?;
        }
        Ok((
            row.get::<_, String>(0)?,
            fields,
            row.get::<_, Option<String>>(17)?,
            row.get::<_, Option<String>>(18)?,
            row.get::<_, String>(19)?,
            row.get::<_, Option<String>>(20)?,
            row.get::<_, NaiveDateTime>(21)?,
        ))
    });
    let (id, fields, idempotency_key, request_id, status, assigned_to, created_at) = match row {
        Ok(row) => row,
        Err(duckdb::Error::QueryReturnedNoRows) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    let status: LeadStatus = status
        .parse()
        .map_err(|err: leadvault_core::UnknownStatus| StoreError::Other(err.to_string()))?;
    Ok(Some(NormalizedLead {
        id: parse_id(&id)?,
        fields: LeadFields::from_values(fields),
        idempotency_key,
        request_id,
        status,
        assigned_to,
        created_at: created_at.and_utc(),
    }))
}

fn parse_id(raw: &str) -> Result<LeadId, StoreError> {
    raw.parse()
        .map_err(|err| StoreError::Other(format!("stored id {raw:?} is not a uuid: {err}")))
}
