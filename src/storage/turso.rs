use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use libsql::{params, Builder, Connection, Database, Row, Value};

use crate::{
    config::StorageConfig,
    service::{
        request::{Amount, NewRequest, Request, RequestDetails, RequestStatus},
        user::User,
    },
};

use super::{Repository, StorageError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    city TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS requests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    currency TEXT NOT NULL,
    amount TEXT NOT NULL,
    comment TEXT NOT NULL DEFAULT '',
    file_path TEXT,
    status TEXT NOT NULL DEFAULT 'Pending',
    admin_comment TEXT,
    request_number INTEGER NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (user_id, request_number)
);
CREATE INDEX IF NOT EXISTS idx_requests_status ON requests (status);
";

const DETAILS_SELECT: &str = "
SELECT r.id, r.user_id, r.request_number, r.currency, r.amount, r.comment, r.file_path,
       r.status, r.admin_comment, r.created_at,
       COALESCE(u.name, ''), COALESCE(u.phone, ''), COALESCE(u.city, '')
FROM requests r
LEFT JOIN users u ON u.user_id = r.user_id
";

const REQUEST_SELECT: &str = "
SELECT id, user_id, request_number, currency, amount, comment, file_path,
       status, admin_comment, created_at
FROM requests
";

/// Concurrent submissions from one user may race for the same number.
const ADD_REQUEST_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct TursoClient {
    #[allow(dead_code)]
    inner: Arc<Database>,
    conn: Connection,
}

impl TursoClient {
    pub async fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        info!("Initializing TursoClient...");

        let db = match &config.turso {
            Some(turso) => {
                info!("Connecting to remote database {}", turso.url);
                Builder::new_remote(turso.url.clone(), turso.token.clone())
                    .build()
                    .await?
            }
            None => {
                info!("Opening local database {}", config.database_path);
                Builder::new_local(&config.database_path).build().await?
            }
        };

        let conn = db.connect()?;

        info!("TursoClient initialized");
        Ok(Self {
            inner: Arc::new(db),
            conn,
        })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;
        Ok(Self {
            inner: Arc::new(db),
            conn,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[derive(Clone)]
pub struct TursoRepository {
    client: TursoClient,
}

impl TursoRepository {
    pub fn new(client: TursoClient) -> Self {
        Self { client }
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        info!("Applying database schema");
        self.client.connection().execute_batch(SCHEMA).await?;
        Ok(())
    }

    async fn count(&self, sql: &str) -> Result<u64, StorageError> {
        let mut rows = self.client.connection().query(sql, ()).await?;
        match rows.next().await? {
            Some(row) => Ok(row.get::<i64>(0)?.max(0) as u64),
            None => Ok(0),
        }
    }

    async fn fetch_details(&self, sql: &str, params: Vec<Value>) -> Result<Vec<RequestDetails>, StorageError> {
        let mut rows = self.client.connection().query(sql, params).await?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().await? {
            result.push(details_from_row(&row)?);
        }
        Ok(result)
    }
}

#[async_trait]
impl Repository for TursoRepository {
    async fn is_user_registered(&self, user_id: i64) -> Result<bool, StorageError> {
        let mut rows = self
            .client
            .connection()
            .query("SELECT 1 FROM users WHERE user_id = ?1 LIMIT 1", params![user_id])
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn add_user(&self, user: &User) -> Result<bool, StorageError> {
        let inserted = self
            .client
            .connection()
            .execute(
                "INSERT OR IGNORE INTO users (user_id, name, phone, city) VALUES (?1, ?2, ?3, ?4)",
                params![user.user_id, user.name.clone(), user.phone.clone(), user.city.clone()],
            )
            .await?;
        Ok(inserted > 0)
    }

    async fn get_user_info(&self, user_id: i64) -> Result<Option<User>, StorageError> {
        let mut rows = self
            .client
            .connection()
            .query(
                "SELECT user_id, name, phone, city FROM users WHERE user_id = ?1",
                params![user_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(User {
                user_id: row.get::<i64>(0)?,
                name: row.get::<String>(1)?,
                phone: row.get::<String>(2)?,
                city: row.get::<String>(3)?,
            })),
            None => Ok(None),
        }
    }

    async fn add_request(&self, request: &NewRequest) -> Result<(i64, i64), StorageError> {
        // Numbering and insert happen in one statement; the unique index catches the rest.
        let sql = "
            INSERT INTO requests (user_id, currency, amount, comment, file_path, request_number)
            SELECT ?1, ?2, ?3, ?4, ?5, COALESCE(MAX(request_number), 0) + 1
            FROM requests WHERE user_id = ?1
            RETURNING id, request_number";

        let mut last_error = None;
        for attempt in 1..=ADD_REQUEST_ATTEMPTS {
            let params = vec![
                Value::Integer(request.user_id),
                Value::Text(request.currency.clone()),
                Value::Text(request.amount.as_str().to_string()),
                Value::Text(request.comment.clone()),
                opt_text(request.file_path.as_deref()),
            ];

            match self.client.connection().query(sql, params).await {
                Ok(mut rows) => {
                    let row = rows
                        .next()
                        .await?
                        .ok_or_else(|| StorageError::Corrupt("insert returned no row".to_string()))?;
                    return Ok((row.get::<i64>(0)?, row.get::<i64>(1)?));
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!(
                        "Request number conflict for user {} (attempt {}/{})",
                        request.user_id, attempt, ADD_REQUEST_ATTEMPTS
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::Conflict(format!(
            "could not assign request number for user {}: {}",
            request.user_id,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }

    async fn update_request_status(
        &self,
        request_id: i64,
        status: RequestStatus,
        admin_comment: Option<&str>,
    ) -> Result<bool, StorageError> {
        let updated = self
            .client
            .connection()
            .execute(
                "UPDATE requests SET status = ?1, admin_comment = COALESCE(?2, admin_comment)
                 WHERE id = ?3 AND status = 'Pending'",
                vec![
                    Value::Text(status.as_str().to_string()),
                    opt_text(admin_comment),
                    Value::Integer(request_id),
                ],
            )
            .await?;
        Ok(updated > 0)
    }

    async fn get_request_info(&self, request_id: i64) -> Result<Option<RequestDetails>, StorageError> {
        let sql = format!("{} WHERE r.id = ?1", DETAILS_SELECT);
        Ok(self
            .fetch_details(&sql, vec![Value::Integer(request_id)])
            .await?
            .into_iter()
            .next())
    }

    async fn get_active_requests(&self, user_id: i64) -> Result<Vec<Request>, StorageError> {
        let sql = format!(
            "{} WHERE user_id = ?1 AND status = 'Pending' ORDER BY request_number",
            REQUEST_SELECT
        );
        let mut rows = self.client.connection().query(&sql, params![user_id]).await?;
        let mut result = Vec::new();
        while let Some(row) = rows.next().await? {
            result.push(request_from_row(&row)?);
        }
        Ok(result)
    }

    async fn get_all_active_requests(&self) -> Result<Vec<RequestDetails>, StorageError> {
        let sql = format!("{} WHERE r.status = 'Pending' ORDER BY r.id", DETAILS_SELECT);
        self.fetch_details(&sql, Vec::new()).await
    }

    async fn get_total_requests(&self) -> Result<u64, StorageError> {
        self.count("SELECT COUNT(*) FROM requests").await
    }

    async fn get_approved_requests(&self) -> Result<u64, StorageError> {
        self.count("SELECT COUNT(*) FROM requests WHERE status = 'Approved'").await
    }

    async fn get_rejected_requests(&self) -> Result<u64, StorageError> {
        self.count("SELECT COUNT(*) FROM requests WHERE status = 'Rejected'").await
    }

    async fn get_total_amount_by_currency(&self) -> Result<BTreeMap<String, u128>, StorageError> {
        // Amounts are unbounded digit strings, so they are summed here rather than in SQL.
        let mut rows = self
            .client
            .connection()
            .query("SELECT currency, amount FROM requests", ())
            .await?;

        let mut totals = BTreeMap::new();
        while let Some(row) = rows.next().await? {
            let currency = row.get::<String>(0)?;
            let amount = parse_amount(row.get::<String>(1)?)?;
            let total = totals.entry(currency).or_insert(0u128);
            *total = total.saturating_add(amount.value());
        }
        Ok(totals)
    }

    async fn get_ledger(&self) -> Result<Vec<RequestDetails>, StorageError> {
        let sql = format!("{} ORDER BY r.id", DETAILS_SELECT);
        self.fetch_details(&sql, Vec::new()).await
    }
}

fn opt_text(value: Option<&str>) -> Value {
    match value {
        Some(text) => Value::Text(text.to_string()),
        None => Value::Null,
    }
}

fn opt_text_at(row: &Row, idx: i32) -> Result<Option<String>, StorageError> {
    match row.get_value(idx)? {
        Value::Text(text) => Ok(Some(text)),
        Value::Null => Ok(None),
        other => Err(StorageError::Corrupt(format!("expected text at column {}, got {:?}", idx, other))),
    }
}

fn parse_amount(raw: String) -> Result<Amount, StorageError> {
    Amount::parse(&raw).ok_or_else(|| StorageError::Corrupt(format!("invalid amount {:?}", raw)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StorageError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)))
        .map_err(|e| StorageError::Corrupt(format!("invalid timestamp {:?}: {}", raw, e)))
}

fn request_from_row(row: &Row) -> Result<Request, StorageError> {
    let status = row.get::<String>(7)?;
    Ok(Request {
        id: row.get::<i64>(0)?,
        user_id: row.get::<i64>(1)?,
        request_number: row.get::<i64>(2)?,
        currency: row.get::<String>(3)?,
        amount: parse_amount(row.get::<String>(4)?)?,
        comment: row.get::<String>(5)?,
        file_path: opt_text_at(row, 6)?,
        status: status.parse::<RequestStatus>().map_err(StorageError::Corrupt)?,
        admin_comment: opt_text_at(row, 8)?,
        created_at: parse_timestamp(&row.get::<String>(9)?)?,
    })
}

fn details_from_row(row: &Row) -> Result<RequestDetails, StorageError> {
    let request = request_from_row(row)?;
    let owner = User {
        user_id: request.user_id,
        name: row.get::<String>(10)?,
        phone: row.get::<String>(11)?,
        city: row.get::<String>(12)?,
    };
    Ok(RequestDetails { request, owner })
}

fn is_unique_violation(error: &libsql::Error) -> bool {
    error.to_string().contains("UNIQUE constraint failed")
}

#[cfg(test)]
pub(crate) async fn test_repository() -> TursoRepository {
    let client = TursoClient::open_in_memory().await.expect("Failed to open in-memory database");
    let repository = TursoRepository::new(client);
    repository.migrate().await.expect("Failed to apply schema");
    repository
}
