use super::{PaymentEvent, PaymentRecord, PaymentStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database, Row, Value, params};
use tracing::{debug, error, info, warn};

const SELECT_COLUMNS: &str = "id, booking_id, external_order_id, external_payment_id, \
     external_signature, amount, platform_fee, total_amount, payment_status, payment_date, \
     payment_method, created_at, updated_at";

/// Payment records backed by libSQL. Records are only ever inserted or moved out
/// of Pending; nothing is deleted.
pub struct PaymentStorage {
    // Keeps the database alive for as long as the connection is in use.
    _database: Database,
    conn: Connection,
}

impl PaymentStorage {
    /// Opens (or creates) the payment database at `db_path`. A database that cannot
    /// be opened is an error; payments are never kept only in memory by accident.
    pub async fn new(db_path: &str) -> Result<Self> {
        let storage = Self::open(db_path).await.map_err(|e| {
            error!("Payment database initialization failed for {}: {}", db_path, e);
            e
        })?;

        info!("Payment database initialized successfully: {}", db_path);
        Ok(storage)
    }

    /// A private, non-persistent store. Contents are lost when it is dropped.
    pub async fn in_memory() -> Result<Self> {
        Self::new(":memory:").await
    }

    async fn open(db_path: &str) -> Result<Self> {
        let database = Builder::new_local(db_path).build().await?;
        let conn = database.connect()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS payments (
                id TEXT PRIMARY KEY,
                booking_id TEXT NOT NULL,
                external_order_id TEXT NOT NULL UNIQUE,
                external_payment_id TEXT,
                external_signature TEXT,
                amount REAL NOT NULL,
                platform_fee REAL NOT NULL DEFAULT 10,
                total_amount REAL NOT NULL,
                payment_status TEXT NOT NULL DEFAULT 'Pending'
                    CHECK (payment_status IN ('Pending', 'Paid', 'Failed')),
                payment_date TEXT NOT NULL,
                payment_method TEXT NOT NULL DEFAULT 'Razorpay'
                    CHECK (payment_method IN ('Razorpay', 'Other')),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            (),
        )
        .await?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_payments_booking_id ON payments (booking_id)",
            (),
        )
        .await?;

        Ok(Self {
            _database: database,
            conn,
        })
    }

    pub async fn create(&self, record: PaymentRecord) -> Result<PaymentRecord> {
        if self.find_by_order_id(&record.external_order_id).await?.is_some() {
            return Err(duplicate_order(&record.external_order_id));
        }

        insert_row(&self.conn, &record).await?;

        debug!(
            "Created payment {} for booking {} (order {})",
            record.id, record.booking_id, record.external_order_id
        );
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Result<Option<PaymentRecord>> {
        query_one(&self.conn, "id", id).await
    }

    pub async fn find_by_order_id(&self, order_id: &str) -> Result<Option<PaymentRecord>> {
        query_one(&self.conn, "external_order_id", order_id).await
    }

    /// All payment attempts for a booking, oldest first.
    pub async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<PaymentRecord>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM payments WHERE booking_id = ? ORDER BY rowid ASC"
                ),
                [booking_id],
            )
            .await?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(record_from_row(&row)?);
        }

        debug!(
            "Retrieved {} payments for booking: {}",
            records.len(),
            booking_id
        );
        Ok(records)
    }

    /// Records a gateway confirmation. Replaying the same confirmation returns the
    /// stored record unchanged.
    pub async fn mark_paid(
        &self,
        order_id: &str,
        payment_id: impl Into<String>,
        signature: impl Into<String>,
    ) -> Result<PaymentRecord> {
        let event = PaymentEvent::Confirmed {
            payment_id: payment_id.into(),
            signature: signature.into(),
        };
        self.transition(order_id, event).await
    }

    pub async fn mark_failed(&self, order_id: &str) -> Result<PaymentRecord> {
        self.transition(order_id, PaymentEvent::Declined).await
    }

    async fn transition(&self, order_id: &str, event: PaymentEvent) -> Result<PaymentRecord> {
        transition_in_db(&self.conn, order_id, event).await
    }
}

fn is_replay(record: &PaymentRecord, event: &PaymentEvent) -> bool {
    match (record.payment_status, event) {
        (PaymentStatus::Paid, PaymentEvent::Confirmed { payment_id, .. }) => {
            record.external_payment_id.as_deref() == Some(payment_id.as_str())
        }
        (PaymentStatus::Failed, PaymentEvent::Declined) => true,
        _ => false,
    }
}

async fn transition_in_db(
    conn: &Connection,
    order_id: &str,
    event: PaymentEvent,
) -> Result<PaymentRecord> {
    let not_found = || Error::PaymentNotFound {
        order_id: order_id.to_string(),
    };

    let mut record = query_one(conn, "external_order_id", order_id)
        .await?
        .ok_or_else(not_found)?;

    if is_replay(&record, &event) {
        debug!("Ignoring repeated gateway outcome for order {}", order_id);
        return Ok(record);
    }

    record.apply(event.clone())?;

    // Guarded on Pending so two racing confirmations cannot both land.
    let updated = conn
        .execute(
            "UPDATE payments SET payment_status = ?, external_payment_id = ?, \
             external_signature = ?, updated_at = ? \
             WHERE external_order_id = ? AND payment_status = 'Pending'",
            params![
                record.payment_status.as_str(),
                optional_text(&record.external_payment_id),
                optional_text(&record.external_signature),
                record.updated_at.to_rfc3339(),
                order_id
            ],
        )
        .await?;

    if updated == 0 {
        let current = query_one(conn, "external_order_id", order_id)
            .await?
            .ok_or_else(not_found)?;
        if is_replay(&current, &event) {
            return Ok(current);
        }
        warn!(
            "Payment for order {} changed concurrently to {}",
            order_id, current.payment_status
        );
        return Err(Error::InvalidTransition {
            current: current.payment_status.to_string(),
            requested: record.payment_status.to_string(),
        });
    }

    Ok(record)
}

async fn insert_row(conn: &Connection, record: &PaymentRecord) -> Result<()> {
    let inserted = conn
        .execute(
            &format!(
                "INSERT INTO payments ({SELECT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            ),
            params![
                record.id.as_str(),
                record.booking_id.as_str(),
                record.external_order_id.as_str(),
                optional_text(&record.external_payment_id),
                optional_text(&record.external_signature),
                record.amount,
                record.platform_fee,
                record.total_amount,
                record.payment_status.as_str(),
                record.payment_date.to_rfc3339(),
                record.payment_method.as_str(),
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339()
            ],
        )
        .await;

    match inserted {
        Ok(_) => Ok(()),
        // A concurrent create may win the race between lookup and insert.
        Err(e) if is_duplicate_order(&e) => Err(duplicate_order(&record.external_order_id)),
        Err(e) => Err(e.into()),
    }
}

fn duplicate_order(order_id: &str) -> Error {
    Error::payment(format!("a payment for order {order_id} already exists"))
}

fn is_duplicate_order(err: &libsql::Error) -> bool {
    const SQLITE_CONSTRAINT: i32 = 19;

    match err {
        libsql::Error::SqliteFailure(code, message) => {
            code & 0xff == SQLITE_CONSTRAINT && message.contains("external_order_id")
        }
        _ => false,
    }
}

async fn query_one(conn: &Connection, column: &str, value: &str) -> Result<Option<PaymentRecord>> {
    let mut rows = conn
        .query(
            &format!("SELECT {SELECT_COLUMNS} FROM payments WHERE {column} = ? LIMIT 1"),
            [value],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(record_from_row(&row)?)),
        None => Ok(None),
    }
}

fn record_from_row(row: &Row) -> Result<PaymentRecord> {
    Ok(PaymentRecord {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        external_order_id: row.get(2)?,
        external_payment_id: nullable_text(row, 3)?,
        external_signature: nullable_text(row, 4)?,
        amount: row.get(5)?,
        platform_fee: row.get(6)?,
        total_amount: row.get(7)?,
        payment_status: row.get::<String>(8)?.parse()?,
        payment_date: parse_timestamp(&row.get::<String>(9)?)?,
        payment_method: row.get::<String>(10)?.parse()?,
        created_at: parse_timestamp(&row.get::<String>(11)?)?,
        updated_at: parse_timestamp(&row.get::<String>(12)?)?,
    })
}

fn optional_text(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

fn nullable_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row.get_value(idx)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        other => Err(Error::internal(format!(
            "Unexpected value in text column {idx}: {other:?}"
        ))),
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::internal(format!("Failed to parse timestamp: {e}")))?
        .with_timezone(&Utc))
}
