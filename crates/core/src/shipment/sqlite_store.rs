//! SQLite-backed shipment store implementation.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;

use super::{
    Address, ContactUpdate, NewParcel, Parcel, ParcelFilter, ParcelInfo, ParcelStatus, Recipient,
    RecipientInfo, ShipmentError, ShipmentStore,
};

const RECIPIENT_COLUMNS: &str = "id, created_by, first_name, last_name, email, phone_number, street, city, state, zip_code, country, created_at, updated_at";

const PARCEL_COLUMNS: &str = "id, user_id, recipient_id, length, width, height, weight, cost, status, tracking_number, destination_changes, created_at, updated_at";

/// SQLite-backed store for recipients and parcels.
pub struct SqliteShipmentStore {
    conn: Mutex<Connection>,
}

impl SqliteShipmentStore {
    /// Create a new SQLite shipment store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, ShipmentError> {
        let conn = Connection::open(path).map_err(|e| ShipmentError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite shipment store (useful for testing).
    pub fn in_memory() -> Result<Self, ShipmentError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ShipmentError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ShipmentError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS recipients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_by INTEGER NOT NULL,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone_number TEXT NOT NULL,
                street TEXT NOT NULL,
                city TEXT NOT NULL,
                state TEXT NOT NULL,
                zip_code TEXT NOT NULL,
                country TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS parcels (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                recipient_id INTEGER NOT NULL REFERENCES recipients(id),
                length REAL NOT NULL,
                width REAL NOT NULL,
                height REAL NOT NULL,
                weight REAL NOT NULL,
                cost TEXT NOT NULL,
                status TEXT NOT NULL,
                tracking_number TEXT NOT NULL UNIQUE,
                destination_changes INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recipients_created_by ON recipients(created_by);
            CREATE INDEX IF NOT EXISTS idx_parcels_user_id ON parcels(user_id);
            CREATE INDEX IF NOT EXISTS idx_parcels_status ON parcels(status);
            CREATE INDEX IF NOT EXISTS idx_parcels_created_at ON parcels(created_at);
            "#,
        )
        .map_err(|e| ShipmentError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ShipmentError> {
        self.conn
            .lock()
            .map_err(|_| ShipmentError::Database("connection mutex poisoned".to_string()))
    }

    fn build_where_clause(filter: &ParcelFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?");
            params.push(Box::new(user_id));
        }

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str()));
        }

        if let Some(ref tracking_number) = filter.tracking_number {
            conditions.push("tracking_number = ?");
            params.push(Box::new(tracking_number.clone()));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_recipient(row: &rusqlite::Row) -> rusqlite::Result<Recipient> {
        let created_at: String = row.get(11)?;
        let updated_at: String = row.get(12)?;

        Ok(Recipient {
            id: row.get(0)?,
            created_by: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            phone_number: row.get(5)?,
            address: Address {
                street: row.get(6)?,
                city: row.get(7)?,
                state: row.get(8)?,
                zip_code: row.get(9)?,
                country: row.get(10)?,
            },
            created_at: Self::parse_timestamp(&created_at),
            updated_at: Self::parse_timestamp(&updated_at),
        })
    }

    fn row_to_parcel(row: &rusqlite::Row) -> rusqlite::Result<Parcel> {
        let cost_str: String = row.get(7)?;
        let status_str: String = row.get(8)?;
        let created_at: String = row.get(11)?;
        let updated_at: String = row.get(12)?;

        let cost = Decimal::from_str(&cost_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(e)))?;
        let status = ParcelStatus::from_str(&status_str)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(e)))?;

        Ok(Parcel {
            id: row.get(0)?,
            user_id: row.get(1)?,
            recipient_id: row.get(2)?,
            info: ParcelInfo {
                length: row.get(3)?,
                width: row.get(4)?,
                height: row.get(5)?,
                weight: row.get(6)?,
            },
            cost,
            status,
            tracking_number: row.get(9)?,
            destination_changes: row.get(10)?,
            created_at: Self::parse_timestamp(&created_at),
            updated_at: Self::parse_timestamp(&updated_at),
        })
    }

    fn fetch_recipient(conn: &Connection, id: i64) -> Result<Option<Recipient>, ShipmentError> {
        conn.query_row(
            &format!("SELECT {} FROM recipients WHERE id = ?", RECIPIENT_COLUMNS),
            params![id],
            Self::row_to_recipient,
        )
        .optional()
        .map_err(|e| ShipmentError::Database(e.to_string()))
    }

    /// Owner changes are refused once a parcel is delivered.
    fn ensure_mutable(parcel: &Parcel) -> Result<(), ShipmentError> {
        if parcel.status.is_mutable_by_owner() {
            Ok(())
        } else {
            Err(ShipmentError::ParcelFinal {
                id: parcel.id,
                status: parcel.status,
            })
        }
    }

    fn fetch_parcel(conn: &Connection, id: i64) -> Result<Option<Parcel>, ShipmentError> {
        conn.query_row(
            &format!("SELECT {} FROM parcels WHERE id = ?", PARCEL_COLUMNS),
            params![id],
            Self::row_to_parcel,
        )
        .optional()
        .map_err(|e| ShipmentError::Database(e.to_string()))
    }
}

impl ShipmentStore for SqliteShipmentStore {
    fn create_recipient(
        &self,
        created_by: i64,
        info: &RecipientInfo,
    ) -> Result<Recipient, ShipmentError> {
        let conn = self.lock()?;
        let now = Utc::now();

        conn.execute(
            "INSERT INTO recipients (created_by, first_name, last_name, email, phone_number, street, city, state, zip_code, country, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                created_by,
                info.first_name.trim(),
                info.last_name.trim(),
                info.email.trim(),
                info.phone_number.trim(),
                info.address.street.trim(),
                info.address.city.trim(),
                info.address.state.trim(),
                info.address.zip_code.trim(),
                info.address.country.trim(),
                now.to_rfc3339_opts(SecondsFormat::Nanos, true),
                now.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )
        .map_err(|e| ShipmentError::Database(e.to_string()))?;

        let id = conn.last_insert_rowid();
        Self::fetch_recipient(&conn, id)?.ok_or(ShipmentError::RecipientNotFound(id))
    }

    fn get_recipient(&self, id: i64) -> Result<Option<Recipient>, ShipmentError> {
        let conn = self.lock()?;
        Self::fetch_recipient(&conn, id)
    }

    fn update_recipient_contact(
        &self,
        id: i64,
        update: &ContactUpdate,
    ) -> Result<Recipient, ShipmentError> {
        let conn = self.lock()?;
        let now = Utc::now();

        let changed = conn
            .execute(
                "UPDATE recipients SET first_name = COALESCE(?, first_name), last_name = COALESCE(?, last_name), email = COALESCE(?, email), phone_number = COALESCE(?, phone_number), updated_at = ? WHERE id = ?",
                params![
                    update.first_name.as_deref().map(str::trim),
                    update.last_name.as_deref().map(str::trim),
                    update.email.as_deref().map(str::trim),
                    update.phone_number.as_deref().map(str::trim),
                    now.to_rfc3339_opts(SecondsFormat::Nanos, true),
                    id,
                ],
            )
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(ShipmentError::RecipientNotFound(id));
        }

        Self::fetch_recipient(&conn, id)?.ok_or(ShipmentError::RecipientNotFound(id))
    }

    fn create_parcel(&self, parcel: NewParcel) -> Result<Parcel, ShipmentError> {
        let conn = self.lock()?;
        let now = Utc::now();
        let tracking_number = uuid::Uuid::new_v4().simple().to_string();
        let status = ParcelStatus::Pending;

        conn.execute(
            "INSERT INTO parcels (user_id, recipient_id, length, width, height, weight, cost, status, tracking_number, destination_changes, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)",
            params![
                parcel.user_id,
                parcel.recipient_id,
                parcel.info.length,
                parcel.info.width,
                parcel.info.height,
                parcel.info.weight,
                parcel.cost.to_string(),
                status.as_str(),
                tracking_number,
                now.to_rfc3339_opts(SecondsFormat::Nanos, true),
                now.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )
        .map_err(|e| ShipmentError::Database(e.to_string()))?;

        Ok(Parcel {
            id: conn.last_insert_rowid(),
            user_id: parcel.user_id,
            recipient_id: parcel.recipient_id,
            info: parcel.info,
            cost: parcel.cost,
            status,
            tracking_number,
            destination_changes: 0,
            created_at: now,
            updated_at: now,
        })
    }

    fn get_parcel(&self, id: i64) -> Result<Option<Parcel>, ShipmentError> {
        let conn = self.lock()?;
        Self::fetch_parcel(&conn, id)
    }

    fn list_parcels(&self, filter: &ParcelFilter) -> Result<Vec<Parcel>, ShipmentError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM parcels {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            PARCEL_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_parcel)
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        let mut parcels = Vec::new();
        for row_result in rows {
            parcels.push(row_result.map_err(|e| ShipmentError::Database(e.to_string()))?);
        }

        Ok(parcels)
    }

    fn count_parcels(&self, filter: &ParcelFilter) -> Result<i64, ShipmentError> {
        let conn = self.lock()?;

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM parcels {}", where_clause);
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| ShipmentError::Database(e.to_string()))
    }

    fn update_status(&self, id: i64, status: ParcelStatus) -> Result<Parcel, ShipmentError> {
        let conn = self.lock()?;
        let now = Utc::now();

        let changed = conn
            .execute(
                "UPDATE parcels SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), now.to_rfc3339_opts(SecondsFormat::Nanos, true), id],
            )
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(ShipmentError::ParcelNotFound(id));
        }

        Self::fetch_parcel(&conn, id)?.ok_or(ShipmentError::ParcelNotFound(id))
    }

    fn reroute(
        &self,
        parcel_id: i64,
        address: &Address,
        cost: Decimal,
    ) -> Result<(Parcel, Recipient), ShipmentError> {
        let mut conn = self.lock()?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true);

        let tx = conn
            .transaction()
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        let parcel = Self::fetch_parcel(&tx, parcel_id)?
            .ok_or(ShipmentError::ParcelNotFound(parcel_id))?;
        Self::ensure_mutable(&parcel)?;

        let changed = tx
            .execute(
                "UPDATE recipients SET street = ?, city = ?, state = ?, zip_code = ?, country = ?, updated_at = ? WHERE id = ?",
                params![
                    address.street.trim(),
                    address.city.trim(),
                    address.state.trim(),
                    address.zip_code.trim(),
                    address.country.trim(),
                    now,
                    parcel.recipient_id,
                ],
            )
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(ShipmentError::RecipientNotFound(parcel.recipient_id));
        }

        tx.execute(
            "UPDATE parcels SET cost = ?, destination_changes = destination_changes + 1, updated_at = ? WHERE id = ?",
            params![cost.to_string(), now, parcel_id],
        )
        .map_err(|e| ShipmentError::Database(e.to_string()))?;

        let parcel = Self::fetch_parcel(&tx, parcel_id)?
            .ok_or(ShipmentError::ParcelNotFound(parcel_id))?;
        let recipient = Self::fetch_recipient(&tx, parcel.recipient_id)?
            .ok_or(ShipmentError::RecipientNotFound(parcel.recipient_id))?;

        tx.commit()
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        Ok((parcel, recipient))
    }

    fn delete_parcel(&self, id: i64) -> Result<Parcel, ShipmentError> {
        let conn = self.lock()?;

        let parcel = Self::fetch_parcel(&conn, id)?.ok_or(ShipmentError::ParcelNotFound(id))?;
        Self::ensure_mutable(&parcel)?;

        conn.execute("DELETE FROM parcels WHERE id = ?", params![id])
            .map_err(|e| ShipmentError::Database(e.to_string()))?;

        Ok(parcel)
    }
}
