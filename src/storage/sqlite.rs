use super::{damage_type_description, part_description, stale_transition, Storage};
use crate::constants::DEFAULT_PROPERTY_LOCATION;
use crate::domain::{
    CartPart, DamageDetail, DamageRecord, DamageType, Inspection, InspectionStatus, Property,
};
use crate::error::{InspectionError, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Applied in order, each at most once, recorded in `schema_migrations`.
const MIGRATIONS: [(&str, &str); 2] = [
    (
        "001_create_inspections",
        include_str!("../../migrations/001_create_inspections.sql"),
    ),
    (
        "002_add_token_expiry",
        include_str!("../../migrations/002_add_token_expiry.sql"),
    ),
];

const INSPECTION_COLUMNS: &str = "id, cart_number, property_id, guest_name, guest_email, guest_phone, \
    guest_room, inspector_name, inspection_date, front_damage, back_damage, left_damage, \
    right_damage, interior_damage, additional_notes, inspector_signature, \
    inspector_signature_url, guest_signature, guest_signature_url, guest_confirms_damages, \
    guest_accepts_terms, guest_comments, status, access_token, created_at, updated_at, \
    sent_at, signed_at, token_expires_at";

impl ToSql for InspectionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for InspectionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: InspectionError| FromSqlError::Other(Box::new(e)))
    }
}

fn inspection_from_row(row: &Row<'_>) -> rusqlite::Result<Inspection> {
    Ok(Inspection {
        id: Some(row.get(0)?),
        cart_number: row.get(1)?,
        property_id: row.get(2)?,
        guest_name: row.get(3)?,
        guest_email: row.get(4)?,
        guest_phone: row.get(5)?,
        guest_room: row.get(6)?,
        inspector_name: row.get(7)?,
        inspection_date: row.get(8)?,
        front_damage: row.get(9)?,
        back_damage: row.get(10)?,
        left_damage: row.get(11)?,
        right_damage: row.get(12)?,
        interior_damage: row.get(13)?,
        additional_notes: row.get(14)?,
        inspector_signature: row.get(15)?,
        inspector_signature_url: row.get(16)?,
        guest_signature: row.get(17)?,
        guest_signature_url: row.get(18)?,
        guest_confirms_damages: row.get(19)?,
        guest_accepts_terms: row.get(20)?,
        guest_comments: row.get(21)?,
        status: row.get(22)?,
        access_token: row.get(23)?,
        created_at: row.get(24)?,
        updated_at: row.get(25)?,
        sent_at: row.get(26)?,
        signed_at: row.get(27)?,
        token_expires_at: row.get(28)?,
    })
}

fn property_from_row(row: &Row<'_>) -> rusqlite::Result<Property> {
    Ok(Property {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        location: row.get(2)?,
        active: row.get(3)?,
    })
}

fn cart_part_from_row(row: &Row<'_>) -> rusqlite::Result<CartPart> {
    Ok(CartPart {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        active: row.get(4)?,
    })
}

fn damage_type_from_row(row: &Row<'_>) -> rusqlite::Result<DamageType> {
    Ok(DamageType {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        severity_level: row.get(3)?,
        active: row.get(4)?,
    })
}

/// SQLite-backed storage. One connection, serialized behind a mutex.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Opening inspection database at {}", db_path.display());
        let conn = Connection::open(db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let storage = Self {
            conn: Mutex::new(conn),
        };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<()> {
        debug!("Running database migrations...");
        let mut conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (\
                version TEXT PRIMARY KEY, \
                applied_at TEXT NOT NULL)",
        )?;
        for (version, sql) in MIGRATIONS {
            let applied: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
                params![version],
                |row| row.get(0),
            )?;
            if applied {
                continue;
            }
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, Utc::now()],
            )?;
            tx.commit()?;
            info!("Applied migration {}", version);
        }
        debug!("Database migrations completed successfully");
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| InspectionError::Storage {
            message: "database connection lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_inspection(
        &self,
        inspection: &mut Inspection,
        damages: &mut [DamageRecord],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO inspections (cart_number, property_id, guest_name, guest_email, \
             guest_phone, guest_room, inspector_name, inspection_date, front_damage, back_damage, \
             left_damage, right_damage, interior_damage, additional_notes, inspector_signature, \
             inspector_signature_url, guest_signature, guest_signature_url, \
             guest_confirms_damages, guest_accepts_terms, guest_comments, status, access_token, \
             created_at, updated_at, sent_at, signed_at, token_expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
             ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28)",
            params![
                inspection.cart_number,
                inspection.property_id,
                inspection.guest_name,
                inspection.guest_email,
                inspection.guest_phone,
                inspection.guest_room,
                inspection.inspector_name,
                inspection.inspection_date,
                inspection.front_damage,
                inspection.back_damage,
                inspection.left_damage,
                inspection.right_damage,
                inspection.interior_damage,
                inspection.additional_notes,
                inspection.inspector_signature,
                inspection.inspector_signature_url,
                inspection.guest_signature,
                inspection.guest_signature_url,
                inspection.guest_confirms_damages,
                inspection.guest_accepts_terms,
                inspection.guest_comments,
                inspection.status,
                inspection.access_token,
                inspection.created_at,
                inspection.updated_at,
                inspection.sent_at,
                inspection.signed_at,
                inspection.token_expires_at,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let mut record_ids = Vec::with_capacity(damages.len());
        for record in damages.iter() {
            tx.execute(
                "INSERT INTO damage_records (inspection_id, part_id, damage_type_id, description, \
                 quantity, photo_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id,
                    record.part_id,
                    record.damage_type_id,
                    record.description,
                    record.quantity,
                    record.photo_url,
                    record.created_at,
                ],
            )?;
            record_ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;

        inspection.id = Some(id);
        for (record, record_id) in damages.iter_mut().zip(record_ids) {
            record.id = Some(record_id);
            record.inspection_id = id;
        }
        debug!(
            "Created inspection for cart {} with id {} and {} damage records",
            inspection.cart_number,
            id,
            damages.len()
        );
        Ok(())
    }

    async fn transition_inspection(
        &self,
        inspection: &Inspection,
        from: InspectionStatus,
    ) -> Result<()> {
        let id = inspection.require_id()?;
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE inspections SET inspector_signature = ?1, inspector_signature_url = ?2, \
             guest_signature = ?3, guest_signature_url = ?4, guest_confirms_damages = ?5, \
             guest_accepts_terms = ?6, guest_comments = ?7, status = ?8, updated_at = ?9, \
             sent_at = ?10, signed_at = ?11, token_expires_at = ?12 \
             WHERE id = ?13 AND status = ?14",
            params![
                inspection.inspector_signature,
                inspection.inspector_signature_url,
                inspection.guest_signature,
                inspection.guest_signature_url,
                inspection.guest_confirms_damages,
                inspection.guest_accepts_terms,
                inspection.guest_comments,
                inspection.status,
                inspection.updated_at,
                inspection.sent_at,
                inspection.signed_at,
                inspection.token_expires_at,
                id,
                from,
            ],
        )?;
        if changed == 0 {
            let current: Option<InspectionStatus> = conn
                .query_row(
                    "SELECT status FROM inspections WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            return Err(match current {
                Some(current) => stale_transition(id, current, from),
                None => InspectionError::NotFound(format!("Inspection {id}")),
            });
        }
        debug!("Inspection {} moved from {} to {}", id, from, inspection.status);
        Ok(())
    }

    async fn get_inspection(&self, id: i64) -> Result<Option<Inspection>> {
        let conn = self.conn()?;
        let inspection = conn
            .query_row(
                &format!("SELECT {INSPECTION_COLUMNS} FROM inspections WHERE id = ?1"),
                params![id],
                inspection_from_row,
            )
            .optional()?;
        Ok(inspection)
    }

    async fn get_inspection_by_token(&self, token: &str) -> Result<Option<Inspection>> {
        let conn = self.conn()?;
        let inspection = conn
            .query_row(
                &format!("SELECT {INSPECTION_COLUMNS} FROM inspections WHERE access_token = ?1"),
                params![token],
                inspection_from_row,
            )
            .optional()?;
        Ok(inspection)
    }

    async fn list_inspections(&self, status: Option<InspectionStatus>) -> Result<Vec<Inspection>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {INSPECTION_COLUMNS} FROM inspections \
             WHERE (?1 IS NULL OR status = ?1) ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map(params![status], inspection_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn get_or_create_property(&self, name: &str) -> Result<Property> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO properties (name, location, active) VALUES (?1, ?2, 1)",
            params![name, DEFAULT_PROPERTY_LOCATION],
        )?;
        let property = conn.query_row(
            "SELECT id, name, location, active FROM properties WHERE name = ?1",
            params![name],
            property_from_row,
        )?;
        Ok(property)
    }

    async fn get_property(&self, id: i64) -> Result<Option<Property>> {
        let conn = self.conn()?;
        let property = conn
            .query_row(
                "SELECT id, name, location, active FROM properties WHERE id = ?1",
                params![id],
                property_from_row,
            )
            .optional()?;
        Ok(property)
    }

    async fn list_properties(&self) -> Result<Vec<Property>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, location, active FROM properties WHERE active = 1 ORDER BY name",
        )?;
        let rows = stmt.query_map([], property_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn get_or_create_cart_part(&self, name: &str, category: &str) -> Result<CartPart> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO cart_parts (name, description, category, active) \
             VALUES (?1, ?2, ?3, 1)",
            params![name, part_description(name), category],
        )?;
        let part = conn.query_row(
            "SELECT id, name, description, category, active FROM cart_parts WHERE name = ?1",
            params![name],
            cart_part_from_row,
        )?;
        Ok(part)
    }

    async fn list_cart_parts(&self) -> Result<Vec<CartPart>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, category, active FROM cart_parts \
             WHERE active = 1 ORDER BY name",
        )?;
        let rows = stmt.query_map([], cart_part_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn get_or_create_damage_type(&self, name: &str, severity_level: i64) -> Result<DamageType> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO damage_types (name, description, severity_level, active) \
             VALUES (?1, ?2, ?3, 1)",
            params![name, damage_type_description(name), severity_level],
        )?;
        let damage_type = conn.query_row(
            "SELECT id, name, description, severity_level, active FROM damage_types WHERE name = ?1",
            params![name],
            damage_type_from_row,
        )?;
        Ok(damage_type)
    }

    async fn list_damage_types(&self) -> Result<Vec<DamageType>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, severity_level, active FROM damage_types \
             WHERE active = 1 ORDER BY name",
        )?;
        let rows = stmt.query_map([], damage_type_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn list_damage_details(&self, inspection_id: i64) -> Result<Vec<DamageDetail>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT d.id, t.name, p.name, p.category, d.description, d.quantity, d.photo_url \
             FROM damage_records d \
             JOIN cart_parts p ON p.id = d.part_id \
             JOIN damage_types t ON t.id = d.damage_type_id \
             WHERE d.inspection_id = ?1 ORDER BY d.id",
        )?;
        let rows = stmt.query_map(params![inspection_id], |row| {
            Ok(DamageDetail {
                id: row.get(0)?,
                damage_type: row.get(1)?,
                part: row.get(2)?,
                location: row.get(3)?,
                description: row.get(4)?,
                quantity: row.get(5)?,
                photo_url: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use tempfile::tempdir;

    fn sample_inspection(token: &str) -> Inspection {
        let now = Utc::now();
        Inspection {
            id: None,
            cart_number: "42".to_string(),
            property_id: None,
            guest_name: "Sam Ortiz".to_string(),
            guest_email: "sam@example.com".to_string(),
            guest_phone: String::new(),
            guest_room: "B12".to_string(),
            inspector_name: "Lee".to_string(),
            inspection_date: NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            front_damage: "Cracked bumper".to_string(),
            back_damage: String::new(),
            left_damage: String::new(),
            right_damage: String::new(),
            interior_damage: String::new(),
            additional_notes: String::new(),
            inspector_signature: None,
            inspector_signature_url: None,
            guest_signature: None,
            guest_signature_url: None,
            guest_confirms_damages: false,
            guest_accepts_terms: false,
            guest_comments: String::new(),
            status: InspectionStatus::Pending,
            access_token: token.to_string(),
            created_at: now,
            updated_at: now,
            sent_at: None,
            signed_at: None,
            token_expires_at: None,
        }
    }

    fn record(part: &CartPart, damage_type: &DamageType) -> DamageRecord {
        DamageRecord {
            id: None,
            inspection_id: 0,
            part_id: part.id.unwrap(),
            damage_type_id: damage_type.id.unwrap(),
            description: "Two long scratches".to_string(),
            quantity: 2,
            photo_url: Some("/media/inspections/images/ab/abcd.png".to_string()),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn inspection_round_trips_through_file_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data").join("inspections.db");
        let storage = SqliteStorage::open(&path).unwrap();

        let mut inspection = sample_inspection("tok-1");
        storage.create_inspection(&mut inspection, &mut []).await.unwrap();
        let id = inspection.id.unwrap();

        let loaded = storage.get_inspection_by_token("tok-1").await.unwrap().unwrap();
        assert_eq!(loaded.id, Some(id));
        assert_eq!(loaded.front_damage, "Cracked bumper");
        assert_eq!(loaded.status, InspectionStatus::Pending);
        assert_eq!(loaded.inspection_date, inspection.inspection_date);

        let mut sent = loaded.clone();
        sent.status = InspectionStatus::Sent;
        sent.sent_at = Some(Utc::now());
        sent.token_expires_at = Some(Utc::now() + chrono::Duration::days(7));
        storage
            .transition_inspection(&sent, InspectionStatus::Pending)
            .await
            .unwrap();
        drop(storage);

        // Reopening re-runs migrations against an existing schema.
        let reopened = SqliteStorage::open(&path).unwrap();
        let reloaded = reopened.get_inspection(id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, InspectionStatus::Sent);
        assert!(reloaded.sent_at.is_some());
        assert_eq!(
            reloaded.token_expires_at.map(|t| t.timestamp()),
            sent.token_expires_at.map(|t| t.timestamp())
        );
    }

    #[tokio::test]
    async fn transition_refuses_a_row_that_already_moved() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let mut inspection = sample_inspection("tok-3");
        inspection.status = InspectionStatus::Sent;
        storage.create_inspection(&mut inspection, &mut []).await.unwrap();

        let mut signed = inspection.clone();
        signed.status = InspectionStatus::Signed;
        signed.signed_at = Some(Utc::now());
        storage
            .transition_inspection(&signed, InspectionStatus::Sent)
            .await
            .unwrap();

        let err = storage
            .transition_inspection(&signed, InspectionStatus::Sent)
            .await
            .unwrap_err();
        assert!(matches!(err, InspectionError::InvalidState(_)));

        let mut missing = signed.clone();
        missing.id = Some(999);
        assert!(matches!(
            storage
                .transition_inspection(&missing, InspectionStatus::Sent)
                .await,
            Err(InspectionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_access_token_is_rejected() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage
            .create_inspection(&mut sample_inspection("same"), &mut [])
            .await
            .unwrap();
        assert!(storage
            .create_inspection(&mut sample_inspection("same"), &mut [])
            .await
            .is_err());
    }

    #[tokio::test]
    async fn failed_damage_insert_rolls_back_the_inspection() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let part = storage.get_or_create_cart_part("Roof", "Exterior").await.unwrap();
        let damage_type = storage.get_or_create_damage_type("Scratches", 1).await.unwrap();

        let mut dangling = record(&part, &damage_type);
        dangling.part_id = 4242;
        let mut inspection = sample_inspection("tok-4");
        let result = storage
            .create_inspection(&mut inspection, &mut [record(&part, &damage_type), dangling])
            .await;
        assert!(result.is_err());
        assert!(inspection.id.is_none());
        assert!(storage.get_inspection_by_token("tok-4").await.unwrap().is_none());
        assert!(storage.list_inspections(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_and_joins_details() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let part = storage.get_or_create_cart_part("Roof", "Exterior").await.unwrap();
        let again = storage.get_or_create_cart_part("Roof", "Interior").await.unwrap();
        assert_eq!(part, again);

        let damage_type = storage.get_or_create_damage_type("Scratches", 1).await.unwrap();
        let mut inspection = sample_inspection("tok-2");
        let mut records = [record(&part, &damage_type)];
        storage
            .create_inspection(&mut inspection, &mut records)
            .await
            .unwrap();
        assert_eq!(records[0].inspection_id, inspection.id.unwrap());
        assert!(records[0].id.is_some());

        let details = storage
            .list_damage_details(inspection.id.unwrap())
            .await
            .unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].part, "Roof");
        assert_eq!(details[0].location, "Exterior");
        assert_eq!(details[0].damage_type, "Scratches");
        assert_eq!(details[0].quantity, 2);
    }

    #[tokio::test]
    async fn list_filters_by_status_newest_first() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let mut first = sample_inspection("a");
        let mut second = sample_inspection("b");
        second.status = InspectionStatus::Signed;
        storage.create_inspection(&mut first, &mut []).await.unwrap();
        storage.create_inspection(&mut second, &mut []).await.unwrap();

        let all = storage.list_inspections(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].access_token, "b");

        let signed = storage
            .list_inspections(Some(InspectionStatus::Signed))
            .await
            .unwrap();
        assert_eq!(signed.len(), 1);
    }
}
