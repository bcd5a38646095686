use super::{damage_type_description, part_description, stale_transition, Storage};
use crate::constants::DEFAULT_PROPERTY_LOCATION;
use crate::domain::{
    CartPart, DamageDetail, DamageRecord, DamageType, Inspection, InspectionStatus, Property,
};
use crate::error::{InspectionError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct Tables {
    next_id: i64,
    inspections: BTreeMap<i64, Inspection>,
    properties: BTreeMap<i64, Property>,
    cart_parts: BTreeMap<i64, CartPart>,
    damage_types: BTreeMap<i64, DamageType>,
    damage_records: BTreeMap<i64, DamageRecord>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory storage implementation for development/testing
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| InspectionError::Storage {
            message: "in-memory storage lock poisoned".to_string(),
        })
    }
}

fn sorted_by_name<T>(rows: impl Iterator<Item = T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    rows.sort_by(|a, b| name(a).cmp(name(b)));
    rows
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_inspection(
        &self,
        inspection: &mut Inspection,
        damages: &mut [DamageRecord],
    ) -> Result<()> {
        let mut tables = self.tables()?;
        if tables
            .inspections
            .values()
            .any(|i| i.access_token == inspection.access_token)
        {
            return Err(InspectionError::Storage {
                message: "access token already in use".to_string(),
            });
        }
        for record in damages.iter() {
            if !tables.cart_parts.contains_key(&record.part_id)
                || !tables.damage_types.contains_key(&record.damage_type_id)
            {
                return Err(InspectionError::Storage {
                    message: "damage record references an unknown catalog entry".to_string(),
                });
            }
        }

        let id = tables.allocate_id();
        inspection.id = Some(id);
        tables.inspections.insert(id, inspection.clone());
        for record in damages.iter_mut() {
            let record_id = tables.allocate_id();
            record.id = Some(record_id);
            record.inspection_id = id;
            tables.damage_records.insert(record_id, record.clone());
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
        let mut tables = self.tables()?;
        let existing = tables
            .inspections
            .get_mut(&id)
            .ok_or_else(|| InspectionError::NotFound(format!("Inspection {id}")))?;
        if existing.status != from {
            return Err(stale_transition(id, existing.status, from));
        }
        *existing = inspection.clone();
        debug!("Inspection {} moved from {} to {}", id, from, inspection.status);
        Ok(())
    }

    async fn get_inspection(&self, id: i64) -> Result<Option<Inspection>> {
        Ok(self.tables()?.inspections.get(&id).cloned())
    }

    async fn get_inspection_by_token(&self, token: &str) -> Result<Option<Inspection>> {
        let tables = self.tables()?;
        Ok(tables
            .inspections
            .values()
            .find(|i| i.access_token == token)
            .cloned())
    }

    async fn list_inspections(&self, status: Option<InspectionStatus>) -> Result<Vec<Inspection>> {
        let tables = self.tables()?;
        Ok(tables
            .inspections
            .values()
            .rev()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect())
    }

    async fn get_or_create_property(&self, name: &str) -> Result<Property> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.properties.values().find(|p| p.name == name) {
            return Ok(existing.clone());
        }
        let id = tables.allocate_id();
        let property = Property {
            id: Some(id),
            name: name.to_string(),
            location: DEFAULT_PROPERTY_LOCATION.to_string(),
            active: true,
        };
        tables.properties.insert(id, property.clone());
        debug!("Created property {} with id {}", name, id);
        Ok(property)
    }

    async fn get_property(&self, id: i64) -> Result<Option<Property>> {
        Ok(self.tables()?.properties.get(&id).cloned())
    }

    async fn list_properties(&self) -> Result<Vec<Property>> {
        let tables = self.tables()?;
        Ok(sorted_by_name(
            tables.properties.values().filter(|p| p.active).cloned(),
            |p| p.name.as_str(),
        ))
    }

    async fn get_or_create_cart_part(&self, name: &str, category: &str) -> Result<CartPart> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.cart_parts.values().find(|p| p.name == name) {
            return Ok(existing.clone());
        }
        let id = tables.allocate_id();
        let part = CartPart {
            id: Some(id),
            name: name.to_string(),
            description: part_description(name),
            category: category.to_string(),
            active: true,
        };
        tables.cart_parts.insert(id, part.clone());
        Ok(part)
    }

    async fn list_cart_parts(&self) -> Result<Vec<CartPart>> {
        let tables = self.tables()?;
        Ok(sorted_by_name(
            tables.cart_parts.values().filter(|p| p.active).cloned(),
            |p| p.name.as_str(),
        ))
    }

    async fn get_or_create_damage_type(&self, name: &str, severity_level: i64) -> Result<DamageType> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.damage_types.values().find(|t| t.name == name) {
            return Ok(existing.clone());
        }
        let id = tables.allocate_id();
        let damage_type = DamageType {
            id: Some(id),
            name: name.to_string(),
            description: damage_type_description(name),
            severity_level,
            active: true,
        };
        tables.damage_types.insert(id, damage_type.clone());
        Ok(damage_type)
    }

    async fn list_damage_types(&self) -> Result<Vec<DamageType>> {
        let tables = self.tables()?;
        Ok(sorted_by_name(
            tables.damage_types.values().filter(|t| t.active).cloned(),
            |t| t.name.as_str(),
        ))
    }

    async fn list_damage_details(&self, inspection_id: i64) -> Result<Vec<DamageDetail>> {
        let tables = self.tables()?;
        let mut details = Vec::new();
        for (id, record) in tables
            .damage_records
            .iter()
            .filter(|(_, r)| r.inspection_id == inspection_id)
        {
            let part = tables.cart_parts.get(&record.part_id);
            let damage_type = tables.damage_types.get(&record.damage_type_id);
            let (Some(part), Some(damage_type)) = (part, damage_type) else {
                continue;
            };
            details.push(DamageDetail {
                id: *id,
                damage_type: damage_type.name.clone(),
                part: part.name.clone(),
                location: part.category.clone(),
                description: record.description.clone(),
                quantity: record.quantity,
                photo_url: record.photo_url.clone(),
            });
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn sent_inspection(token: &str) -> Inspection {
        let now = Utc::now();
        Inspection {
            id: None,
            cart_number: "8".to_string(),
            property_id: None,
            guest_name: "Rio Tan".to_string(),
            guest_email: "rio@example.com".to_string(),
            guest_phone: String::new(),
            guest_room: String::new(),
            inspector_name: String::new(),
            inspection_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            front_damage: String::new(),
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
            status: InspectionStatus::Sent,
            access_token: token.to_string(),
            created_at: now,
            updated_at: now,
            sent_at: Some(now),
            signed_at: None,
            token_expires_at: None,
        }
    }

    #[tokio::test]
    async fn second_transition_from_the_same_status_fails() {
        let storage = InMemoryStorage::new();
        let mut inspection = sent_inspection("t1");
        storage.create_inspection(&mut inspection, &mut []).await.unwrap();

        let mut signed = inspection.clone();
        signed.status = InspectionStatus::Signed;
        storage
            .transition_inspection(&signed, InspectionStatus::Sent)
            .await
            .unwrap();
        assert!(matches!(
            storage
                .transition_inspection(&signed, InspectionStatus::Sent)
                .await,
            Err(InspectionError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn unknown_catalog_reference_writes_nothing() {
        let storage = InMemoryStorage::new();
        let mut inspection = sent_inspection("t2");
        let mut records = [DamageRecord {
            id: None,
            inspection_id: 0,
            part_id: 77,
            damage_type_id: 78,
            description: String::new(),
            quantity: 1,
            photo_url: None,
            created_at: Utc::now(),
        }];
        assert!(storage
            .create_inspection(&mut inspection, &mut records)
            .await
            .is_err());
        assert!(inspection.id.is_none());
        assert!(storage.list_inspections(None).await.unwrap().is_empty());
    }
}
