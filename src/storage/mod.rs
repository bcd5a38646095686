pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

use crate::domain::{
    CartPart, DamageDetail, DamageRecord, DamageType, Inspection, InspectionStatus, Property,
};
use crate::error::{InspectionError, Result};
use async_trait::async_trait;

/// Storage trait for persisting inspections and their catalog lookups
#[async_trait]
pub trait Storage: Send + Sync {
    // Inspection operations
    /// Inserts the inspection and its damage records together: either all rows
    /// land or none do. Assigns ids and each record's `inspection_id`.
    async fn create_inspection(
        &self,
        inspection: &mut Inspection,
        damages: &mut [DamageRecord],
    ) -> Result<()>;
    /// Writes `inspection` only if the stored row is still in status `from`.
    /// A row that moved on in the meantime yields `InvalidState`.
    async fn transition_inspection(
        &self,
        inspection: &Inspection,
        from: InspectionStatus,
    ) -> Result<()>;
    async fn get_inspection(&self, id: i64) -> Result<Option<Inspection>>;
    async fn get_inspection_by_token(&self, token: &str) -> Result<Option<Inspection>>;
    /// Newest first.
    async fn list_inspections(&self, status: Option<InspectionStatus>) -> Result<Vec<Inspection>>;

    // Property operations
    async fn get_or_create_property(&self, name: &str) -> Result<Property>;
    async fn get_property(&self, id: i64) -> Result<Option<Property>>;
    async fn list_properties(&self) -> Result<Vec<Property>>;

    // Catalog operations (listings return active rows ordered by name)
    async fn get_or_create_cart_part(&self, name: &str, category: &str) -> Result<CartPart>;
    async fn list_cart_parts(&self) -> Result<Vec<CartPart>>;
    async fn get_or_create_damage_type(&self, name: &str, severity_level: i64) -> Result<DamageType>;
    async fn list_damage_types(&self) -> Result<Vec<DamageType>>;

    // Damage record operations
    async fn list_damage_details(&self, inspection_id: i64) -> Result<Vec<DamageDetail>>;
}

pub(crate) fn stale_transition(
    id: i64,
    current: InspectionStatus,
    from: InspectionStatus,
) -> InspectionError {
    InspectionError::InvalidState(format!(
        "Inspection {id} is {current}, expected {from}"
    ))
}

pub(crate) fn part_description(name: &str) -> String {
    format!("{name} of the cart")
}

pub(crate) fn damage_type_description(name: &str) -> String {
    if name == crate::constants::GENERAL_DAMAGE_TYPE {
        "General damage".to_string()
    } else {
        name.to_string()
    }
}
