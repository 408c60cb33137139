//! Entity traits shared by the catalog tables

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use uuid::Uuid;

/// Base trait for every persisted catalog entity.
///
/// All entities have:
/// - id: Unique identifier
/// - created_at: Creation timestamp
/// - updated_at: Last modification timestamp
/// - active: Whether the entity is offered for new orders
pub trait Entity: Clone + Send + Sync + 'static {
    /// The plural resource name used in URLs (e.g., "schools", "sizes")
    fn resource_name() -> &'static str;

    /// The singular resource name (e.g., "school", "size")
    fn resource_name_singular() -> &'static str;

    /// Get the unique identifier for this entity instance
    fn id(&self) -> Uuid;

    /// Get the creation timestamp
    fn created_at(&self) -> DateTime<Utc>;

    /// Get the last update timestamp
    fn updated_at(&self) -> DateTime<Utc>;

    /// Whether the entity is active
    fn is_active(&self) -> bool;
}

/// The three catalog dimensions a price and an order item point to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogRef {
    School(Uuid),
    Garment(Uuid),
    Size(Uuid),
}

impl CatalogRef {
    pub fn id(&self) -> Uuid {
        match self {
            CatalogRef::School(id) | CatalogRef::Garment(id) | CatalogRef::Size(id) => *id,
        }
    }

    pub fn entity_type(&self) -> &'static str {
        match self {
            CatalogRef::School(_) => "school",
            CatalogRef::Garment(_) => "garment",
            CatalogRef::Size(_) => "size",
        }
    }
}

/// Trait for catalog entities (schools, garments, sizes).
///
/// Catalog entities extend the base Entity with a display name, an edit
/// payload and their position in the price table.
pub trait CatalogEntity: Entity {
    /// Fields accepted on create and update
    type Input: Send + Sync + 'static;

    /// Get the display name of this entity
    fn name(&self) -> &str;

    /// Build a new entity from its input
    fn from_input(input: Self::Input) -> Self;

    /// Apply an update, refreshing `updated_at`
    fn apply(&mut self, input: Self::Input);

    /// Reference used when counting prices and order items pointing here
    fn catalog_ref(id: Uuid) -> CatalogRef;

    /// Listing order for this entity type
    fn catalog_order(&self, other: &Self) -> Ordering {
        self.name()
            .to_lowercase()
            .cmp(&other.name().to_lowercase())
    }
}
