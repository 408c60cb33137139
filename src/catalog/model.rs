//! Catalog entities: schools, garments, sizes and the three-way price table

use crate::core::entity::{CatalogEntity, CatalogRef, Entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use uuid::Uuid;
use validator::Validate;

fn default_active() -> bool {
    true
}

/// A school whose uniforms are sold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SchoolInput {
    #[validate(
        length(max = 120),
        custom(function = "crate::core::validation::not_blank", message = "name is required")
    )]
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// A garment type (shirt, trousers, skirt...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Garment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GarmentInput {
    #[validate(
        length(max = 120),
        custom(function = "crate::core::validation::not_blank", message = "name is required")
    )]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

/// A size label; lower `display_order` sorts first (smaller)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Size {
    pub id: Uuid,
    pub name: String,
    pub display_order: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SizeInput {
    #[validate(
        length(max = 40),
        custom(function = "crate::core::validation::not_blank", message = "name is required")
    )]
    pub name: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

macro_rules! impl_entity {
    ($ty:ty, $plural:literal, $singular:literal) => {
        impl Entity for $ty {
            fn resource_name() -> &'static str {
                $plural
            }

            fn resource_name_singular() -> &'static str {
                $singular
            }

            fn id(&self) -> Uuid {
                self.id
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn updated_at(&self) -> DateTime<Utc> {
                self.updated_at
            }

            fn is_active(&self) -> bool {
                self.active
            }
        }
    };
}

impl_entity!(School, "schools", "school");
impl_entity!(Garment, "garments", "garment");
impl_entity!(Size, "sizes", "size");

impl CatalogEntity for School {
    type Input = SchoolInput;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_input(input: SchoolInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            active: input.active,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: SchoolInput) {
        self.name = input.name.trim().to_string();
        self.active = input.active;
        self.updated_at = Utc::now();
    }

    fn catalog_ref(id: Uuid) -> CatalogRef {
        CatalogRef::School(id)
    }
}

impl CatalogEntity for Garment {
    type Input = GarmentInput;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_input(input: GarmentInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            description: crate::core::validation::normalize_optional(input.description),
            active: input.active,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: GarmentInput) {
        self.name = input.name.trim().to_string();
        self.description = crate::core::validation::normalize_optional(input.description);
        self.active = input.active;
        self.updated_at = Utc::now();
    }

    fn catalog_ref(id: Uuid) -> CatalogRef {
        CatalogRef::Garment(id)
    }
}

impl CatalogEntity for Size {
    type Input = SizeInput;

    fn name(&self) -> &str {
        &self.name
    }

    fn from_input(input: SizeInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            display_order: input.display_order,
            active: input.active,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply(&mut self, input: SizeInput) {
        self.name = input.name.trim().to_string();
        self.display_order = input.display_order;
        self.active = input.active;
        self.updated_at = Utc::now();
    }

    fn catalog_ref(id: Uuid) -> CatalogRef {
        CatalogRef::Size(id)
    }

    fn catalog_order(&self, other: &Self) -> Ordering {
        self.display_order
            .cmp(&other.display_order)
            .then_with(|| self.name.cmp(&other.name))
    }
}

/// Composite identity of a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceKey {
    pub school_id: Uuid,
    pub garment_id: Uuid,
    pub size_id: Uuid,
}

impl PriceKey {
    pub fn new(school_id: Uuid, garment_id: Uuid, size_id: Uuid) -> Self {
        Self {
            school_id,
            garment_id,
            size_id,
        }
    }

    pub fn references(&self, target: CatalogRef) -> bool {
        match target {
            CatalogRef::School(id) => self.school_id == id,
            CatalogRef::Garment(id) => self.garment_id == id,
            CatalogRef::Size(id) => self.size_id == id,
        }
    }
}

/// Unit price for one (school, garment, size) triple, in whole currency units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Price {
    pub school_id: Uuid,
    pub garment_id: Uuid,
    pub size_id: Uuid,
    pub price: i64,
}

impl Price {
    pub fn key(&self) -> PriceKey {
        PriceKey::new(self.school_id, self.garment_id, self.size_id)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PriceInput {
    pub school_id: Uuid,
    pub garment_id: Uuid,
    pub size_id: Uuid,
    #[validate(range(min = 0, message = "price cannot be negative"))]
    pub price: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PriceAmount {
    #[validate(range(min = 0, message = "price cannot be negative"))]
    pub price: i64,
}

/// Price enriched with the names of the entities it points to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceView {
    #[serde(flatten)]
    pub price: Price,
    pub school_name: Option<String>,
    pub garment_name: Option<String>,
    pub size_name: Option<String>,
    #[serde(skip)]
    pub size_order: i32,
}

/// Records pointing at a catalog entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceCount {
    pub prices: u64,
    pub items: u64,
}

impl ReferenceCount {
    pub fn total(&self) -> u64 {
        self.prices + self.items
    }

    pub fn is_referenced(&self) -> bool {
        self.total() > 0
    }
}
