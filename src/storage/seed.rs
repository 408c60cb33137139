//! Demo catalog for development setups
//!
//! Three schools, five garments and six sizes with a price for every
//! combination. Seeding is skipped when any school already exists.

use crate::catalog::model::{
    Garment, GarmentInput, Price, School, SchoolInput, Size, SizeInput,
};
use crate::core::entity::CatalogEntity;
use crate::core::error::Result;
use crate::storage::Stores;

const SCHOOLS: &[&str] = &["Colegio San José", "Instituto Nacional", "Liceo de Aplicación"];

/// Name, description and base price of each demo garment
const GARMENTS: &[(&str, &str, i64)] = &[
    ("Camisa", "Camisa blanca de uniforme", 12000),
    ("Pantalón", "Pantalón gris de uniforme", 18000),
    ("Falda", "Falda tableada", 15000),
    ("Polera", "Polera de educación física", 9000),
    ("Buzo", "Buzo deportivo", 22000),
];

const SIZES: &[&str] = &["XS", "S", "M", "L", "XL", "XXL"];

/// Price increase per size step
const SIZE_STEP: i64 = 500;

/// Price increase per school, in listing order
const SCHOOL_STEP: i64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub schools: usize,
    pub garments: usize,
    pub sizes: usize,
    pub prices: usize,
}

impl SeedSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Insert the demo catalog unless the store already has schools
pub async fn seed_demo(stores: &Stores) -> Result<SeedSummary> {
    if !stores.schools.list().await?.is_empty() {
        tracing::info!("catalog already populated, skipping demo seed");
        return Ok(SeedSummary::default());
    }

    let mut schools = Vec::with_capacity(SCHOOLS.len());
    for name in SCHOOLS {
        let school = School::from_input(SchoolInput {
            name: name.to_string(),
            active: true,
        });
        schools.push(stores.schools.create(school).await?);
    }

    let mut garments = Vec::with_capacity(GARMENTS.len());
    for (name, description, base) in GARMENTS {
        let garment = Garment::from_input(GarmentInput {
            name: name.to_string(),
            description: Some(description.to_string()),
            active: true,
        });
        garments.push((stores.garments.create(garment).await?, *base));
    }

    let mut sizes = Vec::with_capacity(SIZES.len());
    for (position, name) in SIZES.iter().enumerate() {
        let size = Size::from_input(SizeInput {
            name: name.to_string(),
            display_order: position as i32 + 1,
            active: true,
        });
        sizes.push(stores.sizes.create(size).await?);
    }

    let mut prices = 0;
    for (school_index, school) in schools.iter().enumerate() {
        for (garment, base) in &garments {
            for size in &sizes {
                let price = base
                    + SCHOOL_STEP * school_index as i64
                    + SIZE_STEP * (size.display_order as i64 - 1);
                stores
                    .catalog
                    .create_price(Price {
                        school_id: school.id,
                        garment_id: garment.id,
                        size_id: size.id,
                        price,
                    })
                    .await?;
                prices += 1;
            }
        }
    }

    let summary = SeedSummary {
        schools: schools.len(),
        garments: garments.len(),
        sizes: sizes.len(),
        prices,
    };
    tracing::info!(
        schools = summary.schools,
        garments = summary.garments,
        sizes = summary.sizes,
        prices = summary.prices,
        "demo catalog seeded"
    );
    Ok(summary)
}
