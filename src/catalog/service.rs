//! Catalog administration: schools, garments, sizes and prices

use crate::catalog::model::{
    Garment, Price, PriceAmount, PriceInput, PriceKey, PriceView, School, Size,
};
use crate::core::entity::{CatalogEntity, CatalogRef};
use crate::core::error::{CatalogError, Result, ShopError};
use crate::core::service::{CatalogStore, DataService};
use crate::core::validation::validate;
use crate::orders::input::DraftItem;
use crate::storage::Stores;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

fn not_found<T: CatalogEntity>(id: Uuid) -> ShopError {
    CatalogError::NotFound {
        entity_type: T::resource_name_singular().to_string(),
        id,
    }
    .into()
}

fn price_not_found(key: &PriceKey) -> ShopError {
    CatalogError::PriceNotFound {
        school_id: key.school_id,
        garment_id: key.garment_id,
        size_id: key.size_id,
    }
    .into()
}

/// CRUD for one catalog table with the referential delete guard
#[derive(Clone)]
pub struct CatalogService<T: CatalogEntity> {
    entities: Arc<dyn DataService<T>>,
    catalog: Arc<dyn CatalogStore>,
}

impl<T> CatalogService<T>
where
    T: CatalogEntity,
    T::Input: Validate,
{
    pub fn new(entities: Arc<dyn DataService<T>>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { entities, catalog }
    }

    pub async fn create(&self, input: T::Input) -> Result<T> {
        validate(&input)?;
        let created = self.entities.create(T::from_input(input)).await?;
        tracing::info!(
            entity = T::resource_name_singular(),
            id = %created.id(),
            name = created.name(),
            "catalog entry created"
        );
        Ok(created)
    }

    pub async fn get(&self, id: Uuid) -> Result<T> {
        self.entities
            .get(&id)
            .await?
            .ok_or_else(|| not_found::<T>(id))
    }

    /// Entries in listing order; `active_only` hides retired ones
    pub async fn list(&self, active_only: bool) -> Result<Vec<T>> {
        let mut entries = self.entities.list().await?;
        if active_only {
            entries.retain(|entry| entry.is_active());
        }
        entries.sort_by(|a, b| a.catalog_order(b));
        Ok(entries)
    }

    pub async fn update(&self, id: Uuid, input: T::Input) -> Result<T> {
        validate(&input)?;
        let mut entry = self.get(id).await?;
        entry.apply(input);
        let updated = self.entities.update(&id, entry).await?;
        tracing::info!(
            entity = T::resource_name_singular(),
            id = %id,
            "catalog entry updated"
        );
        Ok(updated)
    }

    /// Delete unless prices or order items still point at the entry
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.get(id).await?;

        let references = self.catalog.count_references(T::catalog_ref(id)).await?;
        if references.is_referenced() {
            tracing::warn!(
                entity = T::resource_name_singular(),
                id = %id,
                items = references.items,
                prices = references.prices,
                "delete blocked by references"
            );
            return Err(CatalogError::ReferencedEntity {
                entity_type: T::resource_name_singular().to_string(),
                id,
                prices: references.prices,
                items: references.items,
            }
            .into());
        }

        if !self.entities.delete(&id).await? {
            return Err(not_found::<T>(id));
        }
        tracing::info!(entity = T::resource_name_singular(), id = %id, "catalog entry deleted");
        Ok(())
    }
}

/// The three-way price table
#[derive(Clone)]
pub struct PriceService {
    stores: Stores,
}

impl PriceService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Price of a triple, or `PriceNotFound`
    pub async fn find_price(&self, key: &PriceKey) -> Result<Price> {
        tracing::debug!(
            school_id = %key.school_id,
            garment_id = %key.garment_id,
            size_id = %key.size_id,
            "price lookup"
        );
        self.stores
            .catalog
            .find_price(key)
            .await?
            .ok_or_else(|| price_not_found(key))
    }

    /// Unit price for a requested order line.
    ///
    /// Missing school, garment or size is `NotFound`; an existing triple
    /// without a price is `PriceNotFound`.
    pub async fn resolve_unit_price(&self, item: &DraftItem) -> Result<i64> {
        let key = PriceKey::new(item.school_id, item.garment_id, item.size_id);
        self.ensure_catalog_entries(&key).await?;
        Ok(self.find_price(&key).await?.price)
    }

    pub async fn create_price(&self, input: PriceInput) -> Result<Price> {
        validate(&input)?;
        let price = Price {
            school_id: input.school_id,
            garment_id: input.garment_id,
            size_id: input.size_id,
            price: input.price,
        };
        let key = price.key();
        self.ensure_catalog_entries(&key).await?;

        if self.stores.catalog.find_price(&key).await?.is_some() {
            return Err(duplicate_price(&key));
        }

        let created = match self.stores.catalog.create_price(price).await {
            Ok(created) => created,
            Err(ShopError::Storage(e)) if e.is_conflict() => return Err(duplicate_price(&key)),
            Err(e) => return Err(e),
        };
        tracing::info!(
            school_id = %key.school_id,
            garment_id = %key.garment_id,
            size_id = %key.size_id,
            price = created.price,
            "price created"
        );
        Ok(created)
    }

    pub async fn update_price(&self, key: &PriceKey, input: PriceAmount) -> Result<Price> {
        validate(&input)?;
        let updated = self
            .stores
            .catalog
            .update_price(key, input.price)
            .await?
            .ok_or_else(|| price_not_found(key))?;
        tracing::info!(
            school_id = %key.school_id,
            garment_id = %key.garment_id,
            size_id = %key.size_id,
            price = updated.price,
            "price updated"
        );
        Ok(updated)
    }

    pub async fn delete_price(&self, key: &PriceKey) -> Result<()> {
        if !self.stores.catalog.delete_price(key).await? {
            return Err(price_not_found(key));
        }
        tracing::info!(
            school_id = %key.school_id,
            garment_id = %key.garment_id,
            size_id = %key.size_id,
            "price deleted"
        );
        Ok(())
    }

    /// Every price with entity names, sorted by school name, garment name
    /// and size display order
    pub async fn list_prices(&self) -> Result<Vec<PriceView>> {
        let prices = self.stores.catalog.list_prices().await?;
        let schools: HashMap<Uuid, School> = by_id(self.stores.schools.list().await?);
        let garments: HashMap<Uuid, Garment> = by_id(self.stores.garments.list().await?);
        let sizes: HashMap<Uuid, Size> = by_id(self.stores.sizes.list().await?);

        let mut views: Vec<PriceView> = prices
            .into_iter()
            .map(|price| {
                let size = sizes.get(&price.size_id);
                PriceView {
                    school_name: schools.get(&price.school_id).map(|s| s.name.clone()),
                    garment_name: garments.get(&price.garment_id).map(|g| g.name.clone()),
                    size_name: size.map(|s| s.name.clone()),
                    size_order: size.map(|s| s.display_order).unwrap_or_default(),
                    price,
                }
            })
            .collect();

        views.sort_by(|a, b| {
            sort_name(&a.school_name)
                .cmp(&sort_name(&b.school_name))
                .then_with(|| sort_name(&a.garment_name).cmp(&sort_name(&b.garment_name)))
                .then_with(|| a.size_order.cmp(&b.size_order))
        });
        Ok(views)
    }

    async fn ensure_catalog_entries(&self, key: &PriceKey) -> Result<()> {
        for target in [
            CatalogRef::School(key.school_id),
            CatalogRef::Garment(key.garment_id),
            CatalogRef::Size(key.size_id),
        ] {
            if !self.exists(target).await? {
                return Err(CatalogError::NotFound {
                    entity_type: target.entity_type().to_string(),
                    id: target.id(),
                }
                .into());
            }
        }
        Ok(())
    }

    async fn exists(&self, target: CatalogRef) -> Result<bool> {
        Ok(match target {
            CatalogRef::School(id) => self.stores.schools.get(&id).await?.is_some(),
            CatalogRef::Garment(id) => self.stores.garments.get(&id).await?.is_some(),
            CatalogRef::Size(id) => self.stores.sizes.get(&id).await?.is_some(),
        })
    }
}

fn duplicate_price(key: &PriceKey) -> ShopError {
    tracing::warn!(
        school_id = %key.school_id,
        garment_id = %key.garment_id,
        size_id = %key.size_id,
        "duplicate price rejected"
    );
    CatalogError::DuplicatePrice {
        school_id: key.school_id,
        garment_id: key.garment_id,
        size_id: key.size_id,
    }
    .into()
}

fn by_id<T: CatalogEntity>(entries: Vec<T>) -> HashMap<Uuid, T> {
    entries.into_iter().map(|e| (e.id(), e)).collect()
}

fn sort_name(name: &Option<String>) -> String {
    name.as_deref().unwrap_or_default().to_lowercase()
}
