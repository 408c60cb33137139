//! Sales overview: order counts, money totals, recent orders and rankings

use crate::config::DashboardConfig;
use crate::core::entity::CatalogEntity;
use crate::core::error::Result;
use crate::core::service::{OrderTotals, QuantityByRef, RankingDimension};
use crate::orders::model::{OrderAggregate, OrderStatus};
use crate::storage::Stores;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct RecentOrder {
    pub id: Uuid,
    pub code: String,
    pub client: String,
    pub status: OrderStatus,
    pub total: i64,
    pub saldo: i64,
    pub school_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    pub id: Uuid,
    pub name: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub totals: OrderTotals,
    pub recent_orders: Vec<RecentOrder>,
    pub top_garments: Vec<RankedEntry>,
    pub top_schools: Vec<RankedEntry>,
}

#[derive(Clone)]
pub struct DashboardService {
    stores: Stores,
    config: DashboardConfig,
}

impl DashboardService {
    pub fn new(stores: Stores, config: DashboardConfig) -> Self {
        Self { stores, config }
    }

    pub async fn summary(&self) -> Result<DashboardSummary> {
        let totals = self.stores.orders.order_totals().await?;
        let recent = self
            .stores
            .orders
            .recent_orders(self.config.recent_limit)
            .await?;
        let garment_ranking = self
            .stores
            .orders
            .quantity_ranking(RankingDimension::Garment, self.config.top_limit)
            .await?;
        let school_ranking = self
            .stores
            .orders
            .quantity_ranking(RankingDimension::School, self.config.top_limit)
            .await?;

        let schools = names(self.stores.schools.list().await?);
        let garments = names(self.stores.garments.list().await?);

        tracing::debug!(
            total_orders = totals.total_orders,
            recent = recent.len(),
            "dashboard computed"
        );

        Ok(DashboardSummary {
            totals,
            recent_orders: recent
                .into_iter()
                .map(|agg| recent_order(agg, &schools))
                .collect(),
            top_garments: ranked(garment_ranking, &garments),
            top_schools: ranked(school_ranking, &schools),
        })
    }
}

fn names<T: CatalogEntity>(entries: Vec<T>) -> HashMap<Uuid, String> {
    entries
        .into_iter()
        .map(|entry| (entry.id(), entry.name().to_string()))
        .collect()
}

fn recent_order(aggregate: OrderAggregate, schools: &HashMap<Uuid, String>) -> RecentOrder {
    let school_name = aggregate
        .school_id()
        .and_then(|id| schools.get(&id).cloned());
    let order = aggregate.order;
    RecentOrder {
        id: order.id,
        client: order.client.full_name(),
        code: order.code,
        status: order.status,
        total: order.total,
        saldo: order.saldo,
        school_name,
        created_at: order.created_at,
    }
}

fn ranked(ranking: Vec<QuantityByRef>, names: &HashMap<Uuid, String>) -> Vec<RankedEntry> {
    ranking
        .into_iter()
        .map(|entry| RankedEntry {
            id: entry.id,
            name: names.get(&entry.id).cloned(),
            quantity: entry.quantity,
        })
        .collect()
}

