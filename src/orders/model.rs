//! Order aggregate: the order row, its line items and derived views

use crate::core::entity::CatalogRef;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fulfillment lifecycle: `INGRESADO -> EN_PROCESO -> ENTREGADO`
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Taken in, nothing ready yet
    #[default]
    Ingresado,
    /// At least one item is ready
    EnProceso,
    /// Handed over to the client (terminal)
    Entregado,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Ingresado,
        OrderStatus::EnProceso,
        OrderStatus::Entregado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Ingresado => "INGRESADO",
            OrderStatus::EnProceso => "EN_PROCESO",
            OrderStatus::Entregado => "ENTREGADO",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Entregado)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown order status '{s}'"))
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Client contact data attached to an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ClientInfo {
    pub client_name: String,
    pub client_surname: Option<String>,
    pub client_phone: Option<String>,
    pub client_email: Option<String>,
    pub detail: Option<String>,
}

impl ClientInfo {
    /// "Name Surname", or just the name
    pub fn full_name(&self) -> String {
        match &self.client_surname {
            Some(surname) => format!("{} {}", self.client_name, surname),
            None => self.client_name.clone(),
        }
    }
}

/// The order row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub code: String,
    #[serde(flatten)]
    #[cfg_attr(feature = "postgres", sqlx(flatten))]
    pub client: ClientInfo,
    pub year: i32,
    pub delivery_date: Option<NaiveDate>,
    #[cfg_attr(feature = "postgres", sqlx(try_from = "String"))]
    pub status: OrderStatus,
    pub total: i64,
    pub abono: i64,
    pub saldo: i64,
    pub discounted_total: Option<i64>,
    /// Bumped by every save; a save only lands on the version it was read at
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// A fresh order: INGRESADO, zero financials, no code assigned yet
    pub fn new(client: ClientInfo, year: i32, delivery_date: Option<NaiveDate>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code: String::new(),
            client,
            year,
            delivery_date,
            status: OrderStatus::Ingresado,
            total: 0,
            abono: 0,
            saldo: 0,
            discounted_total: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// One (school, garment, size, quantity) line with its frozen unit price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub school_id: Uuid,
    pub garment_id: Uuid,
    pub size_id: Uuid,
    pub quantity: i64,
    pub unit_price: i64,
    pub subtotal: i64,
    pub ready: bool,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn references(&self, target: CatalogRef) -> bool {
        match target {
            CatalogRef::School(id) => self.school_id == id,
            CatalogRef::Garment(id) => self.garment_id == id,
            CatalogRef::Size(id) => self.size_id == id,
        }
    }
}

/// Ready quantity over total quantity, for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrderProgress {
    pub ready_quantity: i64,
    pub total_quantity: i64,
    /// 0..=100, rounded down
    pub percent: u8,
}

/// An order with all of its items; the unit every write goes through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAggregate {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderAggregate {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }

    pub fn id(&self) -> Uuid {
        self.order.id
    }

    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    /// School shown for the order: the one of its first item
    pub fn school_id(&self) -> Option<Uuid> {
        self.items.first().map(|item| item.school_id)
    }

    pub fn pending_items(&self) -> usize {
        self.items.iter().filter(|item| !item.ready).count()
    }

    pub fn any_ready(&self) -> bool {
        self.items.iter().any(|item| item.ready)
    }

    pub fn progress(&self) -> OrderProgress {
        let (ready_quantity, total_quantity) =
            self.items.iter().fold((0i64, 0i64), |(ready, total), item| {
                let ready = if item.ready {
                    ready.saturating_add(item.quantity)
                } else {
                    ready
                };
                (ready, total.saturating_add(item.quantity))
            });

        let percent = if total_quantity > 0 {
            ((ready_quantity as i128 * 100) / total_quantity as i128) as u8
        } else {
            0
        };

        OrderProgress {
            ready_quantity,
            total_quantity,
            percent,
        }
    }
}

/// Outward shape of an order: the aggregate plus derived fields
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub aggregate: OrderAggregate,
    pub school_id: Option<Uuid>,
    pub progress: OrderProgress,
}

impl From<OrderAggregate> for OrderView {
    fn from(aggregate: OrderAggregate) -> Self {
        Self {
            school_id: aggregate.school_id(),
            progress: aggregate.progress(),
            aggregate,
        }
    }
}
