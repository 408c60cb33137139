//! Request payloads for order operations

use crate::core::error::ShopError;
use crate::core::validation::{
    MAX_DETAIL_LEN, MAX_ORDER_YEAR, MIN_ORDER_YEAR, PHONE_RE, normalize_optional,
    normalize_required, validate,
};
use crate::orders::model::{ClientInfo, OrderStatus};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn current_year() -> i32 {
    Utc::now().year()
}

/// Client fields as submitted by the caller
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ClientInfoInput {
    #[validate(length(min = 1, max = 120, message = "client name is required"))]
    pub client_name: String,
    #[validate(length(max = 120))]
    pub client_surname: Option<String>,
    #[validate(regex(path = *PHONE_RE, message = "invalid phone number"))]
    pub client_phone: Option<String>,
    #[validate(email(message = "invalid email address"))]
    pub client_email: Option<String>,
    #[validate(length(max = MAX_DETAIL_LEN, message = "detail is limited to 500 characters"))]
    pub detail: Option<String>,
}

impl ClientInfoInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            client_name: name.into(),
            ..Default::default()
        }
    }

    /// Trim every field and drop blank optional ones
    pub fn normalized(self) -> Self {
        Self {
            client_name: normalize_required(&self.client_name),
            client_surname: normalize_optional(self.client_surname),
            client_phone: normalize_optional(self.client_phone),
            client_email: normalize_optional(self.client_email),
            detail: normalize_optional(self.detail),
        }
    }

    /// Normalize, validate and convert
    pub fn into_client_info(self) -> Result<ClientInfo, ShopError> {
        let input = self.normalized();
        validate(&input)?;
        Ok(ClientInfo {
            client_name: input.client_name,
            client_surname: input.client_surname,
            client_phone: input.client_phone,
            client_email: input.client_email,
            detail: input.detail,
        })
    }
}

/// A requested line: the unit price is resolved from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftItem {
    pub school_id: Uuid,
    pub garment_id: Uuid,
    pub size_id: Uuid,
    pub quantity: i64,
}

/// Payload of `create_order`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewOrder {
    #[serde(flatten)]
    pub client: ClientInfoInput,
    #[serde(default = "current_year")]
    #[validate(range(
        min = MIN_ORDER_YEAR,
        max = MAX_ORDER_YEAR,
        message = "year must be between 2000 and 2100"
    ))]
    pub year: i32,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<DraftItem>,
    #[serde(default)]
    pub abono: i64,
}

impl NewOrder {
    pub fn new(client: ClientInfoInput, year: i32, items: Vec<DraftItem>) -> Self {
        Self {
            client,
            year,
            delivery_date: None,
            items,
            abono: 0,
        }
    }

    pub fn with_abono(mut self, abono: i64) -> Self {
        self.abono = abono;
        self
    }

    pub fn with_delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInput {
    pub abono: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantityInput {
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadyInput {
    pub ready: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountInput {
    #[serde(default)]
    pub discounted_total: Option<i64>,
}
