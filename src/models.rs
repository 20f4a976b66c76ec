use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{cart_items, food_items, order_items, orders},
    error::{AppError, AppResult},
    order_status::OrderStatus,
    pricing::PricedLine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Canteen,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Canteen => "canteen",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "canteen" => Ok(Role::Canteen),
            other => Err(AppError::BadRequest(format!("unknown role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Upi,
    Card,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Upi => "upi",
            PaymentMethod::Card => "card",
            PaymentMethod::Cash => "cash",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upi" => Ok(PaymentMethod::Upi),
            "card" => Ok(PaymentMethod::Card),
            "cash" => Ok(PaymentMethod::Cash),
            other => Err(AppError::BadRequest(format!("unknown payment method '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(AppError::BadRequest(format!("unknown payment status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FoodItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Uuid,
    pub price: i64,
    pub image_url: Option<String>,
    pub is_available: bool,
    pub discount_percentage: i32,
    pub is_combo: bool,
    pub is_customizable: bool,
    pub tags: serde_json::Value,
}

impl From<food_items::Model> for FoodItem {
    fn from(model: food_items::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category_id: model.category_id,
            price: model.price,
            image_url: model.image_url,
            is_available: model.is_available,
            discount_percentage: model.discount_percentage,
            is_combo: model.is_combo,
            is_customizable: model.is_customizable,
            tags: model.tags,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub food_item_id: Uuid,
    pub quantity: i32,
    pub customization: serde_json::Value,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<cart_items::Model> for CartItem {
    fn from(model: cart_items::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            food_item_id: model.food_item_id,
            quantity: model.quantity,
            customization: model.customization,
            version: model.version,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// A cart line joined with the food item it refers to.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: cart_items::Model,
    pub food: food_items::Model,
}

impl PricedLine for CartLine {
    fn base_price(&self) -> i64 {
        self.food.price
    }

    fn discount_percentage(&self) -> i32 {
        self.food.discount_percentage
    }

    fn quantity(&self) -> i32 {
        self.item.quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_number: String,
    pub total_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub estimated_time: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<orders::Model> for Order {
    type Error = AppError;

    fn try_from(model: orders::Model) -> AppResult<Self> {
        let corrupt = |field: &str, value: &str| {
            AppError::Internal(anyhow::anyhow!(
                "order {} has invalid {field} '{value}'",
                model.id
            ))
        };
        let status = model
            .status
            .parse()
            .map_err(|_| corrupt("status", &model.status))?;
        let payment_method = model
            .payment_method
            .parse()
            .map_err(|_| corrupt("payment_method", &model.payment_method))?;
        let payment_status = model
            .payment_status
            .parse()
            .map_err(|_| corrupt("payment_status", &model.payment_status))?;

        Ok(Self {
            id: model.id,
            user_id: model.user_id,
            order_number: model.order_number,
            total_amount: model.total_amount,
            discount_amount: model.discount_amount,
            final_amount: model.final_amount,
            status,
            payment_method,
            payment_status,
            estimated_time: model.estimated_time,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub food_item_id: Uuid,
    pub quantity: i32,
    /// Unit price paid, after discount.
    pub price: i64,
    pub customization: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> i64 {
        self.price * i64::from(self.quantity)
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            food_item_id: model.food_item_id,
            quantity: model.quantity,
            price: model.price,
            customization: model.customization,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
