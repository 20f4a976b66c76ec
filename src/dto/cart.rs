use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::FoodItem,
    pricing::CartTotals,
};

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub food_item_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Only used when the line is created; ignored on increment.
    #[serde(default)]
    pub customization: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetQuantityRequest {
    pub quantity: i32,
    /// Version last read by the client. When present the update only applies
    /// if the line has not changed since.
    #[serde(default)]
    pub version: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub id: Uuid,
    pub food_item: FoodItem,
    pub quantity: i32,
    pub customization: serde_json::Value,
    pub version: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CartLineDto>,
    pub totals: CartTotals,
}
