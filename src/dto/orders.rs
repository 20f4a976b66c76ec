use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Order, OrderItem, PaymentMethod, PaymentStatus},
    order_status::OrderStatus,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceOrderRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummary {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}
