use chrono::Utc;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{
        AdvanceOrderRequest, OrderList, OrderSummary, OrderWithItems, RecordPaymentRequest,
        StatusCount,
    },
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    feed::{ChangeEvent, ChangeKind, Table},
    middleware::auth::Session,
    models::Order,
    order_status::OrderStatus,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service::{find_orders, with_items},
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    session: &Session,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    session.require_staff()?;
    let (orders, meta) = find_orders(&state.orm, Condition::all(), query).await?;
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    session.require_staff()?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

pub async fn order_summary(
    state: &AppState,
    session: &Session,
) -> AppResult<ApiResponse<OrderSummary>> {
    session.require_staff()?;

    let mut by_status = Vec::with_capacity(OrderStatus::ALL.len());
    let mut total = 0;
    for status in OrderStatus::ALL {
        let count = Orders::find()
            .filter(OrderCol::Status.eq(status.as_str()))
            .count(&state.orm)
            .await? as i64;
        total += count;
        by_status.push(StatusCount { status, count });
    }

    Ok(ApiResponse::success(
        "Summary",
        OrderSummary { total, by_status },
        Some(Meta::empty()),
    ))
}

/// Move an order one step along the fulfillment pipeline.
pub async fn advance_order(
    state: &AppState,
    session: &Session,
    id: Uuid,
    payload: AdvanceOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    session.require_staff()?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let current: OrderStatus = existing.status.parse()?;
    let next = current.advance(payload.status)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut active: OrderActive = existing.into();
    active.status = Set(next.as_str().to_string());
    active.updated_at = Set(now);
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, from = %current, to = %next, "order advanced");
    state.feed.publish(ChangeEvent::new(
        Table::Orders,
        ChangeKind::Update,
        order.id,
        order.user_id,
    ));
    audit::record(
        &state.orm,
        session.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "from": current, "to": next }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        Order::try_from(order)?,
        Some(Meta::empty()),
    ))
}

pub async fn record_payment(
    state: &AppState,
    session: &Session,
    id: Uuid,
    payload: RecordPaymentRequest,
) -> AppResult<ApiResponse<Order>> {
    session.require_staff()?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let now: DateTimeWithTimeZone = Utc::now().into();
    let mut active: OrderActive = existing.into();
    active.payment_status = Set(payload.payment_status.as_str().to_string());
    active.updated_at = Set(now);
    let order = active.update(&state.orm).await?;

    state.feed.publish(ChangeEvent::new(
        Table::Orders,
        ChangeKind::Update,
        order.id,
        order.user_id,
    ));
    audit::record(
        &state.orm,
        session.user_id,
        "order_payment_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "payment_status": payload.payment_status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment recorded",
        Order::try_from(order)?,
        Some(Meta::empty()),
    ))
}
