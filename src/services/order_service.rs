use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    feed::{ChangeEvent, ChangeKind, Table},
    middleware::auth::Session,
    models::{Order, OrderItem, PaymentMethod, PaymentStatus},
    order_status::OrderStatus,
    pricing::{self, PricedLine},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::cart_service,
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    session: &Session,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(session.user_id));
    let (orders, meta) = find_orders(&state.orm, condition, query).await?;
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    session: &Session,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(session.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let data = with_items(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Turn the session user's cart into an order.
///
/// Order row, order lines and the cart wipe commit together or not at all.
pub async fn place_order(
    state: &AppState,
    session: &Session,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let result = place_order_txn(state, session, payload.payment_method).await;
    let (placed, cleared_lines) = match result {
        Ok(placed) => placed,
        Err(AppError::OrmError(err)) => {
            tracing::error!(
                error = %err,
                user_id = %session.user_id,
                "order placement failed, transaction rolled back"
            );
            return Err(AppError::OrderPlacementFailed(err));
        }
        Err(err) => return Err(err),
    };

    tracing::info!(
        order_id = %placed.order.id,
        order_number = %placed.order.order_number,
        final_amount = %pricing::format_amount(placed.order.final_amount),
        lines = placed.items.len(),
        "order placed"
    );

    state.feed.publish(ChangeEvent::new(
        Table::Orders,
        ChangeKind::Insert,
        placed.order.id,
        session.user_id,
    ));
    for line_id in cleared_lines {
        state.feed.publish(ChangeEvent::new(
            Table::CartItems,
            ChangeKind::Delete,
            line_id,
            session.user_id,
        ));
    }
    audit::record(
        &state.orm,
        session.user_id,
        "checkout",
        "orders",
        serde_json::json!({
            "order_id": placed.order.id,
            "order_number": placed.order.order_number,
            "final_amount": placed.order.final_amount,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order placed",
        placed,
        Some(Meta::empty()),
    ))
}

async fn place_order_txn(
    state: &AppState,
    session: &Session,
    payment_method: PaymentMethod,
) -> AppResult<(OrderWithItems, Vec<Uuid>)> {
    let txn = state.orm.begin().await?;

    let lines = cart_service::load_cart_lines(&txn, session.user_id, true).await?;
    if lines.is_empty() {
        return Err(AppError::EmptyCart);
    }
    if let Some(line) = lines.iter().find(|line| !line.food.is_available) {
        return Err(AppError::BadRequest(format!(
            "{} is no longer available",
            line.food.name
        )));
    }

    let totals = pricing::cart_totals(&lines);
    let now: DateTimeWithTimeZone = Utc::now().into();
    let order_id = Uuid::new_v4();

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(session.user_id),
        order_number: Set(build_order_number(order_id, now.with_timezone(&Utc))),
        total_amount: Set(totals.subtotal),
        discount_amount: Set(totals.discount),
        final_amount: Set(totals.total),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_method: Set(payment_method.as_str().to_string()),
        // Payment is settled at the counter or upstream; there is no
        // authorization step here.
        payment_status: Set(PaymentStatus::Completed.as_str().to_string()),
        estimated_time: Set(state.config.estimated_prep_minutes),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            food_item_id: Set(line.item.food_item_id),
            quantity: Set(line.item.quantity),
            price: Set(pricing::discounted_unit_price(
                line.base_price(),
                line.discount_percentage(),
            )),
            customization: Set(line.item.customization.clone()),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    let cleared = cart_service::clear_cart(&txn, session.user_id).await?;
    if cleared != lines.len() as u64 {
        // A line was added after the snapshot was locked.
        return Err(DbErr::Custom("cart changed during checkout".into()).into());
    }

    txn.commit().await?;

    let placed = OrderWithItems {
        order: Order::try_from(order)?,
        items,
    };
    Ok((placed, lines.into_iter().map(|line| line.item.id).collect()))
}

/// `MF-YYYYMMDD-XXXXXXXXXXXX`: placement date plus 48 random bits of the
/// order id. The unique index on `order_number` rejects the rare collision.
pub fn build_order_number(order_id: Uuid, placed_at: DateTime<Utc>) -> String {
    let date = placed_at.format("%Y%m%d");
    let hex = order_id.simple().to_string().to_uppercase();
    format!("MF-{}-{}", date, &hex[..12])
}

pub(crate) async fn find_orders<C: ConnectionTrait>(
    conn: &C,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<(Vec<Order>, Meta)> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(conn).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(conn)
        .await?
        .into_iter()
        .map(Order::try_from)
        .collect::<AppResult<Vec<_>>>()?;

    Ok((orders, Meta::new(page, limit, total)))
}

pub(crate) async fn with_items<C: ConnectionTrait>(
    conn: &C,
    order: orders::Model,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(OrderWithItems {
        order: Order::try_from(order)?,
        items,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn order_number_is_dated_and_derived_from_id() {
        let id = Uuid::parse_str("3f2a9c1e-77b0-4d2e-9a41-0c5e8f7d6b12").expect("uuid");
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap();
        assert_eq!(build_order_number(id, at), "MF-20261015-3F2A9C1E77B0");
    }
}
