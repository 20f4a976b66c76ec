use chrono::Utc;
use sea_orm::entity::prelude::DateTimeWithTimeZone;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
    sea_query::{Expr, LockType, OnConflict},
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartLineDto, CartView, SetQuantityRequest},
    entity::{
        cart_items::{self, ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        food_items::{self, Column as FoodCol, Entity as FoodItems},
    },
    error::{AppError, AppResult},
    feed::{ChangeEvent, ChangeKind, Table},
    middleware::auth::Session,
    models::{CartItem, CartLine},
    pricing::{self, PricedLine},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_cart(state: &AppState, session: &Session) -> AppResult<ApiResponse<CartView>> {
    let lines = load_cart_lines(&state.orm, session.user_id, false).await?;
    let totals = pricing::cart_totals(&lines);

    let items: Vec<CartLineDto> = lines
        .into_iter()
        .map(|line| {
            let unit_price =
                pricing::discounted_unit_price(line.base_price(), line.discount_percentage());
            let line_total = pricing::line_total(&line);
            CartLineDto {
                id: line.item.id,
                quantity: line.item.quantity,
                customization: line.item.customization,
                version: line.item.version,
                food_item: line.food.into(),
                unit_price,
                line_total,
            }
        })
        .collect();

    let meta = Meta::count(items.len());
    Ok(ApiResponse::success("OK", CartView { items, totals }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    session: &Session,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity < 1 {
        return Err(AppError::InvalidQuantity(payload.quantity));
    }

    let food = FoodItems::find_by_id(payload.food_item_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !food.is_available {
        return Err(AppError::BadRequest(format!("{} is not available", food.name)));
    }

    // Single statement: a first add inserts, a repeat add increments in place,
    // so racing adds for the same item cannot lose updates or collide.
    let now: DateTimeWithTimeZone = Utc::now().into();
    let new_id = Uuid::new_v4();
    let line = CartActive {
        id: Set(new_id),
        user_id: Set(session.user_id),
        food_item_id: Set(payload.food_item_id),
        quantity: Set(payload.quantity),
        customization: Set(payload
            .customization
            .unwrap_or_else(|| serde_json::json!({}))),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    };
    CartItems::insert(line)
        .on_conflict(
            OnConflict::columns([CartCol::UserId, CartCol::FoodItemId])
                .value(
                    CartCol::Quantity,
                    Expr::col((CartItems, CartCol::Quantity)).add(payload.quantity),
                )
                .value(
                    CartCol::Version,
                    Expr::col((CartItems, CartCol::Version)).add(1),
                )
                .value(CartCol::UpdatedAt, Expr::value(now))
                .to_owned(),
        )
        .exec_without_returning(&state.orm)
        .await?;

    let cart_item = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::UserId.eq(session.user_id))
                .add(CartCol::FoodItemId.eq(payload.food_item_id)),
        )
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    let kind = if cart_item.id == new_id {
        ChangeKind::Insert
    } else {
        ChangeKind::Update
    };

    state.feed.publish(ChangeEvent::new(
        Table::CartItems,
        kind,
        cart_item.id,
        session.user_id,
    ));
    audit::record(
        &state.orm,
        session.user_id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "food_item_id": payload.food_item_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", cart_item.into(), None))
}

pub async fn set_quantity(
    state: &AppState,
    session: &Session,
    cart_item_id: Uuid,
    payload: SetQuantityRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity < 1 {
        return Err(AppError::InvalidQuantity(payload.quantity));
    }

    let mut condition = Condition::all()
        .add(CartCol::Id.eq(cart_item_id))
        .add(CartCol::UserId.eq(session.user_id));
    if let Some(version) = payload.version {
        condition = condition.add(CartCol::Version.eq(version));
    }

    let now: DateTimeWithTimeZone = Utc::now().into();
    let result = CartItems::update_many()
        .col_expr(CartCol::Quantity, Expr::value(payload.quantity))
        .col_expr(CartCol::Version, Expr::col(CartCol::Version).add(1))
        .col_expr(CartCol::UpdatedAt, Expr::value(now))
        .filter(condition)
        .exec(&state.orm)
        .await?;

    let current = find_own_line(&state.orm, session.user_id, cart_item_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if result.rows_affected == 0 {
        // The line exists, so the version guard is what rejected the write.
        return Err(AppError::Conflict);
    }

    state.feed.publish(ChangeEvent::new(
        Table::CartItems,
        ChangeKind::Update,
        current.id,
        session.user_id,
    ));
    audit::record(
        &state.orm,
        session.user_id,
        "cart_set_quantity",
        "cart_items",
        serde_json::json!({ "cart_item_id": cart_item_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", current.into(), None))
}

pub async fn remove_from_cart(
    state: &AppState,
    session: &Session,
    cart_item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = CartItems::delete_many()
        .filter(
            Condition::all()
                .add(CartCol::Id.eq(cart_item_id))
                .add(CartCol::UserId.eq(session.user_id)),
        )
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    state.feed.publish(ChangeEvent::new(
        Table::CartItems,
        ChangeKind::Delete,
        cart_item_id,
        session.user_id,
    ));
    audit::record(
        &state.orm,
        session.user_id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "cart_item_id": cart_item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Cart lines of `user_id` joined with their food items, oldest first.
///
/// With `lock` the cart rows are selected `FOR UPDATE`; only meaningful
/// inside a transaction.
pub(crate) async fn load_cart_lines<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    lock: bool,
) -> AppResult<Vec<CartLine>> {
    let mut finder = CartItems::find()
        .filter(CartCol::UserId.eq(user_id))
        .order_by_asc(CartCol::CreatedAt)
        .order_by_asc(CartCol::Id);
    if lock {
        finder = finder.lock(LockType::Update);
    }
    let items = finder.all(conn).await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let food_ids: Vec<Uuid> = items.iter().map(|item| item.food_item_id).collect();
    let mut foods: HashMap<Uuid, food_items::Model> = FoodItems::find()
        .filter(FoodCol::Id.is_in(food_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|food| (food.id, food))
        .collect();

    items
        .into_iter()
        .map(|item| {
            let food = foods
                .remove(&item.food_item_id)
                .ok_or(AppError::NotFound)?;
            Ok(CartLine { item, food })
        })
        .collect()
}

/// Delete every cart line of `user_id`. Runs inside the checkout transaction.
pub(crate) async fn clear_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<u64> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

async fn find_own_line<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    cart_item_id: Uuid,
) -> AppResult<Option<cart_items::Model>> {
    let line = CartItems::find()
        .filter(
            Condition::all()
                .add(CartCol::Id.eq(cart_item_id))
                .add(CartCol::UserId.eq(user_id)),
        )
        .one(conn)
        .await?;
    Ok(line)
}
