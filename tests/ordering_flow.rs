mod common;

use std::time::Duration;

use campus_canteen_api::{
    dto::{
        cart::{AddToCartRequest, SetQuantityRequest},
        orders::{AdvanceOrderRequest, CheckoutRequest, RecordPaymentRequest},
    },
    entity::{Orders, food_items::ActiveModel as FoodActive},
    error::AppError,
    feed::{ChangeFilter, ChangeKind, Notification, Table},
    models::{PaymentMethod, PaymentStatus},
    order_status::OrderStatus,
    routes::params::OrderListQuery,
    services::{canteen_service, cart_service, order_service},
};
use common::Fixture;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, Set};
use uuid::Uuid;

fn add(food_item_id: Uuid, quantity: i32) -> AddToCartRequest {
    AddToCartRequest {
        food_item_id,
        quantity,
        customization: None,
    }
}

fn advance_to(status: OrderStatus) -> AdvanceOrderRequest {
    AdvanceOrderRequest { status }
}

/// Two thalis and one dosa: 250.00 before discount, 20.00 off.
async fn fill_cart(fx: &Fixture) -> anyhow::Result<()> {
    cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.thali.id, 2)).await?;
    cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.dosa.id, 1)).await?;
    Ok(())
}

#[tokio::test]
async fn adding_same_item_twice_accumulates_one_line() -> anyhow::Result<()> {
    let fx = common::fixture().await?;

    cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.dosa.id, 1)).await?;
    let line = cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.dosa.id, 1))
        .await?
        .into_data()
        .expect("cart line");
    assert_eq!(line.quantity, 2);
    assert_eq!(line.version, 2);

    let cart = cart_service::list_cart(&fx.state, &fx.customer)
        .await?
        .into_data()
        .expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_adds_collapse_into_one_line() -> anyhow::Result<()> {
    let (state, db_path) = common::setup_pooled_state(5).await?;
    let fx = common::fixture_on(state).await?;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let state = fx.state.clone();
        let session = fx.customer.clone();
        let food_item_id = fx.thali.id;
        handles.push(tokio::spawn(async move {
            cart_service::add_to_cart(&state, &session, add(food_item_id, 1)).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    let cart = cart_service::list_cart(&fx.state, &fx.customer)
        .await?
        .into_data()
        .expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 5);
    assert_eq!(cart.items[0].version, 5);

    drop(fx);
    let _ = std::fs::remove_file(db_path);
    Ok(())
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() -> anyhow::Result<()> {
    let fx = common::fixture().await?;

    let err = cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.dosa.id, 0))
        .await
        .expect_err("zero quantity");
    assert!(matches!(err, AppError::InvalidQuantity(0)));

    let line = cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.dosa.id, 1))
        .await?
        .into_data()
        .expect("cart line");
    let err = cart_service::set_quantity(
        &fx.state,
        &fx.customer,
        line.id,
        SetQuantityRequest {
            quantity: -1,
            version: None,
        },
    )
    .await
    .expect_err("negative quantity");
    assert!(matches!(err, AppError::InvalidQuantity(-1)));
    Ok(())
}

#[tokio::test]
async fn unknown_or_unavailable_items_cannot_be_added() -> anyhow::Result<()> {
    let fx = common::fixture().await?;

    let err = cart_service::add_to_cart(&fx.state, &fx.customer, add(Uuid::new_v4(), 1))
        .await
        .expect_err("unknown food");
    assert!(matches!(err, AppError::NotFound));

    let mut sold_out: FoodActive = fx.dosa.clone().into();
    sold_out.is_available = Set(false);
    sold_out.update(&fx.state.orm).await?;

    let err = cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.dosa.id, 1))
        .await
        .expect_err("unavailable food");
    assert!(matches!(err, AppError::BadRequest(_)));
    Ok(())
}

#[tokio::test]
async fn stale_version_is_a_conflict() -> anyhow::Result<()> {
    let fx = common::fixture().await?;

    let line = cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.thali.id, 1))
        .await?
        .into_data()
        .expect("cart line");

    let updated = cart_service::set_quantity(
        &fx.state,
        &fx.customer,
        line.id,
        SetQuantityRequest {
            quantity: 3,
            version: Some(line.version),
        },
    )
    .await?
    .into_data()
    .expect("cart line");
    assert_eq!(updated.quantity, 3);
    assert_eq!(updated.version, line.version + 1);

    let err = cart_service::set_quantity(
        &fx.state,
        &fx.customer,
        line.id,
        SetQuantityRequest {
            quantity: 4,
            version: Some(line.version),
        },
    )
    .await
    .expect_err("stale version");
    assert!(matches!(err, AppError::Conflict));

    let cart = cart_service::list_cart(&fx.state, &fx.customer)
        .await?
        .into_data()
        .expect("cart");
    assert_eq!(cart.items[0].quantity, 3);
    Ok(())
}

#[tokio::test]
async fn other_users_lines_are_not_found() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    let line = cart_service::add_to_cart(&fx.state, &fx.customer, add(fx.thali.id, 1))
        .await?
        .into_data()
        .expect("cart line");

    let err = cart_service::remove_from_cart(&fx.state, &fx.staff, line.id)
        .await
        .expect_err("foreign line");
    assert!(matches!(err, AppError::NotFound));

    cart_service::remove_from_cart(&fx.state, &fx.customer, line.id).await?;
    let err = cart_service::remove_from_cart(&fx.state, &fx.customer, line.id)
        .await
        .expect_err("already removed");
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn cart_view_prices_lines_and_totals() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    fill_cart(&fx).await?;

    let cart = cart_service::list_cart(&fx.state, &fx.customer)
        .await?
        .into_data()
        .expect("cart");
    assert_eq!(cart.totals.subtotal, 25000);
    assert_eq!(cart.totals.discount, 2000);
    assert_eq!(cart.totals.total, 23000);

    let thali = cart
        .items
        .iter()
        .find(|line| line.food_item.id == fx.thali.id)
        .expect("thali line");
    assert_eq!(thali.unit_price, 9000);
    assert_eq!(thali.line_total, 18000);
    Ok(())
}

#[tokio::test]
async fn checkout_places_order_and_empties_cart() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    fill_cart(&fx).await?;
    let mut cart_events = fx
        .state
        .feed
        .subscribe(ChangeFilter::table(Table::CartItems).for_user(fx.customer.user_id));

    let placed = order_service::place_order(
        &fx.state,
        &fx.customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Cash,
        },
    )
    .await?
    .into_data()
    .expect("placed order");

    let order = &placed.order;
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_method, PaymentMethod::Cash);
    assert_eq!(order.payment_status, PaymentStatus::Completed);
    assert_eq!(order.total_amount, 25000);
    assert_eq!(order.discount_amount, 2000);
    assert_eq!(order.final_amount, 23000);
    assert_eq!(order.estimated_time, 15);
    assert!(order.order_number.starts_with("MF-"));
    assert_eq!(order.order_number.len(), "MF-YYYYMMDD-".len() + 12);

    assert_eq!(placed.items.len(), 2);
    assert_eq!(Orders::find().count(&fx.state.orm).await?, 1);

    let mut prices: Vec<i64> = placed.items.iter().map(|item| item.price).collect();
    prices.sort_unstable();
    assert_eq!(prices, vec![5000, 9000]);
    let lines_sum: i64 = placed.items.iter().map(|item| item.line_total()).sum();
    assert_eq!(lines_sum, order.final_amount);

    let cart = cart_service::list_cart(&fx.state, &fx.customer)
        .await?
        .into_data()
        .expect("cart");
    assert!(cart.items.is_empty());

    match cart_events.next().await {
        Some(Notification::Change(event)) => assert_eq!(event.kind, ChangeKind::Delete),
        other => panic!("expected cart delete, got {other:?}"),
    }

    let err = order_service::place_order(
        &fx.state,
        &fx.customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Upi,
        },
    )
    .await
    .expect_err("empty cart");
    assert!(matches!(err, AppError::EmptyCart));
    Ok(())
}

#[tokio::test]
async fn placed_orders_keep_their_prices() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    fill_cart(&fx).await?;
    let placed = order_service::place_order(
        &fx.state,
        &fx.customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Card,
        },
    )
    .await?
    .into_data()
    .expect("placed order");

    let mut repriced: FoodActive = fx.thali.clone().into();
    repriced.price = Set(20000);
    repriced.discount_percentage = Set(0);
    repriced.update(&fx.state.orm).await?;

    let fetched = order_service::get_order(&fx.state, &fx.customer, placed.order.id)
        .await?
        .into_data()
        .expect("order");
    assert_eq!(fetched.order.final_amount, 23000);
    let thali = fetched
        .items
        .iter()
        .find(|item| item.food_item_id == fx.thali.id)
        .expect("thali line");
    assert_eq!(thali.price, 9000);

    let err = order_service::get_order(&fx.state, &fx.staff, placed.order.id)
        .await
        .expect_err("not the staff member's own order");
    assert!(matches!(err, AppError::NotFound));
    Ok(())
}

#[tokio::test]
async fn failed_placement_leaves_cart_untouched() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    fill_cart(&fx).await?;

    fx.state
        .orm
        .execute_unprepared("DROP TABLE order_items")
        .await?;

    let err = order_service::place_order(
        &fx.state,
        &fx.customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Cash,
        },
    )
    .await
    .expect_err("order lines cannot be written");
    assert!(matches!(err, AppError::OrderPlacementFailed(_)));

    assert_eq!(Orders::find().count(&fx.state.orm).await?, 0);
    let cart = cart_service::list_cart(&fx.state, &fx.customer)
        .await?
        .into_data()
        .expect("cart");
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.totals.total, 23000);
    Ok(())
}

#[tokio::test]
async fn staff_walk_an_order_through_its_lifecycle() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    fill_cart(&fx).await?;
    let placed = order_service::place_order(
        &fx.state,
        &fx.customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Upi,
        },
    )
    .await?
    .into_data()
    .expect("placed order");
    let order_id = placed.order.id;

    let err = canteen_service::advance_order(
        &fx.state,
        &fx.customer,
        order_id,
        advance_to(OrderStatus::Preparing),
    )
    .await
    .expect_err("customers cannot advance orders");
    assert!(matches!(err, AppError::Unauthorized));

    let err = canteen_service::advance_order(
        &fx.state,
        &fx.staff,
        order_id,
        advance_to(OrderStatus::Ready),
    )
    .await
    .expect_err("cannot skip preparing");
    assert!(matches!(
        err,
        AppError::IllegalTransition {
            from: OrderStatus::Pending,
            to: OrderStatus::Ready
        }
    ));

    let mut tracker = fx
        .state
        .feed
        .subscribe(ChangeFilter::table(Table::Orders).for_row(order_id));

    for next in [
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
    ] {
        let order = canteen_service::advance_order(&fx.state, &fx.staff, order_id, advance_to(next))
            .await?
            .into_data()
            .expect("order");
        assert_eq!(order.status, next);

        let notification = tokio::time::timeout(Duration::from_secs(1), tracker.next()).await?;
        match notification {
            Some(Notification::Change(event)) => {
                assert_eq!(event.kind, ChangeKind::Update);
                assert_eq!(event.user_id, fx.customer.user_id);
            }
            other => panic!("expected order update, got {other:?}"),
        }
    }

    let err = canteen_service::advance_order(
        &fx.state,
        &fx.staff,
        order_id,
        advance_to(OrderStatus::Cancelled),
    )
    .await
    .expect_err("completed is terminal");
    assert!(matches!(err, AppError::IllegalTransition { .. }));

    let customer_view = order_service::get_order(&fx.state, &fx.customer, order_id)
        .await?
        .into_data()
        .expect("order");
    assert_eq!(customer_view.order.status, OrderStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn staff_board_lists_summarises_and_records_payment() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    fill_cart(&fx).await?;
    let placed = order_service::place_order(
        &fx.state,
        &fx.customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Cash,
        },
    )
    .await?
    .into_data()
    .expect("placed order");

    let err = canteen_service::list_all_orders(&fx.state, &fx.customer, OrderListQuery::default())
        .await
        .expect_err("customers cannot see the board");
    assert!(matches!(err, AppError::Unauthorized));

    let board = canteen_service::list_all_orders(&fx.state, &fx.staff, OrderListQuery::default())
        .await?;
    let meta = board.meta.clone().expect("meta");
    assert_eq!(meta.total, Some(1));
    assert_eq!(board.into_data().expect("orders").items[0].id, placed.order.id);

    let ready_only = OrderListQuery {
        status: Some(OrderStatus::Ready),
        ..OrderListQuery::default()
    };
    let ready = canteen_service::list_all_orders(&fx.state, &fx.staff, ready_only)
        .await?
        .into_data()
        .expect("orders");
    assert!(ready.items.is_empty());

    let summary = canteen_service::order_summary(&fx.state, &fx.staff)
        .await?
        .into_data()
        .expect("summary");
    assert_eq!(summary.total, 1);
    let pending = summary
        .by_status
        .iter()
        .find(|entry| entry.status == OrderStatus::Pending)
        .expect("pending bucket");
    assert_eq!(pending.count, 1);

    let order = canteen_service::record_payment(
        &fx.state,
        &fx.staff,
        placed.order.id,
        RecordPaymentRequest {
            payment_status: PaymentStatus::Failed,
        },
    )
    .await?
    .into_data()
    .expect("order");
    assert_eq!(order.payment_status, PaymentStatus::Failed);
    assert_eq!(order.status, OrderStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn customers_only_list_their_own_orders() -> anyhow::Result<()> {
    let fx = common::fixture().await?;
    fill_cart(&fx).await?;
    order_service::place_order(
        &fx.state,
        &fx.customer,
        CheckoutRequest {
            payment_method: PaymentMethod::Cash,
        },
    )
    .await?;

    let mine = order_service::list_orders(&fx.state, &fx.customer, OrderListQuery::default())
        .await?
        .into_data()
        .expect("orders");
    assert_eq!(mine.items.len(), 1);

    let theirs = order_service::list_orders(&fx.state, &fx.staff, OrderListQuery::default())
        .await?
        .into_data()
        .expect("orders");
    assert!(theirs.items.is_empty());
    Ok(())
}
