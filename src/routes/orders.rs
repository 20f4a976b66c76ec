use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems},
    error::AppResult,
    feed::{ChangeFilter, Table},
    middleware::auth::Session,
    response::ApiResponse,
    routes::{events::sse_from, params::OrderListQuery},
    services::order_service,
    state::AppState,
};

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/events", get(order_events))
        .route("/{id}", get(get_order))
        .route("/{id}/events", get(single_order_events))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "Orders placed by the caller", body = ApiResponse<OrderList>),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed from the cart", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Cart is empty or holds an unavailable item"),
        (status = 500, description = "Order placement failed, nothing was written"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::place_order(&state, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with its lines", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/events",
    responses(
        (status = 200, description = "Server-sent change events for the caller's orders", body = String, content_type = "text/event-stream"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn order_events(State(state): State<AppState>, session: Session) -> Response {
    let filter = ChangeFilter::table(Table::Orders).for_user(session.user_id);
    sse_from(state.feed.subscribe(filter)).into_response()
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/events",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Server-sent status changes of one order", body = String, content_type = "text/event-stream"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn single_order_events(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Response {
    // The user filter keeps other customers' orders private.
    let filter = ChangeFilter::table(Table::Orders)
        .for_user(session.user_id)
        .for_row(id);
    sse_from(state.feed.subscribe(filter)).into_response()
}
