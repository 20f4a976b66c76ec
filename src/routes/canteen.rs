use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        AdvanceOrderRequest, OrderList, OrderSummary, OrderWithItems, RecordPaymentRequest,
    },
    error::AppResult,
    feed::{ChangeFilter, Table},
    middleware::auth::Session,
    models::Order,
    response::ApiResponse,
    routes::{events::sse_from, params::OrderListQuery},
    services::canteen_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/summary", get(order_summary))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/status", patch(advance_order))
        .route("/orders/{id}/payment", patch(record_payment))
        .route("/events", get(board_events))
}

#[utoipa::path(
    get,
    path = "/api/canteen/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
        (status = 200, description = "All orders (canteen staff only)", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Canteen"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = canteen_service::list_all_orders(&state, &session, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/canteen/orders/summary",
    responses(
        (status = 200, description = "Order counts per status", body = ApiResponse<OrderSummary>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Canteen"
)]
pub async fn order_summary(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    let resp = canteen_service::order_summary(&state, &session).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/canteen/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Any order with its lines", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Canteen"
)]
pub async fn get_order(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = canteen_service::get_order(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/canteen/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = AdvanceOrderRequest,
    responses(
        (status = 200, description = "Order advanced", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed from the current status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Canteen"
)]
pub async fn advance_order(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = canteen_service::advance_order(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/canteen/orders/{id}/payment",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = RecordPaymentRequest,
    responses(
        (status = 200, description = "Payment status recorded", body = ApiResponse<Order>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Canteen"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = canteen_service::record_payment(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/canteen/events",
    responses(
        (status = 200, description = "Server-sent change events for every order", body = String, content_type = "text/event-stream"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Canteen"
)]
pub async fn board_events(State(state): State<AppState>, session: Session) -> AppResult<Response> {
    session.require_staff()?;
    let filter = ChangeFilter::table(Table::Orders);
    Ok(sse_from(state.feed.subscribe(filter)).into_response())
}
