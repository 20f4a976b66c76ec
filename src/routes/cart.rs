use axum::{
    Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, SetQuantityRequest},
    error::AppResult,
    feed::{ChangeFilter, Table},
    middleware::auth::Session,
    models::CartItem,
    response::ApiResponse,
    routes::events::sse_from,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart))
        .route("/events", get(cart_events))
        .route("/{id}", patch(set_quantity).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart lines with prices and totals", body = ApiResponse<CartView>),
        (status = 401, description = "Unauthenticated"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::list_cart(&state, &session).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Add item or increment its quantity", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid quantity or unavailable item"),
        (status = 404, description = "Food item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::add_to_cart(&state, &session, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/cart/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart line ID")
    ),
    request_body = SetQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<CartItem>),
        (status = 400, description = "Quantity below 1"),
        (status = 404, description = "Cart line not found"),
        (status = 409, description = "Stale version"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn set_quantity(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetQuantityRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let resp = cart_service::set_quantity(&state, &session, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{id}",
    params(
        ("id" = Uuid, Path, description = "Cart line ID")
    ),
    responses(
        (status = 200, description = "Line removed"),
        (status = 404, description = "Cart line not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = cart_service::remove_from_cart(&state, &session, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/cart/events",
    responses(
        (status = 200, description = "Server-sent change events for the caller's cart", body = String, content_type = "text/event-stream"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_events(State(state): State<AppState>, session: Session) -> Response {
    let filter = ChangeFilter::table(Table::CartItems).for_user(session.user_id);
    sse_from(state.feed.subscribe(filter)).into_response()
}
