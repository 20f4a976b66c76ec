use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    order_status::OrderStatus,
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Missing or invalid credentials")]
    Unauthenticated,

    #[error("Canteen staff only")]
    Unauthorized,

    #[error("Cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Cart line was modified concurrently")]
    Conflict,

    #[error("Order placement failed")]
    OrderPlacementFailed(#[source] sea_orm::DbErr),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::InvalidQuantity(_) | AppError::EmptyCart => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::IllegalTransition { .. } | AppError::Conflict => StatusCode::CONFLICT,
            AppError::OrderPlacementFailed(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
