use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses staff may move an order to from `self`.
    ///
    /// `confirmed` is never entered by `advance`; rows that carry it follow
    /// the same exits as `pending`.
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        match self {
            OrderStatus::Pending | OrderStatus::Confirmed => {
                &[OrderStatus::Preparing, OrderStatus::Cancelled]
            }
            OrderStatus::Preparing => &[OrderStatus::Ready, OrderStatus::Cancelled],
            OrderStatus::Ready => &[OrderStatus::Completed],
            OrderStatus::Completed | OrderStatus::Cancelled => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn advance(self, next: OrderStatus) -> AppResult<OrderStatus> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(AppError::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("unknown order status '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OrderStatus::*;

    #[test]
    fn happy_path_reaches_completed() {
        let mut status = Pending;
        for next in [Preparing, Ready, Completed] {
            status = status.advance(next).expect("legal step");
        }
        assert_eq!(status, Completed);
        assert!(status.is_terminal());
    }

    #[test]
    fn cancel_only_from_pending_or_preparing() {
        assert!(Pending.can_advance_to(Cancelled));
        assert!(Preparing.can_advance_to(Cancelled));
        assert!(!Ready.can_advance_to(Cancelled));
        assert!(!Completed.can_advance_to(Cancelled));
    }

    #[test]
    fn no_backward_or_skipping_moves() {
        assert!(matches!(
            Ready.advance(Pending),
            Err(AppError::IllegalTransition {
                from: Ready,
                to: Pending
            })
        ));
        assert!(Pending.advance(Ready).is_err());
        assert!(Pending.advance(Completed).is_err());
        assert!(Preparing.advance(Preparing).is_err());
    }

    #[test]
    fn terminal_states_reject_everything() {
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in OrderStatus::ALL {
                assert!(from.advance(to).is_err(), "{from} -> {to} should fail");
            }
        }
    }

    #[test]
    fn parses_storage_strings() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().ok(), Some(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
