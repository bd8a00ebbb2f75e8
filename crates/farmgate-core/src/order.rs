//! # Order Lifecycle
//!
//! Order numbers, the customer-facing timeline and status transitions.
//!
//! ```text
//! pending ──► processing ──► shipped ──► delivered
//!    │             │
//!    └─────┬───────┘
//!          ▼
//!      cancelled
//! ```
//!
//! Forward moves may skip stages (an admin marking a pending order shipped
//! completes `Processing` too). Cancelling does not return stock.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{Actor, OrderStatus, TimelineEvent};

impl OrderStatus {
    /// Title shown for this stage on the order timeline.
    pub fn stage_title(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Order Placed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Position on the forward path; `None` for cancelled.
    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Whether an order may move from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self.rank(), next.rank()) {
            (Some(_), None) => matches!(self, OrderStatus::Pending | OrderStatus::Processing),
            (Some(from), Some(to)) => to > from,
            (None, _) => false,
        }
    }
}

/// Forward stages in display order.
const STAGES: [OrderStatus; 4] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
];

/// Timeline for a freshly placed order: "Order Placed" completed, the rest
/// pending.
pub fn initial_timeline(placed_at: DateTime<Utc>) -> Vec<TimelineEvent> {
    STAGES
        .iter()
        .map(|stage| {
            let placed = *stage == OrderStatus::Pending;
            TimelineEvent {
                status: *stage,
                title: stage.stage_title().to_string(),
                completed: placed,
                timestamp: placed.then_some(placed_at),
            }
        })
        .collect()
}

/// Moves `timeline` from `current` to `next`, returning the updated copy.
///
/// Forward moves complete every stage up to `next`; cancellation appends a
/// completed "Cancelled" event.
pub fn advance_timeline(
    timeline: &[TimelineEvent],
    current: OrderStatus,
    next: OrderStatus,
    at: DateTime<Utc>,
) -> CoreResult<Vec<TimelineEvent>> {
    if !current.can_transition_to(next) {
        return Err(CoreError::InvalidTransition {
            from: current,
            to: next,
        });
    }

    let mut updated = timeline.to_vec();
    match next.rank() {
        Some(target) => {
            for event in updated.iter_mut() {
                let reached = event.status.rank().is_some_and(|rank| rank <= target);
                if reached && !event.completed {
                    event.completed = true;
                    event.timestamp = Some(at);
                }
            }
        }
        None => updated.push(TimelineEvent {
            status: OrderStatus::Cancelled,
            title: OrderStatus::Cancelled.stage_title().to_string(),
            completed: true,
            timestamp: Some(at),
        }),
    }

    Ok(updated)
}

/// Only admins move orders along.
pub fn ensure_can_manage_orders(actor: &Actor) -> CoreResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(CoreError::Forbidden {
            action: "update order status".to_string(),
        })
    }
}

/// Builds a human-readable order number: `FG-YYMMDD-HHMMSS-NNNN`.
///
/// `entropy` supplies the random suffix; uniqueness is finally enforced by
/// the database.
pub fn generate_order_number(now: DateTime<Utc>, entropy: u32) -> String {
    format!("FG-{}-{:04}", now.format("%y%m%d-%H%M%S"), entropy % 10_000)
}
