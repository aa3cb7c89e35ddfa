//! Order status vocabulary.
//!
//! Orders are owned by the order service; this crate only ever sets the
//! status field and the embedded shipment. On the wire the status is an integer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status as stored in the order document.
///
/// Wire codes:
/// - 0: Pending (placed, not yet handed to shipping)
/// - 1: Queued (shipping request accepted)
/// - 2: InTransit
/// - 3: Delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    Pending,
    Queued,
    InTransit,
    Delivered,
}

impl OrderStatus {
    pub fn code(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Queued => 1,
            OrderStatus::InTransit => 2,
            OrderStatus::Delivered => 3,
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = UnknownStatusCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OrderStatus::Pending),
            1 => Ok(OrderStatus::Queued),
            2 => Ok(OrderStatus::InTransit),
            3 => Ok(OrderStatus::Delivered),
            other => Err(UnknownStatusCode(other)),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Queued => "queued",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status code: {0}")]
pub struct UnknownStatusCode(pub u8);
