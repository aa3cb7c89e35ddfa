//! Shipment record built by the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ids::OrderId;

/// Shipment artifact derived from one shipping request.
///
/// Built once per successfully processed request and never mutated. The same
/// value is written at in-transit time and again at delivered time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    pub order_id: OrderId,
    pub tracking_number: String,
    /// Simulated transit time in seconds.
    #[serde(rename = "shippingDuration")]
    pub duration_secs: u32,
    /// Destination postal code, as received.
    pub destination: String,
    pub shipped_at: DateTime<Utc>,
    #[serde(rename = "estimatedArrive")]
    pub estimated_arrival: DateTime<Utc>,
}

impl ShipmentRecord {
    pub fn new(
        order_id: OrderId,
        tracking_number: String,
        duration_secs: u32,
        destination: impl Into<String>,
        shipped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            tracking_number,
            duration_secs,
            destination: destination.into(),
            shipped_at,
            estimated_arrival: shipped_at + chrono::Duration::seconds(i64::from(duration_secs)),
        }
    }

    pub fn transit_time(&self) -> Duration {
        Duration::from_secs(u64::from(self.duration_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> ShipmentRecord {
        let shipped_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        ShipmentRecord::new(
            OrderId::new("ORD-1"),
            "TN-42-ORD-1".to_string(),
            25,
            "K1A0B1",
            shipped_at,
        )
    }

    #[test]
    fn estimated_arrival_is_shipped_at_plus_duration() {
        let record = sample();
        assert_eq!(
            record.estimated_arrival,
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 25).unwrap()
        );
        assert_eq!(record.transit_time(), Duration::from_secs(25));
    }

    #[test]
    fn serializes_with_document_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["orderId"], "ORD-1");
        assert_eq!(obj["trackingNumber"], "TN-42-ORD-1");
        assert_eq!(obj["shippingDuration"], 25);
        assert_eq!(obj["destination"], "K1A0B1");
        assert!(obj.contains_key("shippedAt"));
        assert!(obj.contains_key("estimatedArrive"));
        assert_eq!(obj.len(), 6);
    }
}
