//! State - 1 メッセージ分の処理状態
//!
//! # 状態遷移
//! - Received → Validated → ShipmentRecorded → DeliverySimulating → Delivered
//! - Received → Rejected（ペイロード不正、メッセージは abandon）
//! - Validated → Failed（ストレージ障害、メッセージは abandon）
//!
//! ShipmentRecorded 以降はメッセージ完了後の世界です。
//! Delivered の書き込みに失敗しても Failed にはせず、DeliverySimulating のまま
//! ログだけ残します（キューにはもう戻せないため）。

use std::fmt;

/// FulfillmentState は 1 メッセージ分の処理状態
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FulfillmentState {
    Received,
    Validated,
    /// in-transit の書き込みが成功し、メッセージは complete 済み
    ShipmentRecorded,
    /// 遅延タスクが待機中（または delivered 書き込みに失敗して放置）
    DeliverySimulating,
    Delivered,
    /// ペイロードが読めなかった
    Rejected { reason: String },
    /// in-transit の書き込みに失敗した
    Failed { error: String },
}

/// キューに対する最終的な扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Completed,
    Abandoned,
}

impl FulfillmentState {
    /// メッセージを complete してよい状態か
    ///
    /// in-transit の書き込みが終わるまでは complete しない（at-least-once を保つ）。
    pub fn disposition(&self) -> Option<Disposition> {
        match self {
            FulfillmentState::Received | FulfillmentState::Validated => None,
            FulfillmentState::Rejected { .. } | FulfillmentState::Failed { .. } => {
                Some(Disposition::Abandoned)
            }
            FulfillmentState::ShipmentRecorded
            | FulfillmentState::DeliverySimulating
            | FulfillmentState::Delivered => Some(Disposition::Completed),
        }
    }
}

impl fmt::Display for FulfillmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FulfillmentState::Received => write!(f, "received"),
            FulfillmentState::Validated => write!(f, "validated"),
            FulfillmentState::ShipmentRecorded => write!(f, "shipment_recorded"),
            FulfillmentState::DeliverySimulating => write!(f, "delivery_simulating"),
            FulfillmentState::Delivered => write!(f, "delivered"),
            FulfillmentState::Rejected { reason } => write!(f, "rejected: {reason}"),
            FulfillmentState::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_abandon_and_successes_complete() {
        let rejected = FulfillmentState::Rejected {
            reason: "bad json".into(),
        };
        let failed = FulfillmentState::Failed {
            error: "store down".into(),
        };

        assert_eq!(rejected.disposition(), Some(Disposition::Abandoned));
        assert_eq!(failed.disposition(), Some(Disposition::Abandoned));
        assert_eq!(
            FulfillmentState::ShipmentRecorded.disposition(),
            Some(Disposition::Completed)
        );
        assert_eq!(FulfillmentState::Validated.disposition(), None);
    }
}
