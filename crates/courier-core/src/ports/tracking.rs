//! TrackingNumberGenerator port - 追跡番号の生成
//!
//! 追跡番号は `TN-<乱数>-<orderId>` 形式です。
//! 乱数部分は 0..9999 なので、同じ注文で衝突する可能性はゼロではありません（許容）。

use rand::Rng;

use crate::domain::OrderId;

/// 追跡番号の接頭辞
pub const TRACKING_PREFIX: &str = "TN";

/// 乱数部分の上限（排他的）
pub const TRACKING_RANDOM_BOUND: u32 = 9999;

/// TrackingNumberGenerator は注文に追跡番号を割り当てる
///
/// # Thread Safety
/// - `Send + Sync` を要求（Worker と遅延タスクの両方から参照される）
pub trait TrackingNumberGenerator: Send + Sync {
    fn generate(&self, order_id: &OrderId) -> String;
}

/// 本番用：スレッドローカル RNG を使う
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTrackingNumbers;

impl TrackingNumberGenerator for RandomTrackingNumbers {
    fn generate(&self, order_id: &OrderId) -> String {
        let n = rand::thread_rng().gen_range(0..TRACKING_RANDOM_BOUND);
        format_tracking_number(n, order_id)
    }
}

/// 追跡番号の書式
pub fn format_tracking_number(n: u32, order_id: &OrderId) -> String {
    format!("{TRACKING_PREFIX}-{n}-{order_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_number_has_prefix_number_and_order_id() {
        let order_id = OrderId::new("ORD-1");
        let tracking = RandomTrackingNumbers.generate(&order_id);

        let rest = tracking.strip_prefix("TN-").unwrap();
        let (n, suffix) = rest.split_once('-').unwrap();
        assert_eq!(suffix, "ORD-1");
        let n: u32 = n.parse().unwrap();
        assert!(n < TRACKING_RANDOM_BOUND);
    }

    #[test]
    fn format_is_stable() {
        assert_eq!(format_tracking_number(42, &OrderId::new("A")), "TN-42-A");
    }
}
