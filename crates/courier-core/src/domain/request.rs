//! ShippingRequest - キューに載る作業単位
//!
//! Ingress が受け付けた JSON をそのままキューに流し、Worker が取り出して
//! デシリアライズします。キューに載った後は不変です。

use serde::{Deserialize, Serialize};

use super::ids::OrderId;
use super::order::OrderStatus;

/// ShippingRequest は 1 注文分の出荷依頼
///
/// # JSON 形式
/// ```json
/// {
///   "orderId": "ORD-1",
///   "shipping": { "address1": "...", "city": "...", "province": "...", "postalCode": "K1A0B1", "country": "CA" },
///   "status": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRequest {
    pub order_id: OrderId,
    #[serde(default)]
    pub shipping: ShippingInfo,
    /// 依頼時点のステータス（参照しないのでそのまま運ぶ）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
}

/// 配送先住所
///
/// コアが意味を持たせるのは `postal_code` だけです。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingInfo {
    pub address1: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

/// PayloadError はメッセージ本文を ShippingRequest にできなかった理由
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed shipping request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("shipping request has an empty orderId")]
    MissingOrderId,
}

impl ShippingRequest {
    pub fn new(order_id: impl Into<OrderId>, shipping: ShippingInfo) -> Self {
        Self {
            order_id: order_id.into(),
            shipping,
            status: Some(i64::from(OrderStatus::Queued.code())),
        }
    }

    /// キューの本文（JSON bytes）から復元
    ///
    /// `orderId` が空文字の場合も不正なペイロードとして扱います。
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        let request: ShippingRequest = serde_json::from_slice(body)?;
        if request.order_id.is_empty() {
            return Err(PayloadError::MissingOrderId);
        }
        Ok(request)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn postal_code(&self) -> &str {
        &self.shipping.postal_code
    }
}

impl ShippingInfo {
    /// 郵便番号だけを持つ住所（テストやデモ用）
    pub fn with_postal_code(postal_code: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_camel_case_payload() {
        let body = br#"{
            "orderId": "ORD-1",
            "shipping": {
                "address1": "80 Wellington St",
                "city": "Ottawa",
                "province": "ON",
                "postalCode": "K1A 0B1",
                "country": "CA"
            },
            "status": 1
        }"#;

        let request = ShippingRequest::from_slice(body).unwrap();
        assert_eq!(request.order_id.as_str(), "ORD-1");
        assert_eq!(request.postal_code(), "K1A 0B1");
        assert_eq!(request.shipping.city, "Ottawa");
        assert_eq!(request.status, Some(1));
    }

    #[test]
    fn missing_address_fields_default_to_empty() {
        let request = ShippingRequest::from_slice(br#"{"orderId":"ORD-2"}"#).unwrap();
        assert_eq!(request.postal_code(), "");
        assert_eq!(request.status, None);
    }

    #[rstest]
    #[case::unknown_code(r#"4"#, Some(4))]
    #[case::negative(r#"-1"#, Some(-1))]
    #[case::null(r#"null"#, None)]
    fn status_is_carried_without_validation(#[case] status: &str, #[case] expected: Option<i64>) {
        let body = format!(r#"{{"orderId":"ORD-1","status":{status}}}"#);
        let request = ShippingRequest::from_slice(body.as_bytes()).unwrap();
        assert_eq!(request.status, expected);
    }

    #[test]
    fn rejects_non_json_body() {
        let err = ShippingRequest::from_slice(b"not json").unwrap_err();
        assert!(matches!(err, PayloadError::Malformed(_)));
    }

    #[test]
    fn rejects_missing_or_empty_order_id() {
        assert!(matches!(
            ShippingRequest::from_slice(br#"{"shipping":{}}"#),
            Err(PayloadError::Malformed(_))
        ));
        assert!(matches!(
            ShippingRequest::from_slice(br#"{"orderId":""}"#),
            Err(PayloadError::MissingOrderId)
        ));
    }

    #[test]
    fn serializes_back_to_same_shape() {
        let request = ShippingRequest::new("ORD-3", ShippingInfo::with_postal_code("M5V"));
        let body = request.to_vec().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["orderId"], "ORD-3");
        assert_eq!(json["shipping"]["postalCode"], "M5V");
        assert_eq!(json["status"], 1);
    }
}
