//! ShippingIngress - 出荷依頼をキューに載せる入口
//!
//! HTTP ハンドラやデモから呼ばれる。検証はデコード時の最小限だけで、
//! 注文の存在確認はしない（Worker 側で OrderNotFound を成功扱いにする）。

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{MessageId, PayloadError, QueueError, ShippingRequest};
use crate::ports::MessageSender;

/// 受付応答のステータス文言
pub const QUEUED_FOR_SHIPPING: &str = "Queued for shipping";

/// 受付応答
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressAck {
    pub status: String,
    #[serde(skip)]
    pub message_id: Option<MessageId>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngressError {
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] PayloadError),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Enqueue(#[from] QueueError),
}

/// ShippingIngress は出荷依頼をシリアライズして送る
#[derive(Clone)]
pub struct ShippingIngress {
    sender: Arc<dyn MessageSender>,
}

impl ShippingIngress {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self { sender }
    }

    pub async fn submit(&self, request: &ShippingRequest) -> Result<IngressAck, IngressError> {
        let body = request.to_vec()?;
        let message_id = self.sender.send(body).await?;

        tracing::info!(order_id = %request.order_id, message_id = %message_id, "shipping request queued");
        Ok(IngressAck {
            status: QUEUED_FOR_SHIPPING.to_string(),
            message_id: Some(message_id),
        })
    }

    /// 生のリクエストボディを検証してから送る
    pub async fn submit_bytes(&self, body: &[u8]) -> Result<IngressAck, IngressError> {
        let request = ShippingRequest::from_slice(body)?;
        self.submit(&request).await
    }
}
