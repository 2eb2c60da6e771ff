use crate::entities::gift_entity as gifts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// 礼物留言长度上限（字符数）
pub const MAX_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiftResponse {
    pub id: Uuid,
    pub image_url: String,
    pub message: Option<String>,
    pub user_id: String,
    pub received_by: Option<String>,
    pub received_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<gifts::Model> for GiftResponse {
    fn from(model: gifts::Model) -> Self {
        Self {
            id: model.id,
            image_url: model.image_url,
            message: model.message,
            user_id: model.user_id,
            received_by: model.received_by,
            received_at: model.received_at,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadGiftResponse {
    /// 本次上传创建的礼物
    pub gift: GiftResponse,
    /// 上传附带的回礼抽取结果（best-effort，可能为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_gift: Option<GiftResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawRequest {
    pub client_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawStats {
    /// 用户累计上传数
    pub user_gifts: i64,
    /// 本次抽取后剩余次数
    pub remaining_draws: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DrawGiftResponse {
    pub gift: GiftResponse,
    pub stats: DrawStats,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiftListQuery {
    pub client_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiftHistoryResponse {
    pub received: Vec<GiftResponse>,
    pub sent: Vec<GiftResponse>,
}
