use crate::error::{AppError, AppResult};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use utoipa::ToSchema;

type HmacSha256 = Hmac<Sha256>;

/// 令牌有效期 5 分钟
const TOKEN_MAX_AGE_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadToken {
    /// 签发时间（毫秒时间戳）
    pub timestamp: i64,
    /// HMAC-SHA256(secret, timestamp) 的 hex 编码
    pub signature: String,
}

/// 上传令牌签发 / 校验。
/// 对毫秒时间戳做 HMAC-SHA256 签名，校验时同时检查签名与时效。
#[derive(Clone)]
pub struct UploadTokenService {
    secret: String,
}

impl UploadTokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    pub fn issue(&self) -> AppResult<UploadToken> {
        let timestamp = Utc::now().timestamp_millis();
        let signature = self.sign(timestamp)?;
        Ok(UploadToken {
            timestamp,
            signature,
        })
    }

    pub fn sign(&self, timestamp: i64) -> AppResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::InternalError(format!("HMAC init failed: {e}")))?;
        mac.update(timestamp.to_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 校验失败返回 AuthError（签名不符 / 已过期 / 时间戳异常）
    pub fn verify(&self, timestamp: i64, signature: &str) -> AppResult<()> {
        let raw = hex::decode(signature)
            .map_err(|_| AppError::AuthError("Malformed upload token signature".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AppError::InternalError(format!("HMAC init failed: {e}")))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.verify_slice(&raw)
            .map_err(|_| AppError::AuthError("Invalid upload token signature".to_string()))?;

        let age_ms = Utc::now().timestamp_millis() - timestamp;
        if age_ms < 0 || age_ms >= TOKEN_MAX_AGE_MS {
            return Err(AppError::AuthError("Upload token expired".to_string()));
        }

        Ok(())
    }
}
