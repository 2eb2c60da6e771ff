use crate::database::GiftRepository;
use crate::entities::gift_entity as gifts;
use crate::error::{AppError, AppResult};
use crate::external::ImgurService;
use crate::models::{
    DrawGiftResponse, DrawStats, GiftHistoryResponse, GiftResponse, UploadGiftResponse,
    UserStatsResponse, MAX_MESSAGE_CHARS,
};
use crate::utils::is_well_formed_client_id;
use chrono::Utc;
use rand::Rng;

/// 领取竞争失败后的最大重试次数
const MAX_CLAIM_ATTEMPTS: u32 = 3;

/// 礼物分配服务。
///
/// 每个礼物的状态机只有一次迁移: Unclaimed -> Claimed（终态）。
/// 迁移通过存储层的条件更新完成，并发抽取同一礼物时恰好一个成功，
/// 失败方重新拉取候选集重试，重试耗尽报 Contention。
#[derive(Clone)]
pub struct GiftService {
    repo: GiftRepository,
    imgur: ImgurService,
}

impl GiftService {
    pub fn new(repo: GiftRepository, imgur: ImgurService) -> Self {
        Self { repo, imgur }
    }

    /// 上传礼物:
    /// 1. 懒创建用户行
    /// 2. 图片传 Imgur（失败直接返回，不落任何礼物记录）
    /// 3. 写入未领取的礼物
    /// 4. 原子自增 upload_count
    /// 5. 尝试一次回礼抽取；抽不到或竞争失败不影响上传结果
    pub async fn upload(
        &self,
        user_id: &str,
        file_bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
        message: Option<String>,
    ) -> AppResult<UploadGiftResponse> {
        if !is_well_formed_client_id(user_id) {
            return Err(AppError::ValidationError("Missing client ID".to_string()));
        }
        let message = validate_message(message)?;

        self.repo.create_user_if_absent(user_id).await?;

        let image_url = self
            .imgur
            .upload_image(file_bytes, content_type, filename)
            .await?;

        let gift = self
            .repo
            .insert_gift(user_id, &image_url, message)
            .await?;
        let upload_count = self.repo.increment_upload_count(user_id).await?;

        log::info!(
            "Gift {} uploaded by {} (upload_count now {})",
            gift.id,
            user_id,
            upload_count
        );

        // 回礼抽取：首个上传者面对空候选集是正常情况
        let received_gift = match self.claim_random(user_id).await {
            Ok(bonus) => Some(GiftResponse::from(bonus)),
            Err(AppError::NoGiftsAvailable) => {
                log::debug!("No bonus gift available for {user_id}");
                None
            }
            Err(e) => {
                log::warn!("Bonus draw for {user_id} failed: {e}");
                None
            }
        };

        Ok(UploadGiftResponse {
            gift: gift.into(),
            received_gift,
        })
    }

    /// 主动抽取:
    /// 1. 剩余次数 = upload_count - 已领取数，不足直接拒绝（无副作用）
    /// 2. 走条件领取循环
    pub async fn draw(&self, user_id: &str) -> AppResult<DrawGiftResponse> {
        if !is_well_formed_client_id(user_id) {
            return Err(AppError::ValidationError("Missing client ID".to_string()));
        }

        // 抽取不懒创建用户行；没上传过的用户剩余次数必然为 0
        let upload_count = self
            .repo
            .find_user(user_id)
            .await?
            .map(|u| u.upload_count)
            .unwrap_or(0);
        let received_count = self.repo.count_received(user_id).await?;
        let remaining = upload_count - received_count;

        if remaining <= 0 {
            return Err(AppError::QuotaExhausted);
        }

        let gift = self.claim_random(user_id).await?;

        Ok(DrawGiftResponse {
            gift: gift.into(),
            stats: DrawStats {
                user_gifts: upload_count,
                remaining_draws: remaining - 1,
            },
        })
    }

    /// 条件领取循环：每次重试都重新拉取候选集，不复用过期数据。
    /// 候选集为空报 NoGiftsAvailable，重试耗尽报 Contention。
    pub async fn claim_random(&self, user_id: &str) -> AppResult<gifts::Model> {
        for attempt in 1..=MAX_CLAIM_ATTEMPTS {
            let candidates = self.repo.select_unclaimed_excluding(user_id).await?;
            if candidates.is_empty() {
                return Err(AppError::NoGiftsAvailable);
            }

            let index = rand::thread_rng().gen_range(0..candidates.len());
            let chosen_id = candidates[index].id;

            if self.repo.claim_gift(chosen_id, user_id, Utc::now()).await? {
                // 重新读取，返回写入后的领取信息
                return self
                    .repo
                    .find_gift(chosen_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalError(
                            "Gift disappeared after successful claim".to_string(),
                        )
                    });
            }

            log::warn!(
                "Lost claim race for gift {chosen_id} (attempt {attempt}), refetching candidates"
            );
        }

        Err(AppError::Contention)
    }

    /// 用户配额统计（抽取页展示用）
    pub async fn stats(&self, user_id: &str) -> AppResult<UserStatsResponse> {
        if !is_well_formed_client_id(user_id) {
            return Err(AppError::ValidationError("Missing client ID".to_string()));
        }

        let upload_count = self
            .repo
            .find_user(user_id)
            .await?
            .map(|u| u.upload_count)
            .unwrap_or(0);
        let received_count = self.repo.count_received(user_id).await?;

        Ok(UserStatsResponse {
            upload_count,
            received_count,
            remaining_draws: upload_count - received_count,
        })
    }

    /// 个人礼物历史：收到的 + 送出的
    pub async fn history(&self, user_id: &str) -> AppResult<GiftHistoryResponse> {
        if !is_well_formed_client_id(user_id) {
            return Err(AppError::ValidationError("Missing client ID".to_string()));
        }

        let received = self.repo.list_received(user_id).await?;
        let sent = self.repo.list_sent(user_id).await?;

        Ok(GiftHistoryResponse {
            received: received.into_iter().map(Into::into).collect(),
            sent: sent.into_iter().map(Into::into).collect(),
        })
    }

    /// 许愿树：全部已被领取的礼物
    pub async fn tree(&self) -> AppResult<Vec<GiftResponse>> {
        let claimed = self.repo.list_claimed().await?;
        Ok(claimed.into_iter().map(Into::into).collect())
    }
}

fn validate_message(message: Option<String>) -> AppResult<Option<String>> {
    match message {
        None => Ok(None),
        Some(m) if m.is_empty() => Ok(None),
        Some(m) if m.chars().count() > MAX_MESSAGE_CHARS => Err(AppError::ValidationError(
            format!("Message exceeds {MAX_MESSAGE_CHARS} characters"),
        )),
        Some(m) => Ok(Some(m)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_message_limits() {
        assert_eq!(validate_message(None).unwrap(), None);
        assert_eq!(validate_message(Some(String::new())).unwrap(), None);
        assert_eq!(
            validate_message(Some("hi".to_string())).unwrap(),
            Some("hi".to_string())
        );

        // 按字符数而非字节数计
        let cjk = "祝".repeat(200);
        assert!(validate_message(Some(cjk)).is_ok());

        let too_long = "a".repeat(201);
        assert!(matches!(
            validate_message(Some(too_long)),
            Err(AppError::ValidationError(_))
        ));
    }
}
