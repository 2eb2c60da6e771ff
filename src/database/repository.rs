use crate::entities::{gift_entity as gifts, user_entity as users};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, Set, UpdateResult,
};
use uuid::Uuid;

/// 用户与礼物的存储访问层。
/// 所有跨请求的并发协调都通过这里的条件更新 / 原子自增表达，
/// 不使用进程内锁（可能有多个服务实例同时运行）。
#[derive(Clone)]
pub struct GiftRepository {
    pool: DatabaseConnection,
}

#[derive(Debug, sea_orm::FromQueryResult)]
struct CountRow {
    count: i64,
}

impl GiftRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn find_user(&self, user_id: &str) -> AppResult<Option<users::Model>> {
        Ok(users::Entity::find_by_id(user_id.to_string())
            .one(&self.pool)
            .await?)
    }

    /// 确保用户行存在（首次上传 / 首次身份访问时懒创建），返回当前 upload_count
    pub async fn create_user_if_absent(&self, user_id: &str) -> AppResult<i64> {
        if let Some(user) = self.find_user(user_id).await? {
            return Ok(user.upload_count);
        }

        let am = users::ActiveModel {
            id: Set(user_id.to_string()),
            upload_count: Set(0),
            last_upload_at: Set(None),
            created_at: Set(Some(Utc::now())),
        };

        match am.insert(&self.pool).await {
            Ok(user) => Ok(user.upload_count),
            Err(err) => {
                // 并发首次访问可能撞主键，重读一次
                if let Some(user) = self.find_user(user_id).await? {
                    Ok(user.upload_count)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// 创建一条未被领取的礼物记录
    pub async fn insert_gift(
        &self,
        user_id: &str,
        image_url: &str,
        message: Option<String>,
    ) -> AppResult<gifts::Model> {
        let gift = gifts::ActiveModel {
            id: Set(Uuid::new_v4()),
            image_url: Set(image_url.to_string()),
            message: Set(message),
            user_id: Set(user_id.to_string()),
            received_by: Set(None),
            received_at: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&self.pool)
        .await?;

        Ok(gift)
    }

    /// 原子自增 upload_count 并刷新 last_upload_at，返回更新后的计数
    pub async fn increment_upload_count(&self, user_id: &str) -> AppResult<i64> {
        let result: UpdateResult = users::Entity::update_many()
            .col_expr(
                users::Column::UploadCount,
                Expr::col(users::Column::UploadCount).add(1),
            )
            .col_expr(users::Column::LastUploadAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let user = self
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        Ok(user.upload_count)
    }

    /// 用户已领取的礼物数
    pub async fn count_received(&self, user_id: &str) -> AppResult<i64> {
        let row = gifts::Entity::find()
            .filter(gifts::Column::ReceivedBy.eq(user_id))
            .select_only()
            .column_as(Expr::val(1).count(), "count")
            .into_model::<CountRow>()
            .one(&self.pool)
            .await?;
        Ok(row.map(|r| r.count).unwrap_or(0))
    }

    /// 未被领取且非指定用户上传的礼物数
    pub async fn count_available(&self, excluding_user_id: &str) -> AppResult<i64> {
        let row = gifts::Entity::find()
            .filter(gifts::Column::ReceivedBy.is_null())
            .filter(gifts::Column::UserId.ne(excluding_user_id))
            .select_only()
            .column_as(Expr::val(1).count(), "count")
            .into_model::<CountRow>()
            .one(&self.pool)
            .await?;
        Ok(row.map(|r| r.count).unwrap_or(0))
    }

    /// 抽取候选集：未被领取且不是该用户自己上传的礼物。
    /// 自我排除在这里过滤，而不是领取后再检查。
    pub async fn select_unclaimed_excluding(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<gifts::Model>> {
        Ok(gifts::Entity::find()
            .filter(gifts::Column::ReceivedBy.is_null())
            .filter(gifts::Column::UserId.ne(user_id))
            .all(&self.pool)
            .await?)
    }

    /// 条件领取：仅当该礼物此刻仍未被领取时写入 received_by / received_at。
    /// 并发竞争下恰好一个调用方 rows_affected == 1，其余拿到 false。
    pub async fn claim_gift(
        &self,
        gift_id: Uuid,
        claimant_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result: UpdateResult = gifts::Entity::update_many()
            .col_expr(
                gifts::Column::ReceivedBy,
                Expr::value(claimant_id.to_string()),
            )
            .col_expr(gifts::Column::ReceivedAt, Expr::value(now))
            .filter(gifts::Column::Id.eq(gift_id))
            .filter(gifts::Column::ReceivedBy.is_null())
            .exec(&self.pool)
            .await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn find_gift(&self, gift_id: Uuid) -> AppResult<Option<gifts::Model>> {
        Ok(gifts::Entity::find_by_id(gift_id).one(&self.pool).await?)
    }

    /// 用户收到的礼物（倒序）
    pub async fn list_received(&self, user_id: &str) -> AppResult<Vec<gifts::Model>> {
        Ok(gifts::Entity::find()
            .filter(gifts::Column::ReceivedBy.eq(user_id))
            .order_by(gifts::Column::CreatedAt, Order::Desc)
            .all(&self.pool)
            .await?)
    }

    /// 用户送出的礼物（倒序）
    pub async fn list_sent(&self, user_id: &str) -> AppResult<Vec<gifts::Model>> {
        Ok(gifts::Entity::find()
            .filter(gifts::Column::UserId.eq(user_id))
            .order_by(gifts::Column::CreatedAt, Order::Desc)
            .all(&self.pool)
            .await?)
    }

    /// 许愿树视图：所有已被领取的礼物，按领取时间升序
    pub async fn list_claimed(&self) -> AppResult<Vec<gifts::Model>> {
        Ok(gifts::Entity::find()
            .filter(gifts::Column::ReceivedBy.is_not_null())
            .order_by(gifts::Column::ReceivedAt, Order::Asc)
            .all(&self.pool)
            .await?)
    }
}
