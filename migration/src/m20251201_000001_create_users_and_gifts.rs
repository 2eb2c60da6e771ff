use sea_orm_migration::prelude::*;

/// Users (匿名用户，id 为浏览器侧生成的 client token)
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    UploadCount,
    LastUploadAt,
    CreatedAt,
}

/// Gifts (礼物表，received_by 为空表示尚未被领取)
#[derive(DeriveIden)]
enum Gifts {
    Table,
    Id,
    ImageUrl,
    Message,
    UserId,
    ReceivedBy,
    ReceivedAt,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// 初始表结构:
/// - users: 上传计数与最近上传时间（剩余抽取次数 = upload_count - 已领取数，动态计算）
/// - gifts: 图片外链 + 可选留言，领取为一次性状态变更（received_by 只会从 NULL 变为固定用户）
///
/// 时间默认值使用 CURRENT_TIMESTAMP 以便同时支持 Postgres 与 Sqlite
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 用户表
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .string_len(64)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Users::UploadCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Users::LastUploadAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 礼物表
        manager
            .create_table(
                Table::create()
                    .table(Gifts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Gifts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Gifts::ImageUrl).text().not_null())
                    .col(ColumnDef::new(Gifts::Message).string_len(200))
                    .col(ColumnDef::new(Gifts::UserId).string_len(64).not_null())
                    .col(ColumnDef::new(Gifts::ReceivedBy).string_len(64))
                    .col(ColumnDef::new(Gifts::ReceivedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Gifts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 抽取候选查询走 (received_by, user_id)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_gifts_received_by")
                    .table(Gifts::Table)
                    .col(Gifts::ReceivedBy)
                    .to_owned(),
            )
            .await?;

        // 用户送出礼物列表查询
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_gifts_user_id")
                    .table(Gifts::Table)
                    .col(Gifts::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Gifts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
