use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database};
use uuid::Uuid;

use wishtree_backend::config::ImgurConfig;
use wishtree_backend::database::GiftRepository;
use wishtree_backend::error::AppError;
use wishtree_backend::external::ImgurService;
use wishtree_backend::services::GiftService;

/// 内存 sqlite + 单连接池（多连接会各自拿到独立的内存库）
async fn setup() -> (GiftRepository, GiftService) {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options.max_connections(1);
    let pool = Database::connect(options).await.expect("connect sqlite");
    Migrator::up(&pool, None).await.expect("run migrations");

    let repo = GiftRepository::new(pool);
    // 图床指向不可达地址：测试里凡是走到网络的路径都应在此之前失败或根本不发起
    let imgur = ImgurService::new(ImgurConfig {
        client_id: "test-client-id".to_string(),
        base_url: "http://127.0.0.1:1".to_string(),
        upload_timeout_secs: 2,
    });
    let service = GiftService::new(repo.clone(), imgur);
    (repo, service)
}

/// 模拟一次已完成图床上传的贡献：建用户、写礼物、加计数
async fn contribute(repo: &GiftRepository, user_id: &str) -> Uuid {
    repo.create_user_if_absent(user_id).await.unwrap();
    let gift = repo
        .insert_gift(user_id, "https://i.imgur.com/test.png", None)
        .await
        .unwrap();
    repo.increment_upload_count(user_id).await.unwrap();
    gift.id
}

#[tokio::test]
async fn claim_succeeds_exactly_once() {
    let (repo, _service) = setup().await;

    let gift_id = contribute(&repo, "user-a").await;

    let first = repo.claim_gift(gift_id, "user-b", Utc::now()).await.unwrap();
    let second = repo.claim_gift(gift_id, "user-c", Utc::now()).await.unwrap();
    assert!(first);
    assert!(!second);

    let gift = repo.find_gift(gift_id).await.unwrap().unwrap();
    assert_eq!(gift.received_by.as_deref(), Some("user-b"));
    assert!(gift.received_at.is_some());
}

#[tokio::test]
async fn concurrent_claims_award_gift_to_exactly_one_user() {
    let (repo, _service) = setup().await;

    let gift_id = contribute(&repo, "user-a").await;

    // N 个并发领取同一件未领取礼物：恰好一个拿到 true
    let mut handles = Vec::new();
    for i in 0..8 {
        let repo = repo.clone();
        let claimant = format!("claimant-{i}");
        handles.push(tokio::spawn(async move {
            repo.claim_gift(gift_id, &claimant, Utc::now())
                .await
                .unwrap()
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    let gift = repo.find_gift(gift_id).await.unwrap().unwrap();
    let winner = gift.received_by.expect("claimed gift has a receiver");
    assert!(winner.starts_with("claimant-"));
    assert!(gift.received_at.is_some());
}

#[tokio::test]
async fn own_gifts_never_offered_as_candidates() {
    let (repo, service) = setup().await;

    contribute(&repo, "user-a").await;

    // 唯一的未领取礼物是自己上传的：有配额但无候选
    let candidates = repo.select_unclaimed_excluding("user-a").await.unwrap();
    assert!(candidates.is_empty());
    assert_eq!(repo.count_available("user-a").await.unwrap(), 0);

    let result = service.draw("user-a").await;
    assert!(matches!(result, Err(AppError::NoGiftsAvailable)));
}

#[tokio::test]
async fn draw_without_uploads_is_rejected() {
    let (repo, service) = setup().await;

    contribute(&repo, "user-a").await;

    let result = service.draw("user-b").await;
    assert!(matches!(result, Err(AppError::QuotaExhausted)));

    // 抽取不会懒创建用户行，也不产生任何副作用
    assert!(repo.find_user("user-b").await.unwrap().is_none());
    let gift = repo.list_sent("user-a").await.unwrap().remove(0);
    assert!(gift.received_by.is_none());
}

#[tokio::test]
async fn upload_then_draw_scenario() {
    let (repo, service) = setup().await;

    // A 上传 G1（配额 1），B 上传 G2（配额 1）
    let g1 = contribute(&repo, "user-a").await;
    let g2 = contribute(&repo, "user-b").await;

    // A 抽取：唯一候选是 G2
    let result = service.draw("user-a").await.unwrap();
    assert_eq!(result.gift.id, g2);
    assert_eq!(result.gift.user_id, "user-b");
    assert_eq!(result.gift.received_by.as_deref(), Some("user-a"));
    assert_eq!(result.stats.user_gifts, 1);
    assert_eq!(result.stats.remaining_draws, 0);

    // 第二次抽取：配额耗尽
    let second = service.draw("user-a").await;
    assert!(matches!(second, Err(AppError::QuotaExhausted)));

    // G1 仍未被领取
    let g1_row = repo.find_gift(g1).await.unwrap().unwrap();
    assert!(g1_row.received_by.is_none());
}

#[tokio::test]
async fn single_eligible_gift_goes_to_exactly_one_drawer() {
    let (repo, service) = setup().await;

    let g_a = contribute(&repo, "user-a").await;
    let g_b = contribute(&repo, "user-b").await;
    let g_c = contribute(&repo, "user-c").await;

    // 把 A、B 自己的礼物标记为已领取，唯一剩余候选对两人都是 G_C
    assert!(repo.claim_gift(g_a, "user-c", Utc::now()).await.unwrap());
    assert!(repo.claim_gift(g_b, "user-c", Utc::now()).await.unwrap());

    let winner = service.draw("user-a").await.unwrap();
    assert_eq!(winner.gift.id, g_c);

    let loser = service.draw("user-b").await;
    assert!(matches!(loser, Err(AppError::NoGiftsAvailable)));

    let g_c_row = repo.find_gift(g_c).await.unwrap().unwrap();
    assert_eq!(g_c_row.received_by.as_deref(), Some("user-a"));
}

#[tokio::test]
async fn remaining_draws_never_negative_over_a_session() {
    let (repo, service) = setup().await;

    contribute(&repo, "user-a").await;
    contribute(&repo, "user-a").await;
    contribute(&repo, "user-b").await;

    // A: 配额 2，候选只有 B 的一件
    let first = service.draw("user-a").await.unwrap();
    assert_eq!(first.gift.user_id, "user-b");
    assert_eq!(first.stats.remaining_draws, 1);

    // 剩余配额还在但候选耗尽：报无礼物而不是扣配额
    let second = service.draw("user-a").await;
    assert!(matches!(second, Err(AppError::NoGiftsAvailable)));

    let stats_a = service.stats("user-a").await.unwrap();
    assert_eq!(stats_a.upload_count, 2);
    assert_eq!(stats_a.received_count, 1);
    assert_eq!(stats_a.remaining_draws, 1);

    // B: 配额 1，领走 A 的一件后归零
    let b_draw = service.draw("user-b").await.unwrap();
    assert_eq!(b_draw.gift.user_id, "user-a");
    let stats_b = service.stats("user-b").await.unwrap();
    assert_eq!(stats_b.remaining_draws, 0);
    assert!(stats_b.remaining_draws >= 0);
}

#[tokio::test]
async fn create_user_if_absent_is_idempotent() {
    let (repo, _service) = setup().await;

    assert_eq!(repo.create_user_if_absent("user-a").await.unwrap(), 0);
    assert_eq!(repo.create_user_if_absent("user-a").await.unwrap(), 0);

    repo.insert_gift("user-a", "https://i.imgur.com/test.png", None)
        .await
        .unwrap();
    assert_eq!(repo.increment_upload_count("user-a").await.unwrap(), 1);
    assert_eq!(repo.create_user_if_absent("user-a").await.unwrap(), 1);
}

#[tokio::test]
async fn oversized_message_rejected_before_any_side_effect() {
    let (repo, service) = setup().await;

    let message = "x".repeat(201);
    let result = service
        .upload(
            "user-a",
            vec![1, 2, 3],
            "image/png",
            "gift.png",
            Some(message),
        )
        .await;
    assert!(matches!(result, Err(AppError::ValidationError(_))));
    assert!(repo.list_sent("user-a").await.unwrap().is_empty());
}

#[tokio::test]
async fn failed_image_upload_leaves_no_gift_row() {
    let (repo, service) = setup().await;

    // 图床不可达：上传中止，不落礼物记录，计数不变
    let result = service
        .upload("user-a", vec![1, 2, 3], "image/png", "gift.png", None)
        .await;
    assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));

    assert!(repo.list_sent("user-a").await.unwrap().is_empty());
    let user = repo.find_user("user-a").await.unwrap().unwrap();
    assert_eq!(user.upload_count, 0);
}

#[tokio::test]
async fn tree_lists_claimed_gifts_in_claim_order() {
    let (repo, service) = setup().await;

    let g1 = contribute(&repo, "user-a").await;
    let g2 = contribute(&repo, "user-b").await;
    contribute(&repo, "user-c").await;

    assert!(repo.claim_gift(g1, "user-b", Utc::now()).await.unwrap());
    assert!(repo.claim_gift(g2, "user-a", Utc::now()).await.unwrap());

    let tree = service.tree().await.unwrap();
    assert_eq!(tree.len(), 2);
    assert!(tree.iter().all(|g| g.received_by.is_some()));

    // 未被领取的礼物不上树
    assert!(!tree.iter().any(|g| g.user_id == "user-c"));
}

#[tokio::test]
async fn history_separates_received_and_sent() {
    let (repo, service) = setup().await;

    let g_a = contribute(&repo, "user-a").await;
    let g_b = contribute(&repo, "user-b").await;

    assert!(repo.claim_gift(g_b, "user-a", Utc::now()).await.unwrap());

    let history = service.history("user-a").await.unwrap();
    assert_eq!(history.sent.len(), 1);
    assert_eq!(history.sent[0].id, g_a);
    assert_eq!(history.received.len(), 1);
    assert_eq!(history.received[0].id, g_b);
}
