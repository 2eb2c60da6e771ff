use crate::config::AuthConfig;
use crate::error::AppError;
use crate::models::*;
use crate::services::GiftService;
use crate::utils::UploadTokenService;
use actix_multipart::form::{tempfile::TempFile, text::Text, MultipartForm};
use actix_web::{web, HttpResponse, ResponseError, Result};
use serde_json::json;

#[derive(Debug, MultipartForm)]
pub struct UploadGiftForm {
    #[multipart(limit = "10MB")]
    pub file: TempFile,
    pub message: Option<Text<String>>,
    #[multipart(rename = "clientId")]
    pub client_id: Text<String>,
    // 可选的签名上传令牌，仅在 auth.require_upload_token 开启时校验
    #[multipart(rename = "tokenTimestamp")]
    pub token_timestamp: Option<Text<i64>>,
    #[multipart(rename = "tokenSignature")]
    pub token_signature: Option<Text<String>>,
}

#[utoipa::path(
    post,
    path = "/gifts/upload",
    tag = "gifts",
    responses(
        (status = 200, description = "上传成功，可能附带回礼", body = UploadGiftResponse),
        (status = 400, description = "缺少字段 / 留言超长 / 非图片文件"),
        (status = 401, description = "开启令牌校验时令牌无效"),
        (status = 502, description = "图床不可用")
    )
)]
/// 上传礼物（multipart: file + message? + clientId）:
/// 图片先传图床，成功后写入礼物记录并自增上传计数，
/// 最后尝试一次 best-effort 回礼抽取
pub async fn upload_gift(
    service: web::Data<GiftService>,
    auth: web::Data<AuthConfig>,
    tokens: web::Data<UploadTokenService>,
    MultipartForm(form): MultipartForm<UploadGiftForm>,
) -> Result<HttpResponse> {
    if auth.require_upload_token {
        let verified = match (&form.token_timestamp, &form.token_signature) {
            (Some(ts), Some(sig)) => tokens.verify(ts.0, &sig.0),
            _ => Err(AppError::AuthError("Missing upload token".to_string())),
        };
        if let Err(e) = verified {
            return Ok(e.error_response());
        }
    }

    let content_type = form
        .file
        .content_type
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_default();
    let filename = form
        .file
        .file_name
        .clone()
        .unwrap_or_else(|| "gift".to_string());

    let bytes = match tokio::fs::read(form.file.file.path()).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return Ok(
                AppError::InternalError(format!("Failed to read uploaded file: {e}"))
                    .error_response(),
            )
        }
    };

    match service
        .upload(
            &form.client_id.0,
            bytes,
            &content_type,
            &filename,
            form.message.map(|m| m.0),
        )
        .await
    {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/gifts/draw",
    tag = "gifts",
    request_body = DrawRequest,
    responses(
        (status = 200, description = "抽取成功", body = DrawGiftResponse),
        (status = 403, description = "剩余次数不足"),
        (status = 404, description = "没有可领取的礼物"),
        (status = 503, description = "并发竞争重试耗尽")
    )
)]
/// 主动抽取一个礼物：校验剩余次数后随机条件领取
pub async fn draw_gift(
    service: web::Data<GiftService>,
    request: web::Json<DrawRequest>,
) -> Result<HttpResponse> {
    match service.draw(&request.client_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/gifts",
    tag = "gifts",
    params(
        ("clientId" = String, Query, description = "匿名身份 token")
    ),
    responses(
        (status = 200, description = "用户收到与送出的礼物", body = GiftHistoryResponse)
    )
)]
/// 个人礼物历史（收到 / 送出，各自按时间倒序）
pub async fn get_history(
    service: web::Data<GiftService>,
    query: web::Query<GiftListQuery>,
) -> Result<HttpResponse> {
    match service.history(&query.client_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/gifts/stats",
    tag = "gifts",
    params(
        ("clientId" = String, Query, description = "匿名身份 token")
    ),
    responses(
        (status = 200, description = "上传数 / 已领取数 / 剩余次数", body = UserStatsResponse)
    )
)]
/// 用户配额统计
pub async fn get_stats(
    service: web::Data<GiftService>,
    query: web::Query<GiftListQuery>,
) -> Result<HttpResponse> {
    match service.stats(&query.client_id).await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tree",
    tag = "gifts",
    responses(
        (status = 200, description = "全部已被领取的礼物（许愿树视图）", body = [GiftResponse])
    )
)]
/// 许愿树数据：所有已被领取的礼物，按领取时间升序
pub async fn get_tree(service: web::Data<GiftService>) -> Result<HttpResponse> {
    match service.tree().await {
        Ok(data) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data }))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn gift_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/gifts")
            .route("/upload", web::post().to(upload_gift))
            .route("/draw", web::post().to(draw_gift))
            .route("/stats", web::get().to(get_stats))
            .route("", web::get().to(get_history)),
    )
    .route("/tree", web::get().to(get_tree));
}
