use crate::config::AuthConfig;
use crate::models::{ApiResponse, IdentityResponse};
use crate::utils::{ensure_identity, UploadTokenService};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{web, HttpRequest, HttpResponse, ResponseError, Result};

/// 身份 cookie 一年有效
const COOKIE_MAX_AGE_DAYS: i64 = 365;

#[utoipa::path(
    get,
    path = "/user",
    tag = "identity",
    responses(
        (status = 200, description = "返回已持久化或新签发的匿名身份", body = IdentityResponse)
    )
)]
/// 身份引导：已有合法 userId cookie 原样返回；
/// 否则签发新的随机 token 并通过 http-only / SameSite=Strict cookie 持久化一年
pub async fn bootstrap_identity(
    auth: web::Data<AuthConfig>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let existing = req.cookie("userId").map(|c| c.value().to_string());
    let (user_id, fresh) = ensure_identity(existing.as_deref());

    let body = ApiResponse::success(IdentityResponse {
        user_id: user_id.clone(),
    });

    if fresh {
        log::info!("Issued new client identity: {user_id}");
        let cookie = Cookie::build("userId", user_id)
            .http_only(true)
            .secure(auth.cookie_secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(actix_web::cookie::time::Duration::days(COOKIE_MAX_AGE_DAYS))
            .finish();
        Ok(HttpResponse::Ok().cookie(cookie).json(body))
    } else {
        Ok(HttpResponse::Ok().json(body))
    }
}

#[utoipa::path(
    get,
    path = "/upload-token",
    tag = "identity",
    responses(
        (status = 200, description = "签发上传令牌", body = crate::utils::UploadToken)
    )
)]
/// 签发带时效的上传令牌（HMAC 签名的时间戳，5 分钟内有效）
pub async fn get_upload_token(tokens: web::Data<UploadTokenService>) -> Result<HttpResponse> {
    match tokens.issue() {
        Ok(token) => Ok(HttpResponse::Ok().json(ApiResponse::success(token))),
        Err(e) => Ok(e.error_response()),
    }
}

/// 路由配置
pub fn identity_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/user", web::get().to(bootstrap_identity))
        .route("/upload-token", web::get().to(get_upload_token));
}
