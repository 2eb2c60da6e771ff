use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;
use crate::utils::UploadToken;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::identity::bootstrap_identity,
        handlers::identity::get_upload_token,
        handlers::gift::upload_gift,
        handlers::gift::draw_gift,
        handlers::gift::get_history,
        handlers::gift::get_stats,
        handlers::gift::get_tree,
    ),
    components(
        schemas(
            ApiError,
            IdentityResponse,
            UploadToken,
            GiftResponse,
            UploadGiftResponse,
            DrawRequest,
            DrawStats,
            DrawGiftResponse,
            GiftHistoryResponse,
            UserStatsResponse,
        )
    ),
    tags(
        (name = "identity", description = "匿名身份与上传令牌"),
        (name = "gifts", description = "礼物上传、抽取与聚合视图")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
