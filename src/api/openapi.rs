use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Session lifecycle endpoints
        crate::api::routes::sessions::login,
        crate::api::routes::sessions::logout,
        crate::api::routes::sessions::logout_all,
        crate::api::routes::sessions::refresh,
        crate::api::routes::sessions::list,
        crate::api::routes::sessions::destroy,
        crate::api::routes::sessions::validate,
        crate::api::routes::sessions::stats,
        crate::api::routes::sessions::cleanup,
        // Health check
        crate::api::routes::health,
        crate::api::routes::ready,
    ),
    components(
        schemas(
            crate::api::dtos::session_dto::LoginRequest,
            crate::api::dtos::session_dto::LoginResponse,
            crate::api::dtos::session_dto::UserInfo,
            crate::api::dtos::session_dto::RefreshRequest,
            crate::api::dtos::session_dto::RefreshResponse,
            crate::api::dtos::session_dto::MessageResponse,
            crate::api::dtos::session_dto::LogoutAllResponse,
            crate::api::dtos::session_dto::SessionInfo,
            crate::api::dtos::session_dto::SessionListResponse,
            crate::api::dtos::session_dto::ValidateResponse,
            crate::api::dtos::session_dto::DeviceBreakdownDto,
            crate::api::dtos::session_dto::SessionStatsDto,
            crate::api::dtos::session_dto::StatsResponse,
            crate::api::dtos::session_dto::CleanupResponse,
            crate::api::dtos::common::ErrorResponse,
            crate::domain::session::DeviceClass,
            crate::domain::user::Role,
        )
    ),
    tags(
        (name = "sessions", description = "Login, token lifecycle, and multi-device session management"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Campus Backend API",
        version = "0.3.0",
        description = "Authentication gatekeeper for the campus administration portal",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

pub fn configure_swagger_ui(cfg: &mut actix_web::web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
