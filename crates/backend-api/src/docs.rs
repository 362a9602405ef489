use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "DreamInk Backend", description = "Account management and image stylization"),
    paths(
        crate::routes::health::home,
        crate::routes::health::health_check,
        crate::routes::auth::signup,
        crate::routes::auth::signin,
        crate::routes::style::list_styles,
        crate::routes::style::stylize
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            crate::routes::health::HomeResponse,
            crate::routes::health::HealthResponse,
            crate::routes::auth::SignUpPayload,
            crate::routes::auth::SignUpResponse,
            crate::routes::auth::SignInPayload,
            crate::routes::auth::SignInResponse,
            crate::routes::style::StylesResponse,
            crate::routes::style::StylizeForm,
            crate::routes::style::StylizeResponse
        )
    ),
    tags(
        (name = "Health", description = "Service liveness"),
        (name = "Auth", description = "Account registration and sign-in"),
        (name = "Style", description = "Image stylization")
    )
)]
pub struct ApiDoc;
