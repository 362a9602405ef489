use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{ApiError, AppState};

const NO_IMAGE: &str = "No image uploaded";

#[derive(Debug, Serialize, ToSchema)]
pub struct StylesResponse {
    pub styles: Vec<String>,
}

/// Multipart form accepted by the stylization endpoint.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct StylizeForm {
    #[schema(value_type = String, format = Binary)]
    pub image: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StylizeResponse {
    pub message: String,
    /// Base64 encoded PNG.
    pub image: String,
}

#[utoipa::path(
    get,
    path = "/api/styles",
    tag = "Style",
    responses((status = 200, description = "Available styles", body = StylesResponse))
)]
pub async fn list_styles(State(state): State<AppState>) -> Json<StylesResponse> {
    Json(StylesResponse {
        styles: state.stylizer().styles(),
    })
}

#[utoipa::path(
    post,
    path = "/api/style/{style}",
    tag = "Style",
    params(("style" = String, Path, description = "Style name, case-insensitive")),
    request_body(content = StylizeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stylized image", body = StylizeResponse),
        (status = 400, description = "Missing upload, unknown style or undecodable image", body = crate::error::ErrorResponse),
        (status = 413, description = "Upload exceeds the size limit", body = crate::error::ErrorResponse),
        (status = 502, description = "Model runtime failure", body = crate::error::ErrorResponse)
    )
)]
pub async fn stylize(
    State(state): State<AppState>,
    Path(style): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<StylizeResponse>, ApiError> {
    let image = read_image(multipart).await?;

    info!(style = %style, bytes = image.len(), "stylization requested");

    let result = state.stylizer().stylize(&style, image.to_vec()).await?;

    let image = result.base64();
    Ok(Json(StylizeResponse {
        message: result.message,
        image,
    }))
}

/// Pull the first `image` file field out of the form. Other fields are ignored.
async fn read_image(multipart: Result<Multipart, MultipartRejection>) -> Result<Bytes, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection, "request is not multipart");
        ApiError::bad_request(NO_IMAGE)
    })?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("image") {
            continue;
        }
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.is_empty() {
            break;
        }
        return Ok(data);
    }

    Err(ApiError::bad_request(NO_IMAGE))
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> ApiError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("Image too large");
    }
    debug!(error = %error, "malformed multipart body");
    ApiError::bad_request(NO_IMAGE)
}
