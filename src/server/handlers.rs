//! Route handlers.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::image_pipeline::{OutputFormat, Quality};
use crate::service::{ConversionRequest, RequestParams, SourceImageRef, Variant};

use super::AppState;
use super::error::ApiError;

pub const X_CACHE: &str = "x-cache";

/// Raw query string. Fields stay strings so every bad value gets a JSON 400
/// naming the parameter instead of the extractor's plain-text rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ConvertQuery {
    format: Option<String>,
    quality: Option<String>,
    size: Option<String>,
    max_width: Option<String>,
    max_height: Option<String>,
}

impl ConvertQuery {
    fn params(&self) -> Result<RequestParams, ApiError> {
        let format = match self.format.as_deref() {
            Some(raw) => raw
                .parse::<OutputFormat>()
                .map_err(|message| ApiError::invalid("format", message))?,
            None => OutputFormat::default(),
        };

        let variant = match self.size.as_deref() {
            Some(raw) => raw
                .parse::<Variant>()
                .map_err(|message| ApiError::invalid("size", message))?,
            None => Variant::default(),
        };

        let quality = self
            .quality
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(Quality::new)
                    .ok_or_else(|| ApiError::invalid("quality", "must be an integer between 1 and 100"))
            })
            .transpose()?;

        Ok(RequestParams {
            variant,
            format,
            quality,
            max_width: parse_cap("max_width", self.max_width.as_deref())?,
            max_height: parse_cap("max_height", self.max_height.as_deref())?,
        })
    }
}

fn parse_cap(param: &'static str, raw: Option<&str>) -> Result<Option<u32>, ApiError> {
    raw.map(|raw| match raw.trim().parse::<u32>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(ApiError::invalid(param, "must be a positive integer")),
    })
    .transpose()
}

/// GET /convert/{collection_id}/{image_name}
pub async fn convert(
    State(state): State<AppState>,
    Path((collection_id, image_name)): Path<(String, String)>,
    Query(query): Query<ConvertQuery>,
) -> Result<Response, ApiError> {
    let collection_id = collection_id
        .parse::<u64>()
        .map_err(|_| ApiError::invalid("collection_id", "must be a non-negative integer"))?;
    if image_name.is_empty() {
        return Err(ApiError::invalid("image_name", "must not be empty"));
    }

    let request = ConversionRequest::resolve(
        SourceImageRef::new(collection_id, image_name),
        query.params()?,
        &state.variants,
    );

    let outcome = state.service.convert(&request).await?;
    let artifact = outcome.artifact;

    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type),
            (header::CACHE_CONTROL, artifact.cache_control),
            (header::HeaderName::from_static(X_CACHE), outcome.cache_status.as_str().to_string()),
        ],
        artifact.bytes,
    )
        .into_response())
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
