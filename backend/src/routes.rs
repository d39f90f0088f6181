use actix_multipart::Multipart;
use actix_web::{web, Error, HttpResponse};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, TryStreamExt};
use serde_json::json;
use sha2::{Digest, Sha256};
use shared::{AnalyzeRequest, AnalyzeResponse, ErrorResponse};

use crate::analysis::{AnalysisError, Analyzer};
use crate::auth::identity::CurrentUser;
use crate::config::AnalysisSettings;
use crate::gateway::GatewayBackend;

pub type AppAnalyzer = Analyzer<GatewayBackend>;

pub fn configure_routes(cfg: &mut web::ServiceConfig, settings: &AnalysisSettings) {
    // base64 inflates the payload by a third
    let json_limit = settings.upload.max_bytes / 3 * 4 + 1024;

    cfg.service(web::resource("/api/analyze").route(web::post().to(handle_analyze)))
        .service(
            web::resource("/api/analyze/base64")
                .app_data(web::JsonConfig::default().limit(json_limit))
                .route(web::post().to(handle_analyze_base64)),
        )
        .service(web::resource("/api/health").route(web::get().to(health)));
}

pub fn image_hash(image: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image);
    hex::encode(hasher.finalize())
}

fn error_response(mut builder: actix_web::HttpResponseBuilder, message: &str) -> HttpResponse {
    builder.json(ErrorResponse {
        error: message.to_string(),
    })
}

async fn handle_analyze(
    analyzer: web::Data<AppAnalyzer>,
    settings: web::Data<AnalysisSettings>,
    user: CurrentUser,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let max_bytes = settings.upload.max_bytes;
    let mut image_data: Option<Vec<u8>> = None;

    while let Some(mut field) = payload.try_next().await? {
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > max_bytes {
                log::warn!("Rejected upload larger than {} bytes", max_bytes);
                return Ok(error_response(
                    HttpResponse::PayloadTooLarge(),
                    "Image exceeds the upload size limit",
                ));
            }
            data.extend_from_slice(&chunk);
        }
        if image_data.is_none() && !data.is_empty() {
            image_data = Some(data);
        }
    }

    let Some(image_data) = image_data else {
        return Ok(error_response(
            HttpResponse::BadRequest(),
            "No image found in upload",
        ));
    };

    Ok(run_analysis(&analyzer, &image_data, user).await)
}

async fn handle_analyze_base64(
    analyzer: web::Data<AppAnalyzer>,
    settings: web::Data<AnalysisSettings>,
    user: CurrentUser,
    request: web::Json<AnalyzeRequest>,
) -> HttpResponse {
    let encoded = strip_data_url(&request.image_data);

    let image_data = match STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Rejected base64 payload: {}", e);
            return error_response(HttpResponse::BadRequest(), "Image data is not valid base64");
        }
    };

    if image_data.is_empty() {
        return error_response(HttpResponse::BadRequest(), "No image found in request");
    }
    if image_data.len() > settings.upload.max_bytes {
        return error_response(
            HttpResponse::PayloadTooLarge(),
            "Image exceeds the upload size limit",
        );
    }

    run_analysis(&analyzer, &image_data, user).await
}

/// Accepts both `data:image/png;base64,<payload>` and a bare payload.
fn strip_data_url(image_data: &str) -> &str {
    let payload = match image_data.split_once(";base64,") {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload,
        _ => image_data,
    };
    payload.trim()
}

async fn run_analysis(analyzer: &AppAnalyzer, image_data: &[u8], user: CurrentUser) -> HttpResponse {
    let image_hash = image_hash(image_data);
    log::info!(
        "Analyzing image {} ({} bytes) for {}",
        image_hash,
        image_data.len(),
        user.0.map_or_else(|| "anonymous caller".to_string(), |id| format!("user {}", id))
    );

    match analyzer.analyze(image_data, user.0).await {
        Ok(result) => HttpResponse::Ok().json(AnalyzeResponse { result, image_hash }),
        Err(e @ AnalysisError::Decode(_)) => {
            log::error!("Analysis of image {} failed: {}", image_hash, e);
            error_response(HttpResponse::UnprocessableEntity(), &e.to_string())
        }
    }
}

async fn health(analyzer: web::Data<AppAnalyzer>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "gateway": analyzer.gateway().kind(),
    }))
}
