use std::path::PathBuf;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpRequest, HttpResponse};
use futures::StreamExt;
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::interfaces::builder::{build_and_write_yaml, build_and_write_yaml_from_doc};
use crate::models::AppState;
use crate::utils::yaml::parse;
use crate::web_handlers::pages::{render_error, render_index, render_success};
use crate::Settings;

const YAML_CONTENT_TYPE: &str = "application/x-yaml; charset=utf-8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const UPLOAD_FIELD: &str = "file";
const NOT_FOUND_MESSAGE: &str = "Not found or already downloaded";

fn html_page(status: StatusCode, page: Result<String, minijinja::Error>) -> HttpResponse {
    match page {
        Ok(body) => HttpResponse::build(status)
            .content_type(HTML_CONTENT_TYPE)
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .body(body),
        Err(e) => {
            error!("Failed to render page: {}", e);
            HttpResponse::InternalServerError().body(format!("Failed to render page: {}", e))
        }
    }
}

fn error_page(status: StatusCode, message: &str) -> HttpResponse {
    html_page(status, render_error(message))
}

/// Origin one-time links are built on: the configured base URL, else the request's own.
fn public_origin(req: &HttpRequest, settings: &Settings) -> String {
    match settings.public_base_url.as_deref() {
        Some(base) => base.trim_end_matches('/').to_string(),
        None => {
            let info = req.connection_info();
            format!("{}://{}", info.scheme(), info.host())
        }
    }
}

/// Handler for the upload form
pub async fn index_handler() -> HttpResponse {
    html_page(StatusCode::OK, render_index())
}

/// Handler for the subscription built from the server's own override file
pub async fn sub_handler() -> HttpResponse {
    let settings = Settings::current();
    let options = settings.build_options();
    let (template, subs, output) = (
        settings.template_path.clone(),
        settings.subs_path.clone(),
        settings.output_path.clone(),
    );

    let result = web::block(move || build_and_write_yaml(template, subs, output, &options)).await;
    let output_path = match result {
        Ok(Ok(result)) => result.output_path,
        Ok(Err(e)) => {
            error!("Static build failed: {}", e);
            return HttpResponse::InternalServerError().body(e.to_string());
        }
        Err(e) => {
            error!("Static build did not complete: {}", e);
            return HttpResponse::InternalServerError().body(e.to_string());
        }
    };

    match tokio::fs::read(&output_path).await {
        Ok(content) => HttpResponse::Ok()
            .content_type(YAML_CONTENT_TYPE)
            .insert_header((header::CONTENT_DISPOSITION, r#"attachment; filename="sub.yaml""#))
            .body(content),
        Err(e) => {
            error!("Failed to read {}: {}", output_path.display(), e);
            HttpResponse::InternalServerError().body(e.to_string())
        }
    }
}

enum UploadError {
    Missing,
    TooLarge,
    Malformed(String),
}

/// Collect the bytes of the `file` field, capped at `limit`.
async fn read_upload_field(payload: &mut Multipart, limit: usize) -> Result<Vec<u8>, UploadError> {
    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| UploadError::Malformed(e.to_string()))?;
        let is_file = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .is_some_and(|name| name == UPLOAD_FIELD);
        if !is_file {
            // Drain unrelated fields so the stream can advance.
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| UploadError::Malformed(e.to_string()))?;
            }
            continue;
        }

        let mut content = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| UploadError::Malformed(e.to_string()))?;
            if content.len() + chunk.len() > limit {
                return Err(UploadError::TooLarge);
            }
            content.extend_from_slice(&chunk);
        }
        return Ok(content);
    }
    Err(UploadError::Missing)
}

/// Handler for uploaded override files
///
/// Builds against the configured template, writes the result under the temp
/// directory and answers with a page carrying a one-time download link.
pub async fn upload_handler(
    req: HttpRequest,
    mut payload: Multipart,
    app_state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let settings = Settings::current();

    let content = match read_upload_field(&mut payload, settings.max_upload_size).await {
        Ok(content) => content,
        Err(UploadError::Missing) => {
            return error_page(StatusCode::BAD_REQUEST, "缺少上传文件：file");
        }
        Err(UploadError::TooLarge) => {
            return error_page(
                StatusCode::PAYLOAD_TOO_LARGE,
                &format!("上传文件过大（上限 {} 字节）", settings.max_upload_size),
            );
        }
        Err(UploadError::Malformed(e)) => {
            return error_page(StatusCode::BAD_REQUEST, &format!("Invalid upload: {}", e));
        }
    };

    let subs_doc = match parse(&content) {
        Ok(doc) => doc,
        Err(e) => {
            debug!("Rejected upload: {}", e);
            return error_page(StatusCode::BAD_REQUEST, &format!("Invalid YAML: {}", e));
        }
    };

    let options = settings.build_options();
    let template = settings.template_path.clone();
    let output = PathBuf::from(&settings.temp_dir).join(format!("{}.yaml", Uuid::new_v4().simple()));
    let result = web::block(move || {
        build_and_write_yaml_from_doc(template, &subs_doc, output, &options)
    })
    .await;

    let build = match result {
        Ok(Ok(build)) => build,
        Ok(Err(e)) => {
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                error!("Upload build failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            };
            return error_page(status, &e.to_string());
        }
        Err(e) => {
            error!("Upload build did not complete: {}", e);
            return error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };

    let token = app_state.downloads.register(build.output_path);
    let download_url = format!("{}/{}.yaml", public_origin(&req, &settings), token);
    info!("Registered one-time download {}", token);
    html_page(
        StatusCode::OK,
        render_success(&download_url, app_state.downloads.ttl().as_secs()),
    )
}

/// Handler for one-time downloads
pub async fn download_handler(
    path: web::Path<String>,
    app_state: web::Data<Arc<AppState>>,
) -> HttpResponse {
    let token = path.into_inner();
    let not_found = || {
        HttpResponse::NotFound()
            .insert_header((header::CACHE_CONTROL, "no-store"))
            .body(NOT_FOUND_MESSAGE)
    };

    let Some(file_path) = app_state.downloads.consume(&token) else {
        return not_found();
    };

    let content = match tokio::fs::read(&file_path).await {
        Ok(content) => content,
        Err(e) => {
            warn!("One-time file {} is gone: {}", file_path.display(), e);
            return not_found();
        }
    };
    if let Err(e) = tokio::fs::remove_file(&file_path).await {
        warn!("Failed to remove {}: {}", file_path.display(), e);
    }

    HttpResponse::Ok()
        .content_type(YAML_CONTENT_TYPE)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!(r#"attachment; filename="{}.yaml""#, token),
        ))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(content)
}

/// Register all routes; `/sub.yaml` comes before the token route it would also match.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index_handler))
        .route("/sub.yaml", web::get().to(sub_handler))
        .route("/upload", web::post().to(upload_handler))
        .route("/{token}.yaml", web::get().to(download_handler));
}

