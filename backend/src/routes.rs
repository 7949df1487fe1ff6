use std::time::Duration;

use actix_web::error::InternalError;
use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use actix_multipart::Multipart;
use futures::{StreamExt, TryStreamExt};
use log::info;
use serde::Deserialize;
use serde_json::json;
use shared::{ClassifyResponse, HistoryEntry, HistoryResponse};

use crate::auth;
use crate::auth::middleware::AuthenticatedUser;
use crate::classifier::{label_name, preprocess, Classification, ClassifierError, Model};
use crate::db::record_repository::{NewClassificationEvent, RecordRepository};
use crate::error::ApiError;
use crate::scoring::{aggregate_score, ScoreWindow, WINDOW_SIZE};
use crate::storage::S3Service;

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Clone)]
pub struct PipelineSettings {
    pub classify_timeout: Duration,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(json!({ "error": message })),
        )
        .into()
    }))
    .service(
        web::scope("/api/v0.1")
            .service(web::resource("/health").route(web::get().to(health)))
            .service(web::resource("/users").route(web::post().to(auth::routes::register_user)))
            .service(
                web::scope("")
                    .wrap(HttpAuthentication::basic(
                        auth::middleware::validate_credentials,
                    ))
                    .service(web::resource("/login").route(web::post().to(auth::routes::login)))
                    .service(
                        web::resource("/users/{user_id}")
                            .route(web::get().to(auth::routes::get_user))
                            .route(web::put().to(auth::routes::update_user)),
                    )
                    .service(
                        web::resource("/classifier")
                            .route(web::post().to(classify))
                            .route(web::get().to(get_history)),
                    ),
            ),
    );
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "hello": "world" }))
}

struct ImageUpload {
    filename: String,
    bytes: Vec<u8>,
}

/// Pulls the uploaded image out of the multipart payload. The first field
/// carrying a filename is taken as the image.
async fn read_image_field(payload: &mut Multipart) -> Result<ImageUpload, ApiError> {
    while let Ok(Some(mut field)) = payload.try_next().await {
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(sanitize_filename);
        let Some(filename) = filename else {
            continue;
        };

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk
                .map_err(|e| ApiError::BadRequest(format!("unable to read file: {e}")))?;
            image_data.extend_from_slice(&data);
        }
        if image_data.is_empty() {
            return Err(ApiError::BadRequest("unable to read file".into()));
        }
        return Ok(ImageUpload {
            filename,
            bytes: image_data,
        });
    }
    Err(ApiError::BadRequest("no file in request".into()))
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Extension allow-list, checked before any decode or inference work.
fn allowed_extension(filename: &str) -> Result<String, ApiError> {
    match filename.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
                Ok(ext)
            } else {
                Err(ApiError::BadRequest("illegal file type".into()))
            }
        }
        None => Err(ApiError::BadRequest("illegal file type".into())),
    }
}

/// The scoring pipeline: upload -> tensor -> classification -> rolling-window
/// score -> object storage -> persisted event.
async fn classify(
    model: web::Data<Model>,
    records: web::Data<RecordRepository>,
    s3: web::Data<S3Service>,
    settings: web::Data<PipelineSettings>,
    user: AuthenticatedUser,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_image_field(&mut payload).await?;
    let extension = allowed_extension(&upload.filename)?;

    // Preprocess + forward pass are CPU-bound; they run on the blocking pool
    // under the per-request timeout. A timed-out call is failed, not retried.
    let worker_model = model.get_ref().clone();
    let image_bytes = upload.bytes.clone();
    let inference = web::block(move || -> Result<Classification, ClassifierError> {
        let tensor = preprocess(&image_bytes)?;
        worker_model.classify(&tensor)
    });
    let classification = match tokio::time::timeout(settings.classify_timeout, inference).await {
        Ok(joined) => joined??,
        Err(_) => {
            log::error!(
                "Classification timed out after {:?} for user {}",
                settings.classify_timeout,
                user.0
            );
            return Err(ApiError::Internal);
        }
    };

    // Rolling window: up to four most-recent persisted events plus the
    // classification in flight, newest last.
    let mut window: ScoreWindow = records.recent(user.0, (WINDOW_SIZE - 1) as i64).await?;
    window.push((classification.predicted_label, classification.confidence));
    let score = aggregate_score(&window)?;

    // Two explicit persistence steps: first a durable object-storage link,
    // then the row referencing it.
    let image_hash = S3Service::calculate_image_hash(&upload.bytes);
    let s3_key = S3Service::generate_s3_key(user.0, &image_hash, &extension);
    let content_type = S3Service::content_type_for_extension(&extension)?;
    let link = s3.upload_image(&upload.bytes, &s3_key, content_type).await?;

    let event = records
        .append(NewClassificationEvent {
            user_id: user.0,
            link,
            predicted_label: classification.predicted_label as i32,
            probabilities: classification.probabilities.clone(),
            confidence: classification.confidence,
            distraction_score: score,
        })
        .await?;

    info!(
        "Classified image for user {}: label={} ({}) score={:.4} event={}",
        user.0,
        classification.predicted_label,
        label_name(classification.predicted_label),
        score,
        event.id
    );

    Ok(HttpResponse::Ok().json(ClassifyResponse {
        filename: upload.filename,
        predicted_label: classification.predicted_label,
        label: label_name(classification.predicted_label).to_string(),
        probabilities: classification.probabilities,
        score,
    }))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
    offset: Option<i64>,
}

/// Defaults 50/0; values pass through as given. Negative values are rejected
/// up front; `limit=0` degenerates to an empty page and therefore a 404.
fn page_params(query: &HistoryQuery) -> Result<(i64, i64), ApiError> {
    let limit = query.limit.unwrap_or(50);
    let offset = query.offset.unwrap_or(0);
    if limit < 0 || offset < 0 {
        return Err(ApiError::BadRequest("invalid pagination parameter".into()));
    }
    Ok((limit, offset))
}

async fn get_history(
    records: web::Data<RecordRepository>,
    user: AuthenticatedUser,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, ApiError> {
    let (limit, offset) = page_params(&query)?;

    let events = records.list(user.0, limit, offset).await?;
    let results = events
        .into_iter()
        .map(|event| HistoryEntry {
            id: event.id,
            link: event.link,
            predicted_label: event.predicted_label,
            taken_at: event.taken_at,
            distraction_score: event.distraction_score,
        })
        .collect();

    Ok(HttpResponse::Ok().json(HistoryResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list_accepts_images_case_insensitively() {
        for name in ["frame.jpg", "frame.JPEG", "frame.png", "frame.GIF"] {
            assert!(allowed_extension(name).is_ok(), "{name} should pass");
        }
        assert_eq!(allowed_extension("frame.JPEG").unwrap(), "jpeg");
    }

    #[test]
    fn extension_allow_list_rejects_before_decode() {
        for name in ["notes.txt", "archive.tar.gz", "noextension", "script.sh"] {
            assert!(allowed_extension(name).is_err(), "{name} should be refused");
        }
    }

    #[test]
    fn pagination_defaults_and_passes_values_through() {
        let query = HistoryQuery {
            limit: None,
            offset: None,
        };
        assert_eq!(page_params(&query).unwrap(), (50, 0));

        let query = HistoryQuery {
            limit: Some(0),
            offset: Some(1000),
        };
        assert_eq!(page_params(&query).unwrap(), (0, 1000));
    }

    #[test]
    fn negative_pagination_is_rejected() {
        for (limit, offset) in [(Some(-1), None), (None, Some(-1))] {
            let query = HistoryQuery { limit, offset };
            assert!(matches!(
                page_params(&query),
                Err(ApiError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn filenames_are_sanitized() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("dash cam 01.jpg"), "dash_cam_01.jpg");
    }

    #[actix_web::test]
    async fn health_endpoint_is_public() {
        let app =
            actix_web::test::init_service(actix_web::App::new().configure(configure_routes)).await;
        let req = actix_web::test::TestRequest::get()
            .uri("/api/v0.1/health")
            .to_request();
        let resp = actix_web::test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
