mod auth;
mod classifier;
mod db;
mod error;
mod routes;
mod scoring;
mod storage;

use std::env;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use classifier::Model;
use db::record_repository::RecordRepository;
use db::user_repository::UserRepository;
use routes::{configure_routes, PipelineSettings};
use storage::S3Service;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    // The classifier artifact is loaded exactly once; the service must not
    // come up without it.
    let model_path =
        env::var("MODEL_PATH").unwrap_or_else(|_| "static/distraction_cnn.pt".to_string());
    let model = match Model::load(&model_path) {
        Ok(model) => {
            log::info!("Loaded classifier model from {}", model_path);
            model
        }
        Err(e) => {
            log::error!("Failed to preload model at startup: {e}");
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Model loading failed: {e}"),
            ));
        }
    };

    let database_url = env::var("DATABASE_URL").unwrap().to_string();
    let pool = db::create_pool(&database_url).await.map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Database connection failed: {e}"),
        )
    })?;
    db::run_migrations(&pool).await.map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Schema migration failed: {e}"),
        )
    })?;

    // Initialize AWS configuration
    let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let s3_client = S3Client::new(&aws_config);
    let s3_bucket = env::var("S3_BUCKET_NAME").unwrap().to_string();
    let s3_public_url = env::var("S3_PUBLIC_URL").unwrap().to_string();
    let s3_service = S3Service::new(s3_client, s3_bucket, s3_public_url);

    let user_repo = UserRepository::new(pool.clone());
    let record_repo = RecordRepository::new(pool.clone());

    let classify_timeout_secs = env::var("CLASSIFY_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let settings = PipelineSettings {
        classify_timeout: Duration::from_secs(classify_timeout_secs),
    };

    let port = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let bind_address = format!("0.0.0.0:{}", port);

    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(model.clone()))
            .app_data(web::Data::new(user_repo.clone()))
            .app_data(web::Data::new(record_repo.clone()))
            .app_data(web::Data::new(s3_service.clone()))
            .app_data(web::Data::new(settings.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
