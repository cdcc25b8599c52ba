mod config;
mod db;
mod routes;
mod search;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use config::{ServerConfig, StoreBackend};
use db::dynamodb_repository::DynamoDbRepository;
use db::image_store::ImageStore;
use db::memory_store::MemoryImageStore;
use routes::configure_routes;
use search::SearchService;
use std::sync::Arc;

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    log::error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let config = ServerConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    log::info!(
        "Color matching in {:?} mode (tolerance {})",
        config.search.color_mode,
        config.search.default_tolerance()
    );

    let store: Arc<dyn ImageStore> = match &config.store {
        StoreBackend::DynamoDb { images_table } => {
            let aws_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            let client = DynamoDbClient::new(&aws_config);
            log::info!("Serving images from DynamoDB table '{}'", images_table);
            Arc::new(DynamoDbRepository::new(
                client,
                images_table.clone(),
                config.search.bucket_threshold,
            ))
        }
        StoreBackend::Memory { catalog_file } => {
            let store = MemoryImageStore::from_json_file(catalog_file, config.search.bucket_threshold)
                .map_err(|e| startup_error("Failed to load image catalog", e))?;
            log::info!("Serving images from {}", catalog_file.display());
            Arc::new(store)
        }
    };

    let search_service = SearchService::new(store, config.search.clone());

    let bind_address = format!("0.0.0.0:{}", config.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(web::Data::new(search_service.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
