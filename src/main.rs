// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::{error, info};
use std::sync::Arc;
use tokio::sync::Mutex;

mod catalog;
mod config;
mod errors;
mod handlers;
mod models;
mod services;
mod state;

use crate::config::Config;
use crate::services::{
    ContentModel, FileTemplateStore, GeminiClient, ImageProcessor, RedisTemplateStore,
    TemplateRegistry, TemplateStore,
};
use crate::state::SessionState;

#[derive(Clone)]
pub struct AppState {
    session: Arc<Mutex<SessionState>>,
    registry: Arc<Mutex<TemplateRegistry>>,
    llm_service: Arc<dyn ContentModel>,
    image_processor: Arc<ImageProcessor>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting travel post agent...");

    let config = Config::from_env()?;

    // Initialize services
    let store = template_store(&config).await;
    let registry = TemplateRegistry::load(store).await;
    let llm_service: Arc<dyn ContentModel> = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_base_url.clone(),
        config.model_timeout,
    ));
    let image_processor = Arc::new(ImageProcessor::new(config.max_image_dimension));

    let app_state = AppState {
        session: Arc::new(Mutex::new(SessionState::new())),
        registry: Arc::new(Mutex::new(registry)),
        llm_service,
        image_processor,
    };

    let static_dir = config.static_dir.clone();
    let serve_static = static_dir.is_dir();
    if !serve_static {
        info!("No UI bundle at {}; serving the API only", static_dir.display());
    }

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        let app = App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::routes)
            .route("/health", web::get().to(health_check));
        if serve_static {
            app.service(actix_files::Files::new("/", static_dir.clone()).index_file("index.html"))
        } else {
            app
        }
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}

/// Redis when configured and reachable, otherwise a JSON file.
async fn template_store(config: &Config) -> Arc<dyn TemplateStore> {
    if let Some(url) = &config.redis_url {
        match RedisTemplateStore::new(url).await {
            Ok(store) => {
                info!("Custom templates stored in Redis");
                return Arc::new(store);
            }
            Err(e) => error!("Redis unavailable, falling back to file storage: {}", e),
        }
    }
    info!(
        "Custom templates stored in {}",
        config.template_store_path.display()
    );
    Arc::new(FileTemplateStore::new(config.template_store_path.clone()))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "travel-post-agent",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
