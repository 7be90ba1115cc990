// src/handlers.rs
use crate::{
    AppState, catalog,
    errors::TravelAgentError,
    models::*,
    services::{ContentModel, orchestrator},
    state::{BatchTicket, SessionState},
};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use log::error;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/images", web::post().to(upload_images))
            .route("/images", web::get().to(list_images))
            .route("/images/{image_id}", web::delete().to(delete_image))
            .route("/log", web::put().to(set_log))
            .route("/models", web::get().to(list_models))
            .route("/model", web::put().to(set_model))
            .route("/platforms", web::get().to(list_platforms))
            .route("/templates/{platform}", web::get().to(list_templates))
            .route("/templates/{platform}", web::post().to(save_template))
            .route("/templates/{platform}/active", web::put().to(select_template))
            .route("/templates/{platform}/{template_id}", web::delete().to(delete_template))
            .route("/generate", web::post().to(generate))
            .route("/results", web::get().to(get_results))
            .route("/results/{platform}/toggle", web::post().to(toggle_selection))
            .route("/results/{platform}/reorder", web::post().to(reorder_selection)),
    );
}

#[derive(Deserialize)]
pub struct LogBody {
    pub log: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelBody {
    pub model_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveTemplateBody {
    pub template_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleBody {
    pub image_id: Uuid,
}

#[derive(Deserialize)]
pub struct ReorderBody {
    pub from: usize,
    pub to: usize,
}

pub async fn upload_images(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let mut uploaded = Vec::new();

    while let Some(mut field) = payload.try_next().await? {
        let filename = field
            .content_disposition()
            .get_filename()
            .ok_or_else(|| TravelAgentError::Validation("No filename provided".to_string()))?
            .to_string();

        // Collect image data
        let mut image_data = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            image_data.extend_from_slice(&chunk);
        }

        // Decoding and resizing are CPU bound
        let processor = data.image_processor.clone();
        let image = web::block(move || processor.prepare_upload(filename, &image_data)).await??;
        uploaded.push(image);
    }

    if uploaded.is_empty() {
        return Err(TravelAgentError::Validation("No files in upload".to_string()).into());
    }

    let count = uploaded.len();
    data.session.lock().await.add_images(uploaded.clone());

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "uploaded": uploaded,
        "count": count
    })))
}

pub async fn list_images(data: web::Data<AppState>) -> HttpResponse {
    let session = data.session.lock().await;
    HttpResponse::Ok().json(session.images())
}

pub async fn delete_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    data.session.lock().await.remove_image(path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn set_log(
    body: web::Json<LogBody>,
    data: web::Data<AppState>,
) -> HttpResponse {
    data.session.lock().await.set_log(body.into_inner().log);
    HttpResponse::NoContent().finish()
}

pub async fn list_models() -> HttpResponse {
    HttpResponse::Ok().json(catalog::AVAILABLE_MODELS)
}

pub async fn set_model(
    body: web::Json<ModelBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    data.session.lock().await.set_model(&body.model_id)?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_platforms() -> HttpResponse {
    let configs: Vec<PlatformConfig> = Platform::ALL
        .into_iter()
        .map(catalog::platform_config)
        .collect();
    HttpResponse::Ok().json(configs)
}

pub async fn list_templates(
    path: web::Path<String>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    let platform: Platform = path.into_inner().parse()?;
    let registry = data.registry.lock().await;
    let session = data.session.lock().await;
    let active = registry.resolve_active_template(platform, session.active_template_id(platform));

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "platform": platform,
        "activeId": active.id,
        "templates": registry.templates(platform)
    })))
}

pub async fn save_template(
    path: web::Path<String>,
    body: web::Json<TemplateForm>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    let platform: Platform = path.into_inner().parse()?;
    let mut registry = data.registry.lock().await;
    let template = registry
        .upsert_user_template(platform, body.into_inner())
        .await?;
    data.session.lock().await.template_saved(platform, &template.id);

    Ok(HttpResponse::Ok().json(template))
}

pub async fn delete_template(
    path: web::Path<(String, String)>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    let (platform, template_id) = path.into_inner();
    let platform: Platform = platform.parse()?;
    let mut registry = data.registry.lock().await;
    let deleted = registry.delete_user_template(platform, &template_id).await?;
    if deleted {
        data.session.lock().await.template_deleted(platform);
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": deleted })))
}

pub async fn select_template(
    path: web::Path<String>,
    body: web::Json<ActiveTemplateBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    let platform: Platform = path.into_inner().parse()?;
    let registry = data.registry.lock().await;
    data.session
        .lock()
        .await
        .select_template(platform, &body.template_id, &registry)?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn generate(data: web::Data<AppState>) -> Result<HttpResponse, TravelAgentError> {
    let ticket = {
        let registry = data.registry.lock().await;
        data.session.lock().await.begin_batch(&registry)?
    };
    let seq = ticket.seq;

    // Runs detached so the batch completes even if the client goes away.
    let batch = tokio::spawn(run_batch(
        data.llm_service.clone(),
        data.session.clone(),
        ticket,
    ));

    match batch.await {
        Ok(body) => Ok(HttpResponse::Ok().json(body)),
        Err(e) => {
            error!("Generation batch {} did not finish: {}", seq, e);
            let failed = GenerationReport {
                results: ProcessingResult::new(),
                failed: Platform::ALL.to_vec(),
            };
            data.session.lock().await.complete_batch(seq, failed);
            Err(TravelAgentError::Internal(format!(
                "Generation batch {} did not finish",
                seq
            )))
        }
    }
}

/// Generates every platform, publishes the report and returns the response
/// body. A superseded batch reports whatever the newer batch has published.
async fn run_batch(
    model: Arc<dyn ContentModel>,
    session: Arc<Mutex<SessionState>>,
    ticket: BatchTicket,
) -> serde_json::Value {
    let report = orchestrator::generate_all(
        model,
        &ticket.user_log,
        &ticket.images,
        &ticket.model_id,
        &ticket.templates,
    )
    .await;

    let mut session = session.lock().await;
    let applied = session.complete_batch(ticket.seq, report);
    serde_json::json!({
        "batch": ticket.seq,
        "superseded": !applied,
        "results": session.results(),
        "failed": session.failed()
    })
}

pub async fn get_results(data: web::Data<AppState>) -> HttpResponse {
    let session = data.session.lock().await;
    HttpResponse::Ok().json(serde_json::json!({
        "isProcessing": session.is_processing(),
        "results": session.results(),
        "failed": session.failed()
    }))
}

fn selection_of(session: &SessionState, platform: Platform) -> Vec<Uuid> {
    session
        .results()
        .and_then(|r| r.get(&platform))
        .map(|post| post.selected_image_ids.clone())
        .unwrap_or_default()
}

pub async fn toggle_selection(
    path: web::Path<String>,
    body: web::Json<ToggleBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    let platform: Platform = path.into_inner().parse()?;
    let mut session = data.session.lock().await;
    let change = session.toggle_selection(platform, body.image_id)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "change": change,
        "selectedImageIds": selection_of(&session, platform)
    })))
}

pub async fn reorder_selection(
    path: web::Path<String>,
    body: web::Json<ReorderBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, TravelAgentError> {
    let platform: Platform = path.into_inner().parse()?;
    let mut session = data.session.lock().await;
    let moved = session.reorder(platform, body.from, body.to);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "moved": moved,
        "selectedImageIds": selection_of(&session, platform)
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ImageProcessor;
    use crate::services::TemplateRegistry;
    use crate::services::llm_service::ModelRequest;
    use crate::services::orchestrator::tests::{ScriptedModel, images};
    use crate::services::template_registry::tests::MemoryTemplateStore;
    use actix_web::{App, http::StatusCode, test};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Answers `DRAFT` once a permit is released for the call.
    struct GatedModel {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl ContentModel for GatedModel {
        async fn generate(&self, _request: &ModelRequest<'_>) -> Result<String, TravelAgentError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| TravelAgentError::Model(e.to_string()))?;
            Ok(DRAFT.to_string())
        }
    }

    async fn app_state(model: impl ContentModel + 'static, image_count: usize) -> AppState {
        let mut session = SessionState::new();
        session.add_images(images(image_count));
        let registry = TemplateRegistry::load(Arc::new(MemoryTemplateStore::default())).await;
        AppState {
            session: Arc::new(Mutex::new(session)),
            registry: Arc::new(Mutex::new(registry)),
            llm_service: Arc::new(model),
            image_processor: Arc::new(ImageProcessor::new(2048)),
        }
    }

    const DRAFT: &str =
        r##"{"selectedImageIndices":[1,0,7],"content":"draft","hashtags":["#a","#b"]}"##;

    #[actix_web::test]
    async fn test_generate_requires_log() {
        let state = app_state(ScriptedModel::answering_all(DRAFT), 2).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post().uri("/api/v1/generate").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_generate_reports_partial_results() {
        let mut model = ScriptedModel::answering_all(DRAFT);
        model
            .answers
            .insert(Platform::Douyin, Ok("{\"oops\"".to_string()));
        let state = app_state(model, 2).await;
        let first_image = state.session.lock().await.images()[0].id;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/v1/log")
            .set_json(serde_json::json!({ "log": "Three days in Xi'an" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NO_CONTENT
        );

        let req = test::TestRequest::post().uri("/api/v1/generate").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        let results = body["results"].as_object().unwrap();
        assert_eq!(results.len(), 3);
        assert!(!results.contains_key("douyin"));
        assert_eq!(body["failed"], serde_json::json!(["douyin"]));
        assert_eq!(body["superseded"], false);
        let selected = results["red"]["selectedImageIds"].as_array().unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[1], first_image.to_string());

        let req = test::TestRequest::post()
            .uri("/api/v1/results/red/reorder")
            .set_json(serde_json::json!({ "from": 1, "to": 0 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["moved"], true);
        assert_eq!(body["selectedImageIds"][0], first_image.to_string());
    }

    #[actix_web::test]
    async fn test_abandoned_generate_request_still_publishes_results() {
        let gate = Arc::new(Semaphore::new(0));
        let state = app_state(GatedModel { gate: gate.clone() }, 2).await;
        state.session.lock().await.set_log("Two days in Lhasa".to_string());
        let session = state.session.clone();
        let data = web::Data::new(state);

        // The client disconnects while the model is still working.
        let request = generate(data.clone());
        assert!(
            tokio::time::timeout(Duration::from_millis(50), request)
                .await
                .is_err()
        );
        assert!(session.lock().await.is_processing());

        gate.add_permits(Platform::ALL.len());
        for _ in 0..200 {
            if !session.lock().await.is_processing() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let app = test::init_service(App::new().app_data(data).configure(routes)).await;
        let req = test::TestRequest::get().uri("/api/v1/results").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["isProcessing"], false);
        assert_eq!(body["results"].as_object().unwrap().len(), 4);
        assert_eq!(body["failed"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn test_template_edit_flow() {
        let state = app_state(ScriptedModel::default(), 0).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/templates/wechat")
            .set_json(serde_json::json!({
                "id": "wechat-standard",
                "name": "Standard, but mine",
                "promptBody": "Style: terse",
                "isUserDefined": false
            }))
            .to_request();
        let saved: Value = test::call_and_read_body_json(&app, req).await;
        let new_id = saved["id"].as_str().unwrap().to_string();
        assert_ne!(new_id, "wechat-standard");

        let req = test::TestRequest::get()
            .uri("/api/v1/templates/wechat")
            .to_request();
        let listing: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listing["activeId"], new_id.as_str());
        assert_eq!(listing["templates"].as_array().unwrap().len(), 4);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/v1/templates/wechat/{}", new_id))
            .to_request();
        let deleted: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(deleted["deleted"], true);

        let req = test::TestRequest::get()
            .uri("/api/v1/templates/wechat")
            .to_request();
        let listing: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(listing["activeId"], "wechat-standard");
    }

    #[actix_web::test]
    async fn test_unknown_platform_is_not_found() {
        let state = app_state(ScriptedModel::default(), 0).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/templates/instagram")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
