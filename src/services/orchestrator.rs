// src/services/orchestrator.rs
use futures_util::future::join_all;
use log::{error, info};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::catalog;
use crate::errors::TravelAgentError;
use crate::models::{GeneratedPost, GenerationReport, Platform, TemplateOption, UploadedImage};
use crate::services::llm_service::{ContentModel, ModelRequest};
use crate::services::prompt;

/// Model output as it arrives. Every field is optional here; `into_post`
/// decides what is required.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPost {
    selected_image_indices: Option<Vec<Value>>,
    content: Option<String>,
    hashtags: Option<Vec<Value>>,
    reasoning: Option<String>,
}

impl RawPost {
    fn into_post(
        self,
        platform: Platform,
        images: &[UploadedImage],
    ) -> Result<GeneratedPost, TravelAgentError> {
        let content = self
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| TravelAgentError::Model(format!("No content for {}", platform)))?;

        let indices: Vec<i64> = self
            .selected_image_indices
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_i64)
            .collect();

        let hashtags = self
            .hashtags
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();

        Ok(GeneratedPost {
            platform,
            content,
            hashtags,
            selected_image_ids: map_indices(&indices, images, catalog::max_photos(platform)),
            reasoning: self.reasoning.filter(|r| !r.trim().is_empty()),
        })
    }
}

/// Maps model indices to image ids in the model's order, dropping indices
/// outside `[0, images.len())`, repeats, and anything past `max`.
pub fn map_indices(indices: &[i64], images: &[UploadedImage], max: usize) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = Vec::with_capacity(indices.len().min(max));
    for &idx in indices {
        if ids.len() == max {
            break;
        }
        let Some(image) = usize::try_from(idx).ok().and_then(|i| images.get(i)) else {
            continue;
        };
        if !ids.contains(&image.id) {
            ids.push(image.id);
        }
    }
    ids
}

pub fn parse_post(
    platform: Platform,
    raw: &str,
    images: &[UploadedImage],
) -> Result<GeneratedPost, TravelAgentError> {
    let parsed: RawPost = serde_json::from_str(raw.trim()).map_err(|e| {
        TravelAgentError::Model(format!("Malformed response for {}: {}", platform, e))
    })?;
    parsed.into_post(platform, images)
}

async fn generate_platform(
    model: Arc<dyn ContentModel>,
    platform: Platform,
    user_log: Arc<str>,
    images: Arc<[UploadedImage]>,
    model_id: Arc<str>,
    template: TemplateOption,
) -> Result<GeneratedPost, TravelAgentError> {
    let request = ModelRequest {
        model_id: &model_id,
        instruction: prompt::build_instruction(
            platform,
            &user_log,
            images.len(),
            &template.prompt_body,
        ),
        images: &images,
    };
    let raw = model.generate(&request).await?;
    parse_post(platform, &raw, &images)
}

/// Runs one generation per platform concurrently and waits for all of them.
///
/// A failing platform is logged and listed in `failed`; it never cancels
/// or delays the others and never appears in `results`. Platforms missing
/// from `templates` use their built-in default.
pub async fn generate_all(
    model: Arc<dyn ContentModel>,
    user_log: &str,
    images: &[UploadedImage],
    model_id: &str,
    templates: &BTreeMap<Platform, TemplateOption>,
) -> GenerationReport {
    let user_log: Arc<str> = Arc::from(user_log);
    let model_id: Arc<str> = Arc::from(model_id);
    let images: Arc<[UploadedImage]> = Arc::from(images);

    let handles: Vec<_> = Platform::ALL
        .into_iter()
        .map(|platform| {
            let template = templates
                .get(&platform)
                .cloned()
                .unwrap_or_else(|| catalog::builtin_templates(platform).remove(0));
            let handle = tokio::spawn(generate_platform(
                model.clone(),
                platform,
                user_log.clone(),
                images.clone(),
                model_id.clone(),
                template,
            ));
            async move { (platform, handle.await) }
        })
        .collect();

    let mut report = GenerationReport::default();
    for (platform, outcome) in join_all(handles).await {
        match outcome {
            Ok(Ok(post)) => {
                info!(
                    "Generated {} draft with {} images",
                    platform,
                    post.selected_image_ids.len()
                );
                report.results.insert(platform, post);
            }
            Ok(Err(e)) => {
                error!("Error generating content for {}: {}", platform, e);
                report.failed.push(platform);
            }
            Err(e) => {
                error!("Generation task for {} did not finish: {}", platform, e);
                report.failed.push(platform);
            }
        }
    }
    report
}
