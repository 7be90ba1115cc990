// src/state.rs
// Everything the user is working on between requests. Commands take
// `&mut self` and either apply fully or return an error with no change.
use log::{info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::catalog;
use crate::errors::TravelAgentError;
use crate::models::{
    GenerationReport, Platform, ProcessingResult, TemplateOption, UploadedImage,
};
use crate::services::TemplateRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionChange {
    Added,
    Removed,
}

/// Inputs captured when a batch starts. Only the batch holding the latest
/// `seq` may publish results.
#[derive(Debug, Clone)]
pub struct BatchTicket {
    pub seq: u64,
    pub user_log: String,
    pub model_id: String,
    pub images: Vec<UploadedImage>,
    pub templates: BTreeMap<Platform, TemplateOption>,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    images: Vec<UploadedImage>,
    user_log: String,
    model_id: String,
    active_templates: BTreeMap<Platform, String>,
    results: Option<ProcessingResult>,
    failed: Vec<Platform>,
    is_processing: bool,
    batch_seq: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            user_log: String::new(),
            model_id: catalog::default_model().to_string(),
            active_templates: Platform::ALL
                .into_iter()
                .map(|p| (p, catalog::default_template_id(p).to_string()))
                .collect(),
            results: None,
            failed: Vec::new(),
            is_processing: false,
            batch_seq: 0,
        }
    }

    pub fn images(&self) -> &[UploadedImage] {
        &self.images
    }

    pub fn results(&self) -> Option<&ProcessingResult> {
        self.results.as_ref()
    }

    pub fn failed(&self) -> &[Platform] {
        &self.failed
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn active_template_id(&self, platform: Platform) -> &str {
        self.active_templates
            .get(&platform)
            .map(String::as_str)
            .unwrap_or_else(|| catalog::default_template_id(platform))
    }

    pub fn add_images(&mut self, images: Vec<UploadedImage>) {
        self.images.extend(images);
    }

    /// Drops an image and removes it from every platform's selection.
    pub fn remove_image(&mut self, image_id: Uuid) -> Result<(), TravelAgentError> {
        let before = self.images.len();
        self.images.retain(|img| img.id != image_id);
        if self.images.len() == before {
            return Err(TravelAgentError::NotFound(format!("Image {}", image_id)));
        }

        if let Some(results) = self.results.as_mut() {
            for post in results.values_mut() {
                post.selected_image_ids.retain(|id| *id != image_id);
            }
        }
        Ok(())
    }

    pub fn set_log(&mut self, log: String) {
        self.user_log = log;
    }

    pub fn set_model(&mut self, model_id: &str) -> Result<(), TravelAgentError> {
        if !catalog::is_known_model(model_id) {
            return Err(TravelAgentError::Validation(format!(
                "Unknown model: {}",
                model_id
            )));
        }
        self.model_id = model_id.to_string();
        Ok(())
    }

    pub fn select_template(
        &mut self,
        platform: Platform,
        template_id: &str,
        registry: &TemplateRegistry,
    ) -> Result<(), TravelAgentError> {
        if !registry
            .templates(platform)
            .iter()
            .any(|t| t.id == template_id)
        {
            return Err(TravelAgentError::NotFound(format!(
                "Template {} for {}",
                template_id, platform
            )));
        }
        self.active_templates
            .insert(platform, template_id.to_string());
        Ok(())
    }

    /// A saved template becomes the platform's active one.
    pub fn template_saved(&mut self, platform: Platform, template_id: &str) {
        self.active_templates
            .insert(platform, template_id.to_string());
    }

    /// After a deletion the platform reverts to its built-in default.
    pub fn template_deleted(&mut self, platform: Platform) {
        self.active_templates
            .insert(platform, catalog::default_template_id(platform).to_string());
    }

    /// Checks the batch preconditions and starts a new batch, superseding
    /// any batch still in flight.
    pub fn begin_batch(
        &mut self,
        registry: &TemplateRegistry,
    ) -> Result<BatchTicket, TravelAgentError> {
        if self.images.is_empty() {
            return Err(TravelAgentError::Validation(
                "Please upload at least one photo.".to_string(),
            ));
        }
        if self.user_log.trim().is_empty() {
            return Err(TravelAgentError::Validation(
                "Please enter a travel log or description.".to_string(),
            ));
        }

        self.batch_seq += 1;
        self.is_processing = true;
        self.results = None;
        self.failed.clear();

        Ok(BatchTicket {
            seq: self.batch_seq,
            user_log: self.user_log.clone(),
            model_id: self.model_id.clone(),
            images: self.images.clone(),
            templates: registry.resolve_all(&self.active_templates),
        })
    }

    /// Publishes a finished batch. Returns `false` and leaves state alone
    /// if a newer batch has started since.
    pub fn complete_batch(&mut self, seq: u64, report: GenerationReport) -> bool {
        if seq != self.batch_seq {
            warn!(
                "Discarding results of batch {} (latest is {})",
                seq, self.batch_seq
            );
            return false;
        }

        // Images removed while the batch ran must not come back.
        let mut results = report.results;
        for post in results.values_mut() {
            post.selected_image_ids
                .retain(|id| self.images.iter().any(|img| img.id == *id));
        }

        info!(
            "Batch {} finished: {} drafts, {} failed",
            seq,
            results.len(),
            report.failed.len()
        );
        self.results = Some(results);
        self.failed = report.failed;
        self.is_processing = false;
        true
    }

    /// Adds or removes an image from a platform's selection.
    pub fn toggle_selection(
        &mut self,
        platform: Platform,
        image_id: Uuid,
    ) -> Result<SelectionChange, TravelAgentError> {
        if !self.images.iter().any(|img| img.id == image_id) {
            return Err(TravelAgentError::NotFound(format!("Image {}", image_id)));
        }
        let post = self
            .results
            .as_mut()
            .and_then(|r| r.get_mut(&platform))
            .ok_or_else(|| TravelAgentError::NotFound(format!("No draft for {}", platform)))?;

        let ids = &mut post.selected_image_ids;
        if let Some(pos) = ids.iter().position(|id| *id == image_id) {
            ids.remove(pos);
            return Ok(SelectionChange::Removed);
        }

        let max = catalog::max_photos(platform);
        if ids.len() >= max {
            return Err(TravelAgentError::SelectionFull { platform, max });
        }
        ids.push(image_id);
        Ok(SelectionChange::Added)
    }

    /// Moves the selected image at `from` to `to`. Out-of-range indices, or
    /// a platform without a draft, leave everything unchanged.
    pub fn reorder(&mut self, platform: Platform, from: usize, to: usize) -> bool {
        let Some(post) = self.results.as_mut().and_then(|r| r.get_mut(&platform)) else {
            return false;
        };
        let ids = &mut post.selected_image_ids;
        if from >= ids.len() || to >= ids.len() {
            return false;
        }
        let moved = ids.remove(from);
        ids.insert(to, moved);
        true
    }
}
