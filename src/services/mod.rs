// src/services/mod.rs
pub mod image_processor;
pub mod llm_service;
pub mod orchestrator;
pub mod prompt;
pub mod template_registry;
pub mod template_store;

pub use image_processor::ImageProcessor;
pub use llm_service::{ContentModel, GeminiClient};
pub use template_registry::TemplateRegistry;
pub use template_store::{FileTemplateStore, RedisTemplateStore, TemplateStore};
