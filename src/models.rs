// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::TravelAgentError;

/// Destination social network for a generated draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    WeChat,
    Red,
    Weibo,
    Douyin,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::WeChat,
        Platform::Red,
        Platform::Weibo,
        Platform::Douyin,
    ];

    /// Stable identifier used in URLs and the persisted template map.
    pub fn slug(&self) -> &'static str {
        match self {
            Platform::WeChat => "wechat",
            Platform::Red => "red",
            Platform::Weibo => "weibo",
            Platform::Douyin => "douyin",
        }
    }

    /// Name the model sees in the instruction.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::WeChat => "WeChat Moments",
            Platform::Red => "Xiaohongshu (Red)",
            Platform::Weibo => "Weibo",
            Platform::Douyin => "Douyin/TikTok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = TravelAgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.slug().eq_ignore_ascii_case(s) || p.display_name() == s)
            .ok_or_else(|| TravelAgentError::NotFound(format!("Unknown platform: {}", s)))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformConfig {
    pub platform: Platform,
    pub name: &'static str,
    pub icon: &'static str,
    pub max_photos: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateOption {
    pub id: String,
    pub name: String,
    pub prompt_body: String,
    #[serde(default)]
    pub is_user_defined: bool,
}

/// The template the user was last viewing, with their edits applied.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateForm {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub prompt_body: String,
    #[serde(default)]
    pub is_user_defined: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub id: Uuid,
    pub filename: String,
    pub mime_type: String,
    pub size: usize,
    /// Base64 payload without the data-URL prefix, as sent to the model.
    #[serde(skip_serializing)]
    pub base64: String,
    pub preview_url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPost {
    pub platform: Platform,
    pub content: String,
    pub hashtags: Vec<String>,
    pub selected_image_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Per-platform drafts of one batch. Failed platforms are absent.
pub type ProcessingResult = BTreeMap<Platform, GeneratedPost>;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub results: ProcessingResult,
    pub failed: Vec<Platform>,
}
