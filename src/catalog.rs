// src/catalog.rs
// Compiled-in models, platform limits and built-in style templates.
use crate::models::{ModelOption, Platform, PlatformConfig, TemplateOption};

pub const AVAILABLE_MODELS: [ModelOption; 3] = [
    ModelOption {
        id: "gemini-2.5-flash",
        name: "Gemini 2.5 Flash (Fast)",
    },
    ModelOption {
        id: "gemini-3-pro-preview",
        name: "Gemini 3.0 Pro (Reasoning)",
    },
    ModelOption {
        id: "gemini-2.5-flash-image",
        name: "Gemini 2.5 Flash Image (Images)",
    },
];

pub fn default_model() -> &'static str {
    AVAILABLE_MODELS[0].id
}

pub fn is_known_model(model_id: &str) -> bool {
    AVAILABLE_MODELS.iter().any(|m| m.id == model_id)
}

pub fn platform_config(platform: Platform) -> PlatformConfig {
    let (icon, max_photos) = match platform {
        Platform::WeChat => ("💬", 9),
        Platform::Red => ("📕", 9),
        Platform::Weibo => ("👁️", 9),
        Platform::Douyin => ("🎵", 12),
    };
    PlatformConfig {
        platform,
        name: platform.display_name(),
        icon,
        max_photos,
    }
}

pub fn max_photos(platform: Platform) -> usize {
    platform_config(platform).max_photos
}

// (id, name, prompt body)
type Builtin = (&'static str, &'static str, &'static str);

const WECHAT: &[Builtin] = &[
    (
        "wechat-standard",
        "Standard Moments (朋友圈)",
        "Style: Personal, intimate, slightly poetic or concise. Focus on \"living in the moment\".
Format: Short paragraph, max 3-4 lines.
Vibe: Casual, sharing with friends. Not too salesy.
Emoji Usage: Moderate.",
    ),
    (
        "wechat-poetic",
        "Poetic & Artsy (文艺)",
        "Style: Highly literary, emotional, abstract. Use metaphors.
Format: Stanzas or broken lines like a poem.
Vibe: Melancholic, awe-inspiring, or deep reflection.
Emoji Usage: Minimal, only specific ones like 🌊, 🌙.",
    ),
    (
        "wechat-short",
        "Minimalist/Cool (高冷)",
        "Style: Very short, cool, detached.
Format: One sentence or just a few words.
Vibe: \"High cold\" (Gao Leng), mysterious.
Emoji Usage: None or strictly one.",
    ),
];

const RED: &[Builtin] = &[
    (
        "red-standard",
        "Standard Guide (攻略)",
        "Style: \"Xiaohongshu\" style. Enthusiastic, informative, sharing hidden gems.
Format: Catchy title with emojis + structured body text with bullet points for tips/locations.
Vibe: \"Jimei\" (Bestie) talk. Focus on visual aesthetics, practical tips, and location names.
Emoji Usage: Heavy and decorative.
Mandatory: Include specific location tags if detected.",
    ),
    (
        "red-vibe",
        "Atmospheric Vibe (氛围感)",
        "Style: Focus on mood, color, feelings. Less info, more aesthetic description.
Format: Short, evocative paragraphs.
Vibe: Dreamy, cinematic, high-end.
Emoji Usage: Aesthetic sparkles/stars (✨, 🕯️).",
    ),
    (
        "red-diary",
        "Personal Diary (碎碎念)",
        "Style: First-person narrative, detailed storytelling, \"Day in my life\".
Format: Narrative paragraph, conversational.
Vibe: Authentic, relatable, warm.
Emoji Usage: Moderate, used for expression.",
    ),
];

const WEIBO: &[Builtin] = &[
    (
        "weibo-standard",
        "Standard Microblog",
        "Style: News-like or micro-blogging. Trendy, discussing hot topics or sharing a mood.
Format: Concise text.
Vibe: Shareable, slightly more public facing.
Emoji Usage: Standard Weibo emojis (doge, eating melon).",
    ),
    (
        "weibo-topic",
        "Super Topic/Fan Style",
        "Style: Enthusiastic, community focused.
Format: Starts with a Super Topic tag (e.g., #Travel#) and uses popular hashtags.
Vibe: Hype and excitement.",
    ),
    (
        "weibo-emo",
        "Late Night Emo (深夜EGM)",
        "Style: Emotional, reflective, slightly sad or nostalgic.
Format: Short, sentimental text.
Vibe: Late night thoughts.",
    ),
];

const DOUYIN: &[Builtin] = &[
    (
        "douyin-standard",
        "Carousel Hook",
        "Style: Catchy hook for a photo carousel video.
Format: Very short, punchy text meant to be read quickly while scrolling.
Vibe: High energy, algorithm-friendly.
Emoji Usage: Impactful.",
    ),
    (
        "douyin-story",
        "Visual Storytelling",
        "Style: Narration script for a video/slideshow.
Format: Sequential storytelling, guiding the viewer through the photos.
Vibe: Immersive, cinematic.",
    ),
];

pub fn builtin_templates(platform: Platform) -> Vec<TemplateOption> {
    let entries = match platform {
        Platform::WeChat => WECHAT,
        Platform::Red => RED,
        Platform::Weibo => WEIBO,
        Platform::Douyin => DOUYIN,
    };
    entries
        .iter()
        .map(|(id, name, body)| TemplateOption {
            id: (*id).to_string(),
            name: (*name).to_string(),
            prompt_body: (*body).to_string(),
            is_user_defined: false,
        })
        .collect()
}

pub fn default_template_id(platform: Platform) -> &'static str {
    match platform {
        Platform::WeChat => WECHAT[0].0,
        Platform::Red => RED[0].0,
        Platform::Weibo => WEIBO[0].0,
        Platform::Douyin => DOUYIN[0].0,
    }
}
