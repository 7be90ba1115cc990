// src/services/prompt.rs
use serde_json::{Value, json};

use crate::catalog;
use crate::models::Platform;

pub const TEMPERATURE: f64 = 0.7;

/// Gemini response schema for a single platform draft.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "selectedImageIndices": {
                "type": "ARRAY",
                "items": { "type": "INTEGER" },
                "description": "The indices (0-based) of the uploaded images that best match this platform's aesthetic. Order matters (best first)."
            },
            "content": {
                "type": "STRING",
                "description": "The main post caption/body text."
            },
            "hashtags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "5-10 relevant hashtags mixed with location and mood."
            },
            "reasoning": {
                "type": "STRING",
                "description": "Brief explanation of why these photos were chosen based on composition, color, and vibe."
            }
        },
        "required": ["selectedImageIndices", "content", "hashtags"]
    })
}

pub fn build_instruction(
    platform: Platform,
    user_log: &str,
    image_count: usize,
    template_body: &str,
) -> String {
    let name = platform.display_name();
    let max_photos = catalog::max_photos(platform);

    format!(
        r#"You are an expert Social Media Manager, Visual Director, and Photographer.

TASK:
Create a draft post for the platform: "{name}".

INPUTS:
1. User's Travel Log: "{user_log}"
2. Attached Images: I have attached {image_count} images.

STEP-BY-STEP EXECUTION PLAN (Internal Monologue):

1. ADVANCED VISUAL ANALYSIS:
   Mentally analyze each image for:
   - Content: What is happening?
   - Composition: Check for Rule of Thirds, Leading Lines, Symmetry, Depth, and Framing.
   - Color Palette: Identify dominant colors, saturation levels, and temperature (Warm/Cool).
   - Emotional Tone: Does it feel serene, chaotic, joyful, melancholic, or energetic?

2. CONTEXT MATCHING:
   Analyze the User's Log and the Platform Template requirements.

3. WEIGHTED SCORING SYSTEM (0-100):
   Score each image based on the following weighted criteria:
   - Content Relevance (30%): Does it visually represent the events/locations in the log?
   - Platform Vibe Match (30%): Does it fit the specific culture of "{name}"?
   - Visual Composition & Quality (20%): Is the photo well-composed (e.g., rule of thirds) and aesthetically pleasing?
   - Color & Emotional Harmony (20%): Do the colors and mood match the intended "Vibe" of the post?

4. SELECTION & SEQUENCING:
   Select the highest-scoring images, at most {max_photos}.
   Sort them to create a compelling visual narrative (e.g., Hook -> Detail -> Atmosphere).

5. COPYWRITING:
   Write the post content strictly following the template provided below.

PLATFORM TEMPLATE & STYLE GUIDE:
{template_body}

REQUIREMENTS:
1. Return the result strictly in JSON format matching the schema.
2. Ensure the 'selectedImageIndices' array contains valid 0-based indices of the uploaded images.
3. Provide 5-10 hashtags.
4. Language: Chinese/Mandarin (unless log is English).
"#
    )
}
